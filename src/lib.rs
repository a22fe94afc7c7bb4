//! A tiny register machine: four registers, a flat word memory, a bounded
//! stack, and a ROM of fixed-width 4-word instructions.
//!
//! The engine only executes. Reading ROM files, printing, and deciding what to
//! do with a fault are left to whoever embeds it (see `src/bin/main.rs`).

pub mod config;
pub mod opcode;
pub mod region;
pub mod stack;
pub mod vm;
