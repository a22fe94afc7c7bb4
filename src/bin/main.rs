use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use rgcpu::config::{self, Config, OpcodePolicy};
use rgcpu::region::Rom;
use rgcpu::vm::{ExitReason, Vm};

/// Run a ROM image on the four-register machine
#[derive(Parser)]
#[command(version)]
struct Args {
  /// ROM file: little-endian 32-bit words, four per instruction
  rom: PathBuf,

  /// Number of general-purpose registers
  #[arg(long, default_value_t = config::DEFAULT_REGISTERS)]
  registers: usize,

  /// Memory size in words
  #[arg(long, default_value_t = config::DEFAULT_MEMORY_WORDS)]
  memory: usize,

  /// Stack size in words
  #[arg(long, default_value_t = config::DEFAULT_STACK_WORDS)]
  stack: usize,

  /// Largest accepted ROM image, in words
  #[arg(long, default_value_t = config::DEFAULT_ROM_WORDS)]
  rom_size: usize,

  /// Fault on unknown opcodes instead of skipping them
  #[arg(long)]
  strict: bool,

  /// Don't print the banner
  #[arg(short, long)]
  quiet: bool,
}

fn main() -> anyhow::Result<()> {
  let args = Args::parse();
  if !args.quiet {
    println!("rgcpu {}", env!("CARGO_PKG_VERSION"));
  }

  let policy = if args.strict {
    OpcodePolicy::Strict
  } else {
    OpcodePolicy::Lenient
  };
  let config = Config::default()
    .with_registers(args.registers)
    .with_memory_words(args.memory)
    .with_stack_words(args.stack)
    .with_rom_words(args.rom_size)
    .with_opcode_policy(policy);

  let bytes = fs::read(&args.rom).with_context(|| format!("could not read {}", args.rom.display()))?;
  let rom = Rom::from_bytes(&bytes, &config).with_context(|| format!("could not load {}", args.rom.display()))?;
  let mut vm = Vm::with_config(config)?;

  let interrupted = Arc::new(AtomicBool::new(false));
  let remote = interrupted.clone();
  ctrlc::set_handler(move || {
    remote.store(true, Ordering::SeqCst);
  })
  .context("could not install the ctrl-c handler")?;

  let exit = vm
    .run(&rom, &interrupted)
    .with_context(|| format!("machine faulted at pc {}", vm.pc()))?;

  match exit.reason {
    ExitReason::Terminated => println!("terminated after {} instructions", exit.steps),
    ExitReason::Cancelled => println!("cancelled after {} instructions ({:?})", exit.steps, vm.state()),
  }
  if exit.skipped_opcodes > 0 {
    println!("skipped {} unknown opcodes", exit.skipped_opcodes);
  }
  for (id, value) in exit.registers.iter().enumerate() {
    println!("r{id} = {value} (0x{value:08X})");
  }
  Ok(())
}
