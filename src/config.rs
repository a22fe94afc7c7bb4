use crate::vm::Error;

pub const DEFAULT_REGISTERS: usize = 4;
pub const DEFAULT_MEMORY_WORDS: usize = 2048;
pub const DEFAULT_STACK_WORDS: usize = 512;
pub const DEFAULT_ROM_WORDS: usize = 2048;

// Upper bounds accepted by `Config::validate`. Register ids and memory
// addresses are `Word`s, so nothing past these could ever be reached anyway.
pub const MAX_REGISTERS: usize = 256;
pub const MAX_MEMORY_WORDS: usize = 1 << 24;
pub const MAX_STACK_WORDS: usize = 1 << 20;
pub const MAX_ROM_WORDS: usize = 1 << 24;

/// What the machine does when it fetches an opcode it has no handler for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpcodePolicy {
  /// Treat it as a `nop` and keep going; the exit report counts how many
  /// were skipped.
  #[default]
  Lenient,
  /// Fault with [`Error::UnknownOpcode`].
  Strict,
}

/// Sizes of everything the machine owns, fixed for the lifetime of a [`Vm`].
///
/// [`Vm`]: crate::vm::Vm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub registers: usize,
  pub memory_words: usize,
  pub stack_words: usize,
  pub rom_words: usize,
  pub opcode_policy: OpcodePolicy,
}

impl Config {
  pub fn with_registers(mut self, registers: usize) -> Self {
    self.registers = registers;
    self
  }

  pub fn with_memory_words(mut self, words: usize) -> Self {
    self.memory_words = words;
    self
  }

  pub fn with_stack_words(mut self, words: usize) -> Self {
    self.stack_words = words;
    self
  }

  pub fn with_rom_words(mut self, words: usize) -> Self {
    self.rom_words = words;
    self
  }

  pub fn with_opcode_policy(mut self, policy: OpcodePolicy) -> Self {
    self.opcode_policy = policy;
    self
  }

  /// Reject sizes the machine cannot be built with: zero, or past the
  /// `MAX_*` bounds.
  pub fn validate(&self) -> Result<(), Error> {
    if !(1..=MAX_REGISTERS).contains(&self.registers) {
      return Err(Error::InvalidConfig("register count must be between 1 and 256"));
    }
    if !(1..=MAX_MEMORY_WORDS).contains(&self.memory_words) {
      return Err(Error::InvalidConfig("memory size must be between 1 and 16777216 words"));
    }
    if !(1..=MAX_STACK_WORDS).contains(&self.stack_words) {
      return Err(Error::InvalidConfig("stack size must be between 1 and 1048576 words"));
    }
    if !(1..=MAX_ROM_WORDS).contains(&self.rom_words) {
      return Err(Error::InvalidConfig("rom size must be between 1 and 16777216 words"));
    }
    Ok(())
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      registers: DEFAULT_REGISTERS,
      memory_words: DEFAULT_MEMORY_WORDS,
      stack_words: DEFAULT_STACK_WORDS,
      rom_words: DEFAULT_ROM_WORDS,
      opcode_policy: OpcodePolicy::Lenient,
    }
  }
}
