use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::config::{Config, OpcodePolicy};
use crate::opcode::Opcode;
use crate::region::{Instruction, Region, Word, INSTRUCTION_WORDS};
use crate::stack::Stack;

/// The type of a single register in our virtual machine
pub type Register = Word;

/// How long a halted machine sleeps between looks at the cancellation flag
pub const HALT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
  Running,
  /// Executed `hlt`. Only an outside cancel ends a run from here.
  Halted,
  /// Executed `end`.
  Terminated,
}

/// Why [`Vm::run`] handed control back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
  Terminated,
  Cancelled,
}

/// What a finished (or cancelled) run leaves behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exit {
  pub reason: ExitReason,
  pub registers: Vec<Register>,
  /// Instructions executed, `hlt` and `end` included.
  pub steps: u64,
  /// Unknown opcodes passed over under [`OpcodePolicy::Lenient`].
  pub skipped_opcodes: u64,
}

/// An error that occurred while loading or executing instructions.
///
/// A fault leaves the machine exactly as it was before the faulting
/// instruction, with `pc` still pointing at it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  #[error("did not expect to reach the end of instructions (pc {pc}, {remaining} words left)")]
  UnexpectedEof { pc: usize, remaining: usize },

  #[error("image of {len} words is not a whole number of 4-word instructions")]
  TruncatedImage { len: usize },

  #[error("image of {len} bytes is not a whole number of words")]
  MisalignedImage { len: usize },

  #[error("image of {len} words does not fit in a rom of {capacity} words")]
  ImageTooLarge { len: usize, capacity: usize },

  #[error("register {id} does not exist")]
  InvalidRegister { id: Word },

  #[error("memory address {address} is outside 0..{capacity}")]
  MemoryOutOfBounds { address: Word, capacity: usize },

  #[error("stack overflow (capacity {capacity})")]
  StackOverflow { capacity: usize },

  #[error("pop from an empty stack")]
  StackUnderflow,

  #[error("division by zero at pc {pc}")]
  DivisionByZero { pc: usize },

  #[error("unknown opcode 0x{opcode:02X} at pc {pc}")]
  UnknownOpcode { opcode: Word, pc: usize },

  #[error("invalid configuration: {0}")]
  InvalidConfig(&'static str),
}

/// The whole machine: registers, memory and stack, plus the program counter
/// into whatever [`Region`] it is handed.
#[derive(Debug)]
pub struct Vm {
  config: Config,
  // word index of the next instruction, always a multiple of 4
  pc: usize,
  registers: Vec<Register>,
  memory: Vec<Word>,
  stack: Stack,
  state: State,
  steps: u64,
  skipped_opcodes: u64,
}

impl Vm {
  /// Create a new, empty virtual machine with the default sizes
  pub fn new() -> Self {
    Self::build(Config::default())
  }

  pub fn with_config(config: Config) -> Result<Self, Error> {
    config.validate()?;
    Ok(Self::build(config))
  }

  fn build(config: Config) -> Self {
    Self {
      pc: 0,
      registers: vec![0; config.registers],
      memory: vec![0; config.memory_words],
      stack: Stack::new(config.stack_words),
      state: State::Running,
      steps: 0,
      skipped_opcodes: 0,
      config,
    }
  }

  /// Step through a single instruction and report where the machine ended up.
  ///
  /// A halted or terminated machine makes no progress; its state is returned
  /// as is.
  pub fn step<R>(&mut self, region: &R) -> Result<State, Error>
  where
    R: Region,
  {
    if self.state != State::Running {
      return Ok(self.state);
    }
    let mut task = Task::new(self, region);
    task.run()?;
    Ok(self.state)
  }

  /// Step until the machine stops running, without waiting on a halt
  pub fn run_until_halt<R>(&mut self, region: &R) -> Result<State, Error>
  where
    R: Region,
  {
    loop {
      match self.step(region)? {
        State::Running => {}
        stopped => return Ok(stopped),
      }
    }
  }

  /// Run the program to completion.
  ///
  /// Returns on `end`, or once `cancel` is set. `cancel` is checked before
  /// every instruction; a halted machine sleeps [`HALT_POLL_INTERVAL`]
  /// between checks instead of spinning.
  pub fn run<R>(&mut self, region: &R, cancel: &AtomicBool) -> Result<Exit, Error>
  where
    R: Region,
  {
    loop {
      if cancel.load(Ordering::Relaxed) {
        return Ok(self.exit(ExitReason::Cancelled));
      }
      match self.step(region)? {
        State::Running => {}
        State::Halted => thread::sleep(HALT_POLL_INTERVAL),
        State::Terminated => return Ok(self.exit(ExitReason::Terminated)),
      }
    }
  }

  /// Back to power-on: everything zeroed, `pc` at the start of the image
  pub fn reset(&mut self) {
    self.pc = 0;
    self.registers.fill(0);
    self.memory.fill(0);
    self.stack.clear();
    self.state = State::Running;
    self.steps = 0;
    self.skipped_opcodes = 0;
  }

  /// Read register `id`.
  ///
  /// An id outside `0..registers` is [`Error::InvalidRegister`]; it never
  /// reads as zero.
  pub fn read_register(&self, id: Word) -> Result<Register, Error> {
    Ok(self.registers[self.register_index(id)?])
  }

  /// Resolve an operand: a register id when `from_reg` is non-zero, an
  /// immediate otherwise.
  pub fn resolve(&self, value: Word, from_reg: Word) -> Result<Word, Error> {
    if from_reg != 0 {
      self.read_register(value)
    } else {
      Ok(value)
    }
  }

  pub fn registers(&self) -> &[Register] {
    &self.registers
  }

  pub fn memory(&self) -> &[Word] {
    &self.memory
  }

  pub fn stack(&self) -> &Stack {
    &self.stack
  }

  pub fn pc(&self) -> usize {
    self.pc
  }

  pub fn state(&self) -> State {
    self.state
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  fn exit(&self, reason: ExitReason) -> Exit {
    Exit {
      reason,
      registers: self.registers.clone(),
      steps: self.steps,
      skipped_opcodes: self.skipped_opcodes,
    }
  }

  fn register_index(&self, id: Word) -> Result<usize, Error> {
    usize::try_from(id)
      .ok()
      .filter(|&index| index < self.registers.len())
      .ok_or(Error::InvalidRegister { id })
  }

  fn memory_index(&self, address: Word) -> Result<usize, Error> {
    usize::try_from(address)
      .ok()
      .filter(|&index| index < self.memory.len())
      .ok_or(Error::MemoryOutOfBounds {
        address,
        capacity: self.memory.len(),
      })
  }

  fn read_word(&self, address: Word) -> Result<Word, Error> {
    Ok(self.memory[self.memory_index(address)?])
  }

  fn write_word(&mut self, address: Word, value: Word) -> Result<(), Error> {
    let index = self.memory_index(address)?;
    self.memory[index] = value;
    Ok(())
  }
}

impl Default for Vm {
  fn default() -> Self {
    Self::new()
  }
}

struct Task<'vm, 'region, R> {
  vm: &'vm mut Vm,
  region: &'region R,
}

impl<'vm, 'region, R> Task<'vm, 'region, R>
where
  R: Region,
{
  fn new(vm: &'vm mut Vm, region: &'region R) -> Self {
    Self { vm, region }
  }

  fn fetch(&self) -> Result<Instruction, Error> {
    let words = self.region.instructions();
    let pc = self.vm.pc;
    Instruction::fetch(words, pc).ok_or(Error::UnexpectedEof {
      pc,
      remaining: words.len().saturating_sub(pc),
    })
  }

  fn run(&mut self) -> Result<(), Error> {
    let pc = self.vm.pc;
    let Instruction { opcode, args } = self.fetch()?;
    match Opcode::decode(opcode) {
      Some(Opcode::Nop) => {}
      Some(Opcode::Mov) => alu(self, args, |_, v| v)?,
      Some(Opcode::Add) => alu(self, args, |d, v| d.wrapping_add(v))?,
      Some(Opcode::Sub) => alu(self, args, |d, v| d.wrapping_sub(v))?,
      Some(Opcode::Mul) => alu(self, args, |d, v| d.wrapping_mul(v))?,
      Some(Opcode::Div) => div(self, args, pc)?,
      Some(Opcode::Xor) => alu(self, args, |d, v| d ^ v)?,
      Some(Opcode::Or) => alu(self, args, |d, v| d | v)?,
      Some(Opcode::And) => alu(self, args, |d, v| d & v)?,
      Some(Opcode::Hlt) => self.vm.state = State::Halted,
      Some(Opcode::Push) => push(self, args)?,
      Some(Opcode::Pop) => pop(self, args)?,
      Some(Opcode::Sto) => sto(self, args)?,
      Some(Opcode::Get) => get(self, args)?,
      Some(Opcode::End) => self.vm.state = State::Terminated,
      None => match self.vm.config.opcode_policy {
        OpcodePolicy::Lenient => self.vm.skipped_opcodes += 1,
        OpcodePolicy::Strict => return Err(Error::UnknownOpcode { opcode, pc }),
      },
    }
    // fetch succeeded, so the whole instruction lies inside the region
    self.vm.pc = pc + INSTRUCTION_WORDS;
    self.vm.steps += 1;
    Ok(())
  }
}

// r[d] ← op(r[d], res(v, f))
fn alu<R, F>(task: &mut Task<'_, '_, R>, [d, v, f]: [Word; 3], op: F) -> Result<(), Error>
where
  R: Region,
  F: FnOnce(Register, Word) -> Register,
{
  let d = task.vm.register_index(d)?;
  let value = task.vm.resolve(v, f)?;
  task.vm.registers[d] = op(task.vm.registers[d], value);
  Ok(())
}

// r[d] ← r[d] ÷ res(v, f)
fn div<R>(task: &mut Task<'_, '_, R>, [d, v, f]: [Word; 3], pc: usize) -> Result<(), Error>
where
  R: Region,
{
  let d = task.vm.register_index(d)?;
  let divisor = task.vm.resolve(v, f)?;
  if divisor == 0 {
    return Err(Error::DivisionByZero { pc });
  }
  // i32::MIN / -1 wraps back to i32::MIN, like the other arithmetic
  task.vm.registers[d] = task.vm.registers[d].wrapping_div(divisor);
  Ok(())
}

// s[sp] ← res(v, f); sp ← sp + 1
fn push<R>(task: &mut Task<'_, '_, R>, [v, f, _]: [Word; 3]) -> Result<(), Error>
where
  R: Region,
{
  let value = task.vm.resolve(v, f)?;
  task.vm.stack.push(value)
}

// sp ← sp − 1; r[d] ← s[sp]
fn pop<R>(task: &mut Task<'_, '_, R>, [d, _, _]: [Word; 3]) -> Result<(), Error>
where
  R: Region,
{
  // check the destination first so a bad register does not eat the top
  let d = task.vm.register_index(d)?;
  task.vm.registers[d] = task.vm.stack.pop()?;
  Ok(())
}

// m[a] ← res(v, f)
fn sto<R>(task: &mut Task<'_, '_, R>, [a, v, f]: [Word; 3]) -> Result<(), Error>
where
  R: Region,
{
  let value = task.vm.resolve(v, f)?;
  task.vm.write_word(a, value)
}

// r[d] ← m[a]
fn get<R>(task: &mut Task<'_, '_, R>, [a, d, _]: [Word; 3]) -> Result<(), Error>
where
  R: Region,
{
  let value = task.vm.read_word(a)?;
  let d = task.vm.register_index(d)?;
  task.vm.registers[d] = value;
  Ok(())
}
