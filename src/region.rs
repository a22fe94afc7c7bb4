use crate::config::Config;
use crate::vm::Error;

/// A single machine word. Registers, memory, stack slots and ROM all hold these.
pub type Word = i32;

/// Words per instruction: the opcode followed by three operands.
pub const INSTRUCTION_WORDS: usize = 4;

/// A region of instructions
pub trait Region {
  fn instructions(&self) -> &[Word];
}

/// One decoded `(opcode, arg0, arg1, arg2)` tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
  pub opcode: Word,
  pub args: [Word; 3],
}

impl Instruction {
  /// Pull the instruction starting at word `pc`, or `None` if fewer than four
  /// words remain.
  pub fn fetch(words: &[Word], pc: usize) -> Option<Self> {
    match words.get(pc..pc.checked_add(INSTRUCTION_WORDS)?)? {
      &[opcode, a0, a1, a2] => Some(Self {
        opcode,
        args: [a0, a1, a2],
      }),
      _ => None,
    }
  }
}

/// A validated, read-only program image.
///
/// Construction is where truncated images get caught: a `Rom` always holds a
/// whole number of instructions and never more words than the configured ROM
/// capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rom {
  words: Vec<Word>,
}

impl Rom {
  pub fn new(words: Vec<Word>, config: &Config) -> Result<Self, Error> {
    if words.len() % INSTRUCTION_WORDS != 0 {
      return Err(Error::TruncatedImage { len: words.len() });
    }
    if words.len() > config.rom_words {
      return Err(Error::ImageTooLarge {
        len: words.len(),
        capacity: config.rom_words,
      });
    }
    Ok(Self { words })
  }

  /// Decode a raw ROM file: consecutive little-endian 32-bit words.
  pub fn from_bytes(bytes: &[u8], config: &Config) -> Result<Self, Error> {
    let chunks = bytes.chunks_exact(std::mem::size_of::<Word>());
    if !chunks.remainder().is_empty() {
      return Err(Error::MisalignedImage { len: bytes.len() });
    }
    let words = chunks
      .map(|chunk| <[u8; 4]>::try_from(chunk).map(Word::from_le_bytes))
      .collect::<Result<Vec<Word>, _>>()
      .map_err(|_| Error::MisalignedImage { len: bytes.len() })?;
    Self::new(words, config)
  }

  pub fn len(&self) -> usize {
    self.words.len()
  }

  pub fn is_empty(&self) -> bool {
    self.words.is_empty()
  }
}

impl TryFrom<Vec<Word>> for Rom {
  type Error = Error;

  fn try_from(words: Vec<Word>) -> Result<Self, Self::Error> {
    Self::new(words, &Config::default())
  }
}

impl Region for Rom {
  fn instructions(&self) -> &[Word] {
    &self.words
  }
}
