use crate::region::Word;
use crate::vm::Error;

/// A fixed-capacity stack growing upward from slot 0.
///
/// `len` is both the number of occupied slots and the index the next push
/// lands in.
#[derive(Debug, Clone)]
pub struct Stack {
  slots: Vec<Word>,
  len: usize,
}

impl Stack {
  pub fn new(capacity: usize) -> Self {
    Self {
      slots: vec![0; capacity],
      len: 0,
    }
  }

  pub fn push(&mut self, value: Word) -> Result<(), Error> {
    if self.len == self.slots.len() {
      return Err(Error::StackOverflow {
        capacity: self.slots.len(),
      });
    }
    self.slots[self.len] = value;
    self.len += 1;
    Ok(())
  }

  pub fn pop(&mut self) -> Result<Word, Error> {
    let top = self.len.checked_sub(1).ok_or(Error::StackUnderflow)?;
    self.len = top;
    Ok(self.slots[top])
  }

  pub fn peek(&self) -> Option<Word> {
    self.len.checked_sub(1).map(|top| self.slots[top])
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn capacity(&self) -> usize {
    self.slots.len()
  }

  /// Occupied slots, bottom first
  pub fn as_slice(&self) -> &[Word] {
    &self.slots[..self.len]
  }

  pub(crate) fn clear(&mut self) {
    self.slots.fill(0);
    self.len = 0;
  }
}
