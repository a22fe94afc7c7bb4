use std::fmt;

use crate::region::Word;

/// Every arithmetic opcode takes `(d, v, f)`: a destination register, a value,
/// and a flag telling whether `v` is an immediate (`f == 0`) or a register id.
/// `res(v, f)` below is that resolved operand.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
  /// | Operation | Semantics/RTL    |
  /// |-----------|------------------|
  /// | No-op     | `(do nothing)`   |
  Nop = 0x00,

  /// | Operation | Semantics/RTL       |
  /// |-----------|---------------------|
  /// | Move      | `r[d] ← res(v, f)`  |
  Mov = 0x01,

  /// | Operation | Semantics/RTL              |
  /// |-----------|----------------------------|
  /// | Add       | `r[d] ← r[d] + res(v, f)`  |
  Add = 0x02,

  /// | Operation | Semantics/RTL              |
  /// |-----------|----------------------------|
  /// | Subtract  | `r[d] ← r[d] − res(v, f)`  |
  Sub = 0x03,

  /// | Operation | Semantics/RTL              |
  /// |-----------|----------------------------|
  /// | Multiply  | `r[d] ← r[d] × res(v, f)`  |
  Mul = 0x04,

  /// Integer division, truncating toward zero. A zero divisor faults.
  ///
  /// | Operation | Semantics/RTL              |
  /// |-----------|----------------------------|
  /// | Divide    | `r[d] ← r[d] ÷ res(v, f)`  |
  Div = 0x05,

  /// | Operation   | Semantics/RTL              |
  /// |-------------|----------------------------|
  /// | Logical XOR | `r[d] ← r[d] ^ res(v, f)`  |
  Xor = 0x06,

  /// | Operation  | Semantics/RTL              |
  /// |------------|----------------------------|
  /// | Logical OR | `r[d] ← r[d] \| res(v, f)` |
  Or = 0x07,

  /// | Operation   | Semantics/RTL              |
  /// |-------------|----------------------------|
  /// | Logical AND | `r[d] ← r[d] & res(v, f)`  |
  And = 0x08,

  /// Stops the processor. Nothing but an outside cancel gets it going again.
  ///
  /// | Operation | Semantics/RTL      |
  /// |-----------|--------------------|
  /// | Halt      | `(stop execution)` |
  Hlt = 0x09,

  /// Operands are `(v, f)`, shifted one slot left compared to the arithmetic
  /// group.
  ///
  /// | Operation | Semantics/RTL                 |
  /// |-----------|-------------------------------|
  /// | Push      | `s[sp] ← res(v, f); sp ← sp+1`|
  Push = 0x0A,

  /// | Operation | Semantics/RTL                  |
  /// |-----------|--------------------------------|
  /// | Pop       | `sp ← sp−1; r[d] ← s[sp]`      |
  Pop = 0x0B,

  /// Operands are `(a, v, f)` with `a` an absolute memory address.
  ///
  /// | Operation | Semantics/RTL         |
  /// |-----------|-----------------------|
  /// | Store     | `m[a] ← res(v, f)`    |
  Sto = 0x0C,

  /// Operands are `(a, d)`.
  ///
  /// | Operation | Semantics/RTL  |
  /// |-----------|----------------|
  /// | Get       | `r[d] ← m[a]`  |
  Get = 0x0D,

  /// End of program, the clean way out.
  ///
  /// | Operation | Semantics/RTL         |
  /// |-----------|-----------------------|
  /// | End       | `(return to caller)`  |
  End = 0xFF,
}

impl Opcode {
  /// Decode the first word of an instruction. Anything outside the table is
  /// `None`; what to do about it is up to the machine's opcode policy.
  pub fn decode(word: Word) -> Option<Self> {
    let op = match word {
      0x00 => Self::Nop,
      0x01 => Self::Mov,
      0x02 => Self::Add,
      0x03 => Self::Sub,
      0x04 => Self::Mul,
      0x05 => Self::Div,
      0x06 => Self::Xor,
      0x07 => Self::Or,
      0x08 => Self::And,
      0x09 => Self::Hlt,
      0x0A => Self::Push,
      0x0B => Self::Pop,
      0x0C => Self::Sto,
      0x0D => Self::Get,
      0xFF => Self::End,
      _ => return None,
    };
    Some(op)
  }

  pub fn mnemonic(self) -> &'static str {
    match self {
      Self::Nop => "nop",
      Self::Mov => "mov",
      Self::Add => "add",
      Self::Sub => "sub",
      Self::Mul => "mul",
      Self::Div => "div",
      Self::Xor => "xor",
      Self::Or => "or",
      Self::And => "and",
      Self::Hlt => "hlt",
      Self::Push => "push",
      Self::Pop => "pop",
      Self::Sto => "sto",
      Self::Get => "get",
      Self::End => "end",
    }
  }
}

impl fmt::Display for Opcode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} (0x{:02X})", self.mnemonic(), *self as u8)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decode_known() {
    for byte in (0x00..=0x0D).chain([0xFF]) {
      let op = Opcode::decode(byte).unwrap();
      assert_eq!(op as u8 as Word, byte);
    }
  }

  #[test]
  fn decode_unknown() {
    assert_eq!(Opcode::decode(0x0E), None);
    assert_eq!(Opcode::decode(0xFE), None);
    assert_eq!(Opcode::decode(0x1FF), None);
    assert_eq!(Opcode::decode(-1), None);
  }

  #[test]
  fn display() {
    assert_eq!(Opcode::Push.to_string(), "push (0x0A)");
    assert_eq!(Opcode::End.to_string(), "end (0xFF)");
  }
}
