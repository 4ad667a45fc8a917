//! Helpers for extracting data from opcodes.
use std::fmt;

/// A single 16-bit instruction word.
///
/// Instructions are stored big-endian in memory, with the opcode
/// identity in the first 4-bit nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(pub u16);

impl Opcode {
    /// Build an instruction from the two bytes at the program counter.
    #[inline(always)]
    pub fn from_bytes(a: u8, b: u8) -> Self {
        Self(((a as u16) << 8) | b as u16)
    }

    /// Raw instruction word.
    #[inline(always)]
    pub fn word(self) -> u16 {
        self.0
    }

    /// Instruction identity in the upper nibble.
    #[inline(always)]
    pub fn op(self) -> u8 {
        ((self.0 & 0xF000) >> 12) as u8
    }

    /// Operand VX.
    #[inline(always)]
    pub fn x(self) -> usize {
        ((self.0 & 0x0F00) >> 8) as usize
    }

    /// Operand VY.
    #[inline(always)]
    pub fn y(self) -> usize {
        ((self.0 & 0x00F0) >> 4) as usize
    }

    /// Operand N, the lowest nibble.
    #[inline(always)]
    pub fn n(self) -> u8 {
        (self.0 & 0x000F) as u8
    }

    /// Operand NN (kk), the lowest byte.
    #[inline(always)]
    pub fn nn(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    /// Operand NNN, a 12-bit address.
    #[inline(always)]
    pub fn nnn(self) -> u16 {
        self.0 & 0x0FFF
    }
}

impl From<u16> for Opcode {
    fn from(word: u16) -> Self {
        Self(word)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}
