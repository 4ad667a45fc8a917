//! Result and errors.
use std::fmt::{self, Display, Formatter};

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug)]
pub enum Chip8Error {
    /// Attempt to load a program that can't fit in the program area of memory.
    OversizeRom { size: usize, capacity: usize },
    /// Memory access outside of the addressable range.
    OutOfBounds(usize),
    /// Subroutine call while the call stack is full.
    StackOverflow,
    /// Subroutine return while the call stack is empty.
    StackUnderflow,
    /// Instruction word that matches no known pattern.
    UnknownOpcode(u16),
    /// Invalid VM configuration.
    Config(&'static str),
    Io(std::io::Error),
    Fmt(fmt::Error),
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::OversizeRom { size, capacity } => write!(
                f,
                "program of {size} bytes is too large for VM memory ({capacity} bytes available)"
            ),
            Self::OutOfBounds(address) => {
                write!(f, "memory access out of bounds at 0x{address:04X}")
            }
            Self::StackOverflow => write!(f, "call stack overflow"),
            Self::StackUnderflow => write!(f, "call stack underflow"),
            Self::UnknownOpcode(opcode) => write!(f, "unknown opcode {opcode:04X}"),
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Fmt(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Chip8Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Fmt(err) => Some(err),
            _ => None,
        }
    }
}

impl From<fmt::Error> for Chip8Error {
    fn from(err: fmt::Error) -> Self {
        Chip8Error::Fmt(err)
    }
}

impl From<std::io::Error> for Chip8Error {
    fn from(err: std::io::Error) -> Self {
        Chip8Error::Io(err)
    }
}
