//! Call stack of subroutine return addresses.
use crate::{
    constants::*,
    error::{Chip8Error, Chip8Result},
};

#[derive(Debug, Clone)]
pub struct CallStack {
    stack: [Address; STACK_SIZE],
    /// Stack pointer, the number of occupied slots.
    sp: usize,
}

impl Default for CallStack {
    fn default() -> Self {
        Self {
            stack: [0; STACK_SIZE],
            sp: 0,
        }
    }
}

impl CallStack {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&mut self, address: Address) -> Chip8Result<()> {
        if self.sp >= STACK_SIZE {
            return Err(Chip8Error::StackOverflow);
        }
        self.stack[self.sp] = address;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Chip8Result<Address> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.stack[self.sp])
    }

    /// Return address that the next `RET` would jump to.
    pub fn peek(&self) -> Option<Address> {
        self.as_slice().last().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sp
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sp == 0
    }

    /// Occupied slots, oldest first.
    #[inline]
    pub fn as_slice(&self) -> &[Address] {
        &self.stack[..self.sp]
    }

    pub fn clear(&mut self) {
        self.stack.fill(0);
        self.sp = 0;
    }
}
