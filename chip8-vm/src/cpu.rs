//! CPU and memory state.
use crate::{
    constants::*,
    devices::Keypad,
    display::Framebuffer,
    error::Chip8Result,
    memory::MemoryBank,
    stack::CallStack,
};

/// Core state for a chip8 interpreter.
///
/// Only the VM's instruction cycle mutates this during execution.
/// Hosts read it between cycles.
#[derive(Debug, Clone)]
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the next instruction to fetch.
    ///
    /// Wider than an address, because `JP V0, addr` can jump past the
    /// 12-bit range. Such a jump faults on the next fetch.
    pub(crate) pc: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address. Since addresses are 12 bits, only the
    /// lowest (rightmost) bits are meaningful.
    pub(crate) address: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, a beep is played.
    pub(crate) sound_timer: u8,
    /// Keyboard input state.
    pub(crate) keys: Keypad,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: MemoryBank,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: CallStack,
    /// Screen buffer that is drawn too.
    pub(crate) display: Framebuffer,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        Self::with_memory(MemoryBank::default())
    }
}

impl Chip8Cpu {
    pub fn new(memory_size: usize) -> Chip8Result<Self> {
        Ok(Self::with_memory(MemoryBank::new(memory_size)?))
    }

    fn with_memory(ram: MemoryBank) -> Self {
        Self {
            pc: MEM_START,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,
            keys: Keypad::new(),

            ram,
            stack: CallStack::new(),
            display: Framebuffer::new(),
        }
    }

    /// Return every register and buffer to its power-on state.
    ///
    /// Memory is erased, except for the fontset.
    pub(crate) fn reset(&mut self) {
        self.pc = MEM_START;
        self.registers.fill(0);
        self.address = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.keys.clear();

        self.ram.clear();
        self.stack.clear();
        self.display.clear();
    }

    #[inline(always)]
    pub(crate) fn vx(&self, x: usize) -> u8 {
        self.registers[x & 0xF]
    }

    #[inline(always)]
    pub(crate) fn set_vx(&mut self, x: usize, value: u8) {
        self.registers[x & 0xF] = value;
    }

    #[inline(always)]
    pub(crate) fn set_flag(&mut self, flag: bool) {
        self.registers[FLAG_REGISTER] = flag as u8;
    }

    /// Count down the delay timer.
    #[inline]
    pub(crate) fn tick_delay(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
    }

    #[inline]
    pub(crate) fn tick_sound(&mut self) {
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}
