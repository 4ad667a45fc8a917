//! Virtual machine.
use std::fmt::{self, Write};

use log::{debug, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    bytecode::Opcode,
    constants::*,
    cpu::Chip8Cpu,
    devices::KeyCode,
    disasm::Disassembler,
    display::Framebuffer,
    error::{Chip8Error, Chip8Result},
    memory::MemoryBank,
    stack::CallStack,
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    rng: StdRng,
    conf: Chip8Conf,
}

impl Default for Chip8Vm {
    fn default() -> Self {
        Self::build(Chip8Cpu::default(), Chip8Conf::default())
    }
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Chip8Result<Self> {
        let cpu = Chip8Cpu::new(conf.memory_size)?;
        Ok(Self::build(cpu, conf))
    }

    fn build(cpu: Chip8Cpu, conf: Chip8Conf) -> Self {
        let rng = match conf.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Chip8Vm { cpu, rng, conf }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Copy a program into memory at `MEM_START`.
    ///
    /// No other state is touched. To run a different program on the same
    /// instance, call [`Chip8Vm::reset`] first.
    pub fn load_rom(&mut self, rom: &[u8]) -> Chip8Result<()> {
        self.cpu.ram.load(rom)?;
        debug!("loaded {} byte program at 0x{MEM_START:03X}", rom.len());
        Ok(())
    }

    /// Return the machine to its freshly constructed state.
    pub fn reset(&mut self) {
        self.cpu.reset();
        debug!("vm reset");
    }
}

/// Outcome of a single instruction cycle, so the host can
/// decide what to do between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// Display buffer was changed by `CLS` or `DRW`.
    Draw,
    /// Sound timer was set.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`) when no key is
    /// pressed. The program counter is rewound so the same instruction
    /// runs again on the next cycle.
    KeyWait,
}

/// VM Configuration Parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Chip8Conf {
    /// Size of main memory in bytes.
    pub memory_size: usize,
    /// Seed for the random number generator used by `RND`.
    ///
    /// Seeded from entropy when not given.
    pub rng_seed: Option<u64>,
}

impl Default for Chip8Conf {
    fn default() -> Self {
        Self {
            memory_size: MEM_SIZE,
            rng_seed: None,
        }
    }
}

/// Host interface
impl Chip8Vm {
    /// Sets the keyboard key input state.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.cpu.keys.set_key(key, pressed);
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.keys.clear()
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.cpu.keys.is_pressed(key.as_u8())
    }

    /// Count down the delay and sound timers by one.
    ///
    /// The instruction cycle never does this itself. The host must call it
    /// at `DELAY_FREQUENCY` (60Hz), independent of how many cycles it runs.
    pub fn tick_timers(&mut self) {
        self.cpu.tick_delay();
        self.cpu.tick_sound();
    }

    /// The buzzer should sound while the sound timer counts down.
    #[inline]
    pub fn is_buzzing(&self) -> bool {
        self.cpu.sound_timer > 0
    }

    #[inline]
    pub fn pc(&self) -> usize {
        self.cpu.pc
    }

    /// Address register I.
    #[inline]
    pub fn index(&self) -> Address {
        self.cpu.address
    }

    pub fn set_index(&mut self, address: Address) {
        self.cpu.address = address;
    }

    /// Value of register `Vx`. The index is masked to 0x0-0xF.
    #[inline]
    pub fn register(&self, x: usize) -> u8 {
        self.cpu.vx(x)
    }

    pub fn set_register(&mut self, x: usize, value: u8) {
        self.cpu.set_vx(x, value);
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.cpu.registers
    }

    pub fn delay_timer(&self) -> u8 {
        self.cpu.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.cpu.sound_timer
    }

    pub fn stack(&self) -> &CallStack {
        &self.cpu.stack
    }

    pub fn memory(&self) -> &MemoryBank {
        &self.cpu.ram
    }

    pub fn display(&self) -> &Framebuffer {
        &self.cpu.display
    }

    pub fn display_buffer(&self) -> &[bool; DISPLAY_BUFFER_SIZE] {
        self.cpu.display.as_slice()
    }

    /// Disassembler over a snapshot of the current memory.
    pub fn disassembler(&self) -> Disassembler<'_> {
        Disassembler::new(self.cpu.ram.as_slice())
    }
}

/// Interpreter
impl Chip8Vm {
    /// Run up to `cycle_count` instructions, stopping at the first error.
    ///
    /// Returns the flow of the last cycle.
    pub fn run_cycles(&mut self, cycle_count: usize) -> Chip8Result<Flow> {
        let mut flow = Flow::Ok;
        for _ in 0..cycle_count {
            flow = self.cycle()?;
        }
        Ok(flow)
    }

    /// Fetch, decode and execute a single instruction.
    ///
    /// When the instruction fails, the program counter is left pointing at
    /// it and no other state has been changed.
    pub fn cycle(&mut self) -> Chip8Result<Flow> {
        let pc = self.cpu.pc;

        match self.step() {
            Ok(flow) => Ok(flow),
            Err(err) => {
                warn!("fault at 0x{pc:03X}: {err}");
                self.cpu.pc = pc;
                Err(err)
            }
        }
    }

    fn step(&mut self) -> Chip8Result<Flow> {
        let opcode = self.cpu.ram.read_word(self.cpu.pc)?;
        op_trace(self.cpu.pc, opcode);

        self.cpu.pc += 2;

        let (x, y, n, nn, nnn) = (opcode.x(), opcode.y(), opcode.n(), opcode.nn(), opcode.nnn());
        let mut control_flow = Flow::Ok;

        match opcode.op() {
            0x0 => match opcode.word() {
                // 00E0 (CLS)
                //
                // Clear display
                0x00E0 => {
                    self.cpu.display.clear();
                    control_flow = Flow::Draw;
                }
                // 00EE (RET)
                //
                // Return from a subroutine.
                // Set the program counter to the address popped off the stack.
                0x00EE => {
                    self.cpu.pc = self.cpu.stack.pop()? as usize;
                    control_flow = Flow::Jump;
                }
                // 0NNN (SYS addr)
                //
                // Jump to a machine code routine. Ignored by modern interpreters.
                _ => { /* No Op */ }
            },
            // 1NNN (JP addr)
            //
            // Jump to address.
            0x1 => {
                self.cpu.pc = nnn as usize;
                control_flow = Flow::Jump;
            }
            // 2NNN (CALL addr)
            //
            // Call subroutine at NNN.
            0x2 => {
                self.cpu.stack.push(self.cpu.pc as Address)?;
                self.cpu.pc = nnn as usize;
                control_flow = Flow::Jump;
            }
            // 3XNN (SE Vx, byte)
            //
            // Skip the next instruction if register VX equals value NN.
            0x3 => {
                if self.cpu.vx(x) == nn {
                    self.cpu.pc += 2;
                }
            }
            // 4XNN (SNE Vx, byte)
            //
            // Skip the next instruction if register VX does not equal value NN.
            0x4 => {
                if self.cpu.vx(x) != nn {
                    self.cpu.pc += 2;
                }
            }
            // 5XY0 (SE Vx, Vy)
            //
            // Skip the next instruction if register VX equals value VY.
            0x5 if n == 0 => {
                if self.cpu.vx(x) == self.cpu.vx(y) {
                    self.cpu.pc += 2;
                }
            }
            // 6XNN (LD Vx, byte)
            //
            // Set register VX to value NN.
            0x6 => self.cpu.set_vx(x, nn),
            // 7XNN (ADD Vx, byte)
            //
            // Add value NN to register VX. Carry flag is not set.
            0x7 => self.cpu.set_vx(x, self.cpu.vx(x).wrapping_add(nn)),
            // Arithmetic instructions indentified by n
            0x8 => self.exec_math(opcode)?,
            // 9XY0 (SNE Vx, Vy)
            //
            // Skip next instruction if Vx != Vy.
            0x9 if n == 0 => {
                if self.cpu.vx(x) != self.cpu.vx(y) {
                    self.cpu.pc += 2;
                }
            }
            // ANNN (LD I, addr)
            //
            // Set address register I to value NNN.
            0xA => self.cpu.address = nnn,
            // BNNN (JP V0, addr)
            //
            // Jump to address NNN offset by register V0.
            // The target may land past the 12-bit range, which faults on the next fetch.
            0xB => {
                self.cpu.pc = nnn as usize + self.cpu.vx(0) as usize;
                control_flow = Flow::Jump;
            }
            // CXNN (RND Vx, byte)
            //
            // Generate random number.
            // Set register VX to the result of bitwise AND between a random number and NN.
            0xC => {
                let value = self.rng.gen::<u8>() & nn;
                self.cpu.set_vx(x, value);
            }
            // DXYN (DRW Vx, Vy, nibble)
            //
            // Draw sprite to the display buffer, at coordinate as per registers VX and VY.
            // Sprite is encoded as 8 pixels wide, N pixels high, stored in bits located in
            // memory pointed to by address register I.
            //
            // If the sprite is drawn outside of the display area, it is wrapped around to the other side.
            //
            // If the drawing operation erases existing pixels in the display buffer, register VF is set to
            // 1, and set to 0 if no display bits are unset. This is used for collision detection.
            0xD => {
                let (px, py) = (self.cpu.vx(x) as usize, self.cpu.vx(y) as usize);

                // Sprite rows are bounds checked before anything is drawn.
                let sprite = self.cpu.ram.slice(self.cpu.address as usize, n as usize)?;
                let is_erased = self.cpu.display.draw_sprite(px, py, sprite);

                self.cpu.set_flag(is_erased);
                control_flow = Flow::Draw;
            }
            // Keyboard, timer and memory instructions identified by nn
            0xE | 0xF => control_flow = self.exec_misc(opcode)?,
            // Unsupported operation.
            _ => return Err(Chip8Error::UnknownOpcode(opcode.word())),
        }

        Ok(control_flow)
    }

    /// Execute an arithmetic instruction
    ///
    /// The flag register is written before the result, so when Vx or Vy
    /// is VF the operation observes the new flag.
    #[inline]
    fn exec_math(&mut self, opcode: Opcode) -> Chip8Result<()> {
        debug_assert_eq!(opcode.op(), 0x8);
        let (x, y) = (opcode.x(), opcode.y());

        match opcode.n() {
            // 8XY0 (LD Vx, Vy)
            //
            // Store the value of register VY in register VX.
            0x0 => self.cpu.set_vx(x, self.cpu.vx(y)),
            // 8XY1 (OR Vx, Vy)
            0x1 => self.cpu.set_vx(x, self.cpu.vx(x) | self.cpu.vx(y)),
            // 8XY2 (AND Vx, Vy)
            0x2 => self.cpu.set_vx(x, self.cpu.vx(x) & self.cpu.vx(y)),
            // 8XY3 (XOR Vx, Vy)
            0x3 => self.cpu.set_vx(x, self.cpu.vx(x) ^ self.cpu.vx(y)),
            // 8XY4 (ADD Vx, Vy)
            //
            // ADDs VX to VY, and stores the result in VX.
            // Overflow is wrapped.
            // If overflow, set VF to 1, else 0.
            0x4 => {
                let (result, carry) = self.cpu.vx(x).overflowing_add(self.cpu.vx(y));
                self.cpu.set_flag(carry);
                self.cpu.set_vx(x, result);
            }
            // 8XY5 (SUB Vx, Vy)
            //
            // Subtracts VY from VX, and stores the result in VX.
            // VF is set to 1 when VX is strictly greater than VY, else 0.
            0x5 => {
                self.cpu.set_flag(self.cpu.vx(x) > self.cpu.vx(y));
                self.cpu.set_vx(x, self.cpu.vx(x).wrapping_sub(self.cpu.vx(y)));
            }
            // 8XY6 (SHR Vx)
            //
            // VF is set to the least-significant bit of Vx.
            // Shift VX right by 1.
            // VY is unused.
            0x6 => {
                self.cpu.set_vx(FLAG_REGISTER, self.cpu.vx(x) & 1);
                self.cpu.set_vx(x, self.cpu.vx(x) >> 1);
            }
            // 8XY7 (SUBN Vx, Vy)
            //
            // Subtracts VX from VY, and stores the result in VX.
            // VF is set to 1 when VY is strictly greater than VX, else 0.
            0x7 => {
                self.cpu.set_flag(self.cpu.vx(y) > self.cpu.vx(x));
                self.cpu.set_vx(x, self.cpu.vx(y).wrapping_sub(self.cpu.vx(x)));
            }
            // 8XYE (SHL Vx)
            //
            // VF is set to the most-significant bit of Vx.
            // Shift VX left by 1.
            // VY is unused.
            0xE => {
                self.cpu.set_vx(FLAG_REGISTER, (self.cpu.vx(x) & 0x80) >> 7);
                self.cpu.set_vx(x, self.cpu.vx(x) << 1);
            }
            // ----------------------------------------------------------------
            // Unsupported operation.
            _ => return Err(Chip8Error::UnknownOpcode(opcode.word())),
        }

        Ok(())
    }

    /// Execute a keyboard, timer or memory instruction
    #[inline]
    fn exec_misc(&mut self, opcode: Opcode) -> Chip8Result<Flow> {
        let x = opcode.x();
        let mut control_flow = Flow::Ok;

        match (opcode.op(), opcode.nn()) {
            // ----------------------------------------------------------------
            // Ex9E (SKP Vx)
            //
            // Skip the next instruction if the key with the value of Vx is pressed.
            (0xE, 0x9E) => {
                if self.cpu.keys.is_pressed(self.cpu.vx(x)) {
                    self.cpu.pc += 2;
                }
            }
            // ExA1 (SKNP Vx)
            (0xE, 0xA1) => {
                if !self.cpu.keys.is_pressed(self.cpu.vx(x)) {
                    self.cpu.pc += 2;
                }
            }
            // ----------------------------------------------------------------
            // Fx07 (LD Vx, DT)
            //
            // Set Vx = delay timer value.
            (0xF, 0x07) => self.cpu.set_vx(x, self.cpu.delay_timer),
            // Fx0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            // Execution stalls on this instruction until a key is pressed.
            (0xF, 0x0A) => match self.cpu.keys.first_key() {
                Some(key) => self.cpu.set_vx(x, key.as_u8()),
                None => {
                    // rewind the program counter to stall the machine
                    self.cpu.pc -= 2;
                    control_flow = Flow::KeyWait;
                }
            },
            // Fx15 (LD DT, Vx)
            //
            // Set delay timer = Vx.
            (0xF, 0x15) => self.cpu.delay_timer = self.cpu.vx(x),
            // Fx18 (LD ST, Vx)
            //
            // Set sound timer = Vx.
            (0xF, 0x18) => {
                self.cpu.sound_timer = self.cpu.vx(x);
                control_flow = Flow::Sound;
            }
            // Fx1E (ADD I, Vx)
            //
            // Add Vx to I, wrapping within the 12-bit address space.
            (0xF, 0x1E) => {
                let address = self.cpu.address.wrapping_add(self.cpu.vx(x) as u16);
                self.cpu.address = address & ADDRESS_MASK;
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of sprite for digit Vx.
            (0xF, 0x29) => {
                let digit = self.cpu.vx(x) as u16;
                self.cpu.address = FONTSET_START + digit * FONTSET_HEIGHT as u16;
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            (0xF, 0x33) => {
                let value = self.cpu.vx(x);
                let bcd = self.cpu.ram.slice_mut(self.cpu.address as usize, 3)?;
                bcd[0] = value / 100;
                bcd[1] = value / 10  % 10;
                bcd[2] = value       % 10;
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            (0xF, 0x55) => {
                let dest = self.cpu.ram.slice_mut(self.cpu.address as usize, x + 1)?;
                dest.copy_from_slice(&self.cpu.registers[0..=x]);
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            (0xF, 0x65) => {
                let src = self.cpu.ram.slice(self.cpu.address as usize, x + 1)?;
                self.cpu.registers[0..=x].copy_from_slice(src);
            }
            // ----------------------------------------------------------------
            // Unsupported operation.
            _ => return Err(Chip8Error::UnknownOpcode(opcode.word())),
        }

        Ok(control_flow)
    }
}

/// Troubleshooting
#[doc(hidden)]
impl Chip8Vm {
    /// Returns the contents of the program memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for line in self.disassembler().lines().take(count / 2) {
            writeln!(buf, "{:04X}: {:04X}", line.address, line.opcode)?;
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();
        write!(buf, "{}", self.cpu.display)?;
        Ok(buf)
    }

    pub fn dump_keys(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if self.cpu.keys.any_key() {
            write!(buf, "keys: ")?;
            for key in self.cpu.keys.pressed() {
                write!(buf, "{key}")?;
            }
        }

        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(pc: usize, opcode: Opcode) {
    log::trace!(
        "{:03X}: {}   {}",
        pc,
        opcode,
        crate::disasm::disassemble(opcode.word())
    );
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: usize, _: Opcode) {}

#[cfg(test)]
mod test {
    use super::*;

    fn vm_with(rom: &[u8]) -> Chip8Vm {
        let mut vm = Chip8Vm::new(Chip8Conf {
            rng_seed: Some(8),
            ..Chip8Conf::default()
        })
        .unwrap();
        vm.load_rom(rom).unwrap();
        vm
    }

    /// Fx0A (LD Vx, K)
    ///
    /// Wait for a keypress, then store the key value in Vx.
    /// The VM must stall while waiting, and signal the state to the outer executer.
    #[test]
    #[rustfmt::skip]
    fn test_key_wait() {
        let mut vm = vm_with(&[
            0xF1, 0x0A, // LD v1, K
            0x62, 0x42  // LD v2, 0x42  ; sentinal
        ]);

        // machine must stall
        for _ in 0..6 {
            assert_eq!(vm.cpu.pc, MEM_START);
            assert_eq!(vm.cycle().unwrap(), Flow::KeyWait);
        }
        assert_eq!(vm.cpu.pc, MEM_START);

        // machine has yielded, waiting for any key to be pressed.
        vm.set_key(KeyCode::Key9, true);
        vm.set_key(KeyCode::Key5, true);

        // machine will now advance, taking the lowest key
        assert_eq!(vm.cycle().unwrap(), Flow::Ok);
        assert_eq!(vm.cpu.pc, MEM_START + 2);
        assert_eq!(vm.cpu.registers[1], 0x05);

        // Ensure the machine is continuing
        vm.cycle().unwrap();
        assert_eq!(vm.cpu.pc, MEM_START + 4);
        assert_eq!(vm.cpu.registers[2], 0x42); // sentinal
    }

    #[test]
    fn test_draw_collision() {
        // Draw the same sprite twice, overlapping by two pixels.
        //
        // draw sprite at x=4
        // ____####, vf == 0
        //
        // draw sprite at x=2
        // __##__##, vf == 1
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0xA2, 0x0C, // LD I, 0x20C
            0x60, 0x04, // LD v0, 4
            0x61, 0x00, // LD v1, 0
            0xD0, 0x11, // DRW v0, v1, 1
            0x60, 0x02, // LD v0, 2
            0xD0, 0x11, // DRW v0, v1, 1
            0xF0,       // sprite: 0b11110000
        ]);

        vm.run_cycles(4).unwrap();
        assert_eq!(vm.cpu.registers[0xF], 0);
        assert!(!vm.display_buffer()[0]);
        assert!(vm.display_buffer()[4]);

        assert_eq!(vm.run_cycles(2).unwrap(), Flow::Draw);
        assert_eq!(vm.cpu.registers[0xF], 1);
        let row: Vec<bool> = vm.display_buffer()[0..8].to_vec();
        assert_eq!(
            row,
            vec![false, false, true, true, false, false, true, true]
        );
    }

    #[test]
    fn test_failed_cycle_rewinds() {
        let mut vm = vm_with(&[0x00, 0xEE]);
        assert!(matches!(vm.cycle(), Err(Chip8Error::StackUnderflow)));
        assert_eq!(vm.cpu.pc, MEM_START);
    }

    #[test]
    fn test_math_on_flag_register() {
        // 8FF6 (SHR VF): flag is written first, then the shift reads it back.
        let mut vm = vm_with(&[0x8F, 0xF6]);
        vm.cpu.registers[0xF] = 0b11;
        vm.cycle().unwrap();
        assert_eq!(vm.cpu.registers[0xF], 0);

        // 8F04 (ADD VF, V0): result is written after the carry flag.
        let mut vm = vm_with(&[0x8F, 0x04]);
        vm.cpu.registers[0x0] = 0xFF;
        vm.cpu.registers[0xF] = 0x02;
        vm.cycle().unwrap();
        assert_eq!(vm.cpu.registers[0xF], 0x01);
    }

    #[test]
    fn test_seeded_random_is_repeatable() {
        let rom = [0xC0, 0xFF, 0xC1, 0x0F];
        let mut a = vm_with(&rom);
        let mut b = vm_with(&rom);
        a.run_cycles(2).unwrap();
        b.run_cycles(2).unwrap();
        assert_eq!(a.registers(), b.registers());
        assert_eq!(a.register(1) & 0xF0, 0);
    }

    #[test]
    fn test_config_validation() {
        assert!(matches!(
            Chip8Vm::new(Chip8Conf {
                memory_size: MEM_SIZE + 1,
                rng_seed: None
            }),
            Err(Chip8Error::Config(_))
        ));
        assert!(matches!(
            Chip8Vm::new(Chip8Conf {
                memory_size: MEM_START,
                rng_seed: None
            }),
            Err(Chip8Error::Config(_))
        ));

        let vm = Chip8Vm::new(Chip8Conf {
            memory_size: 0x800,
            rng_seed: None,
        })
        .unwrap();
        assert_eq!(vm.memory().program_capacity(), 0x600);
    }

    #[test]
    fn test_dump_keys() {
        let mut vm = Chip8Vm::default();
        assert_eq!(vm.dump_keys().unwrap(), "");
        vm.set_key(KeyCode::KeyA, true);
        vm.set_key(KeyCode::Key1, true);
        assert_eq!(vm.dump_keys().unwrap(), "keys: k1ka");
    }
}
