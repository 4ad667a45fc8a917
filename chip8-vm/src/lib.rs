mod bytecode;
pub mod constants;
mod cpu;
mod devices;
mod disasm;
mod display;
mod error;
mod memory;
mod stack;
mod vm;

pub use self::{
    bytecode::Opcode,
    devices::{InvalidKeyCode, KeyCode, Keypad},
    disasm::{disassemble, write_mnemonic, DisasmLine},
    display::Framebuffer,
    memory::MemoryBank,
    stack::CallStack,
    vm::Flow,
};

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        devices::KeyCode,
        disasm::{disassemble, Disassembler},
        error::{Chip8Error, Chip8Result},
        vm::{Chip8Conf, Chip8Vm, Flow},
    };
}

pub use self::error::{Chip8Error, Chip8Result};
