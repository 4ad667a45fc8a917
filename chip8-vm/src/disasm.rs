//! Disassembler.
use std::fmt::{self, Write as FmtWrite};

use crate::{bytecode::Opcode, constants::*};

/// Translate a single instruction word into its assembly mnemonic.
///
/// Every possible word has a result. Words that match no instruction
/// become `UNKNOWN XXXX`.
pub fn disassemble(opcode: u16) -> String {
    let mut s = String::new();
    // Writing into a String never fails.
    let _ = write_mnemonic(&mut s, Opcode(opcode));
    s
}

/// Write the mnemonic of a single instruction to the given writer.
pub fn write_mnemonic<W: FmtWrite>(w: &mut W, opcode: Opcode) -> fmt::Result {
    let (x, y, n, nn, nnn) = (opcode.x(), opcode.y(), opcode.n(), opcode.nn(), opcode.nnn());

    match opcode.op() {
        0x0 => match opcode.word() {
            0x00E0 => write!(w, "CLS"),
            0x00EE => write!(w, "RET"),
            _ => dis_unknown(w, opcode),
        },
        0x1 => write!(w, "JP {nnn:03X}"),
        0x2 => write!(w, "CALL {nnn:03X}"),
        0x3 => dis_xnn(w, "SE", x, nn),
        0x4 => dis_xnn(w, "SNE", x, nn),
        0x5 if n == 0 => dis_xy(w, "SE", x, y),
        0x6 => dis_xnn(w, "LD", x, nn),
        0x7 => dis_xnn(w, "ADD", x, nn),
        0x8 => match n {
            0x0 => dis_xy(w, "LD", x, y),
            0x1 => dis_xy(w, "OR", x, y),
            0x2 => dis_xy(w, "AND", x, y),
            0x3 => dis_xy(w, "XOR", x, y),
            0x4 => dis_xy(w, "ADD", x, y),
            0x5 => dis_xy(w, "SUB", x, y),
            0x6 => write!(w, "SHR V{x:X}"),
            0x7 => dis_xy(w, "SUBN", x, y),
            0xE => write!(w, "SHL V{x:X}"),
            _ => dis_unknown(w, opcode),
        },
        0x9 if n == 0 => dis_xy(w, "SNE", x, y),
        0xA => write!(w, "LD I, {nnn:03X}"),
        0xB => write!(w, "JP V0, {nnn:03X}"),
        0xC => dis_xnn(w, "RND", x, nn),
        0xD => write!(w, "DRW V{x:X}, V{y:X}, {n:X}"),
        0xE => match nn {
            0x9E => write!(w, "SKP V{x:X}"),
            0xA1 => write!(w, "SKNP V{x:X}"),
            _ => dis_unknown(w, opcode),
        },
        0xF => match nn {
            0x07 => write!(w, "LD V{x:X}, DT"),
            0x0A => write!(w, "LD V{x:X}, K"),
            0x15 => write!(w, "LD DT, V{x:X}"),
            0x18 => write!(w, "LD ST, V{x:X}"),
            0x1E => write!(w, "ADD I, V{x:X}"),
            0x29 => write!(w, "LD F, V{x:X}"),
            0x33 => write!(w, "LD B, V{x:X}"),
            0x55 => write!(w, "LD [I], V0-V{x:X}"),
            0x65 => write!(w, "LD V0-V{x:X}, [I]"),
            _ => dis_unknown(w, opcode),
        },
        _ => dis_unknown(w, opcode),
    }
}

fn dis_xnn<W: FmtWrite>(w: &mut W, name: &str, x: usize, nn: u8) -> fmt::Result {
    write!(w, "{name} V{x:X}, {nn:02X}")
}

fn dis_xy<W: FmtWrite>(w: &mut W, name: &str, x: usize, y: usize) -> fmt::Result {
    write!(w, "{name} V{x:X}, V{y:X}")
}

fn dis_unknown<W: FmtWrite>(w: &mut W, opcode: Opcode) -> fmt::Result {
    write!(w, "UNKNOWN {opcode}")
}

/// Static listing of a memory snapshot, one instruction every two bytes
/// from `MEM_START`.
///
/// Data and code are not told apart, so sprite data and empty memory
/// are listed as instructions too.
pub struct Disassembler<'a> {
    bytecode: &'a [u8],
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self { bytecode }
    }

    /// Iterate every complete instruction from `MEM_START` to the end of memory.
    pub fn lines(&self) -> impl Iterator<Item = DisasmLine> + 'a {
        let bytecode = self.bytecode;
        (MEM_START..bytecode.len().saturating_sub(1))
            .step_by(2)
            .map(move |address| {
                let opcode = Opcode::from_bytes(bytecode[address], bytecode[address + 1]);
                DisasmLine {
                    address,
                    opcode: opcode.word(),
                    mnemonic: disassemble(opcode.word()),
                }
            })
    }

    /// Write the full listing to the given writer, one instruction per line.
    pub fn write_listing<W: FmtWrite>(&self, w: &mut W) -> fmt::Result {
        for line in self.lines() {
            writeln!(w, "{line}")?;
        }
        Ok(())
    }

    pub fn listing(&self) -> Result<String, fmt::Error> {
        let mut s = String::new();
        self.write_listing(&mut s)?;
        Ok(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisasmLine {
    pub address: usize,
    pub opcode: u16,
    pub mnemonic: String,
}

impl fmt::Display for DisasmLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:03X}: {:04X}   {}",
            self.address, self.opcode, self.mnemonic
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mnemonics() {
        assert_eq!(disassemble(0x00E0), "CLS");
        assert_eq!(disassemble(0x00EE), "RET");
        assert_eq!(disassemble(0x1234), "JP 234");
        assert_eq!(disassemble(0x2ABC), "CALL ABC");
        assert_eq!(disassemble(0x3A07), "SE VA, 07");
        assert_eq!(disassemble(0x4B10), "SNE VB, 10");
        assert_eq!(disassemble(0x5120), "SE V1, V2");
        assert_eq!(disassemble(0x6005), "LD V0, 05");
        assert_eq!(disassemble(0x7001), "ADD V0, 01");
        assert_eq!(disassemble(0x8120), "LD V1, V2");
        assert_eq!(disassemble(0x8121), "OR V1, V2");
        assert_eq!(disassemble(0x8122), "AND V1, V2");
        assert_eq!(disassemble(0x8123), "XOR V1, V2");
        assert_eq!(disassemble(0x8124), "ADD V1, V2");
        assert_eq!(disassemble(0x8125), "SUB V1, V2");
        assert_eq!(disassemble(0x8126), "SHR V1");
        assert_eq!(disassemble(0x8127), "SUBN V1, V2");
        assert_eq!(disassemble(0x812E), "SHL V1");
        assert_eq!(disassemble(0x9340), "SNE V3, V4");
        assert_eq!(disassemble(0xA123), "LD I, 123");
        assert_eq!(disassemble(0xB300), "JP V0, 300");
        assert_eq!(disassemble(0xC2FF), "RND V2, FF");
        assert_eq!(disassemble(0xD125), "DRW V1, V2, 5");
        assert_eq!(disassemble(0xE59E), "SKP V5");
        assert_eq!(disassemble(0xE5A1), "SKNP V5");
        assert_eq!(disassemble(0xF107), "LD V1, DT");
        assert_eq!(disassemble(0xF10A), "LD V1, K");
        assert_eq!(disassemble(0xF115), "LD DT, V1");
        assert_eq!(disassemble(0xF118), "LD ST, V1");
        assert_eq!(disassemble(0xF11E), "ADD I, V1");
        assert_eq!(disassemble(0xF129), "LD F, V1");
        assert_eq!(disassemble(0xF133), "LD B, V1");
        assert_eq!(disassemble(0xFE55), "LD [I], V0-VE");
        assert_eq!(disassemble(0xFE65), "LD V0-VE, [I]");
    }

    #[test]
    fn test_unknown_sub_cases() {
        assert_eq!(disassemble(0xE000), "UNKNOWN E000");
        assert_eq!(disassemble(0x0123), "UNKNOWN 0123");
        assert_eq!(disassemble(0x5121), "UNKNOWN 5121");
        assert_eq!(disassemble(0x8128), "UNKNOWN 8128");
        assert_eq!(disassemble(0x934F), "UNKNOWN 934F");
        assert_eq!(disassemble(0xF1FF), "UNKNOWN F1FF");
    }

    #[test]
    fn test_listing_covers_memory() {
        let mut memory = vec![0; MEM_SIZE];
        memory[MEM_START] = 0x00;
        memory[MEM_START + 1] = 0xE0;
        memory[MEM_SIZE - 2] = 0x12;
        memory[MEM_SIZE - 1] = 0x00;

        let disasm = Disassembler::new(&memory);
        let lines: Vec<DisasmLine> = disasm.lines().collect();
        assert_eq!(lines.len(), (MEM_SIZE - MEM_START) / 2);
        assert_eq!(lines[0].to_string(), "200: 00E0   CLS");
        assert_eq!(lines[1].to_string(), "202: 0000   UNKNOWN 0000");
        assert_eq!(lines.last().unwrap().to_string(), "FFE: 1200   JP 200");
    }

    #[test]
    fn test_listing_skips_trailing_byte() {
        let memory = vec![0x60; MEM_START + 3];
        let listing = Disassembler::new(&memory).listing().unwrap();
        assert_eq!(listing, "200: 6060   LD V0, 60\n");
    }
}
