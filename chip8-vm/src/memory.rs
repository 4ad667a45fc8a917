//! Main memory.
use crate::{
    bytecode::Opcode,
    constants::*,
    error::{Chip8Error, Chip8Result},
};

/// Byte addressable main memory, with the fontset preloaded at `FONTSET_START`.
///
/// All access is bounds checked against the configured size.
#[derive(Debug, Clone)]
pub struct MemoryBank {
    ram: Box<[u8]>,
}

impl Default for MemoryBank {
    fn default() -> Self {
        Self::zeroed(MEM_SIZE)
    }
}

impl MemoryBank {
    /// Create zeroed memory of the given size with the fontset installed.
    ///
    /// The size must fit the 12-bit address space and leave room for at
    /// least one instruction after `MEM_START`.
    pub fn new(size: usize) -> Chip8Result<Self> {
        Self::check_size(size)?;
        Ok(Self::zeroed(size))
    }

    fn check_size(size: usize) -> Chip8Result<()> {
        if size > MEM_SIZE {
            return Err(Chip8Error::Config(
                "memory size exceeds the 12-bit address space",
            ));
        }
        if size < MEM_START + 2 {
            return Err(Chip8Error::Config(
                "memory size leaves no room for a program",
            ));
        }
        Ok(())
    }

    fn zeroed(size: usize) -> Self {
        let mut memory = Self {
            ram: vec![0; size].into_boxed_slice(),
        };
        memory.load_font();
        memory
    }

    fn load_font(&mut self) {
        let start = FONTSET_START as usize;
        self.ram[start..start + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);
    }

    /// Total number of addressable bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.ram.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ram.is_empty()
    }

    /// Number of bytes available for a program starting at `MEM_START`.
    #[inline]
    pub fn program_capacity(&self) -> usize {
        self.ram.len().saturating_sub(MEM_START)
    }

    /// Erase all memory and reinstall the fontset.
    pub fn clear(&mut self) {
        self.ram.fill(0);
        self.load_font();
    }

    /// Copy a program into memory at `MEM_START`.
    ///
    /// Memory past the end of the program is left as is. An oversized
    /// program is rejected before anything is written.
    pub fn load(&mut self, rom: &[u8]) -> Chip8Result<()> {
        let capacity = self.program_capacity();
        if rom.len() > capacity {
            return Err(Chip8Error::OversizeRom {
                size: rom.len(),
                capacity,
            });
        }

        self.ram[MEM_START..MEM_START + rom.len()].copy_from_slice(rom);

        Ok(())
    }

    #[inline]
    pub fn read(&self, address: usize) -> Chip8Result<u8> {
        self.ram
            .get(address)
            .copied()
            .ok_or(Chip8Error::OutOfBounds(address))
    }

    #[inline]
    pub fn write(&mut self, address: usize, value: u8) -> Chip8Result<()> {
        let cell = self
            .ram
            .get_mut(address)
            .ok_or(Chip8Error::OutOfBounds(address))?;
        *cell = value;
        Ok(())
    }

    /// Fetch the big-endian instruction word at the given address.
    #[inline]
    pub fn read_word(&self, address: usize) -> Chip8Result<Opcode> {
        let a = self.read(address)?;
        let b = self.read(address + 1)?;
        Ok(Opcode::from_bytes(a, b))
    }

    /// Borrow `len` bytes starting at `address`.
    ///
    /// Fails with the first address that falls outside of memory.
    pub fn slice(&self, address: usize, len: usize) -> Chip8Result<&[u8]> {
        self.check_range(address, len)?;
        Ok(&self.ram[address..address + len])
    }

    /// Mutably borrow `len` bytes starting at `address`.
    pub fn slice_mut(&mut self, address: usize, len: usize) -> Chip8Result<&mut [u8]> {
        self.check_range(address, len)?;
        Ok(&mut self.ram[address..address + len])
    }

    fn check_range(&self, address: usize, len: usize) -> Chip8Result<()> {
        address
            .checked_add(len)
            .filter(|end| *end <= self.ram.len())
            .map(|_| ())
            .ok_or(Chip8Error::OutOfBounds(address.max(self.ram.len())))
    }

    /// Read-only view of the whole memory, as used by the disassembler.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.ram
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fontset_preloaded() {
        let memory = MemoryBank::default();
        assert_eq!(memory.len(), MEM_SIZE);
        assert_eq!(&memory.as_slice()[0..5], &[0xF0, 0x90, 0x90, 0x90, 0xF0]);
        assert_eq!(memory.read(0x4F).unwrap(), 0x80);
        assert_eq!(memory.read(0x50).unwrap(), 0);
    }

    #[test]
    fn test_load_max_program() {
        let mut memory = MemoryBank::default();
        let rom = vec![0xAB; MAX_PROGRAM_SIZE];
        memory.load(&rom).unwrap();
        assert_eq!(memory.read(MEM_START).unwrap(), 0xAB);
        assert_eq!(memory.read(MEM_SIZE - 1).unwrap(), 0xAB);
    }

    #[test]
    fn test_load_oversize_program() {
        let mut memory = MemoryBank::default();
        let rom = vec![0xAB; MAX_PROGRAM_SIZE + 1];
        let result = memory.load(&rom);
        assert!(matches!(
            result,
            Err(Chip8Error::OversizeRom {
                size: 3585,
                capacity: 3584
            })
        ));
        assert!(memory.as_slice()[MEM_START..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_load_keeps_trailing_memory() {
        let mut memory = MemoryBank::default();
        memory.load(&[1, 2, 3, 4]).unwrap();
        memory.load(&[9, 9]).unwrap();
        assert_eq!(memory.slice(MEM_START, 4).unwrap(), &[9, 9, 3, 4]);
    }

    #[test]
    fn test_bounds() {
        let mut memory = MemoryBank::default();
        assert!(matches!(memory.read(MEM_SIZE), Err(Chip8Error::OutOfBounds(0x1000))));
        assert!(matches!(
            memory.write(MEM_SIZE, 1),
            Err(Chip8Error::OutOfBounds(0x1000))
        ));
        assert!(matches!(
            memory.read_word(MEM_SIZE - 1),
            Err(Chip8Error::OutOfBounds(0x1000))
        ));
        assert!(memory.slice(MEM_SIZE - 2, 2).is_ok());
        assert!(memory.slice(MEM_SIZE - 2, 3).is_err());

        memory.write(MEM_SIZE - 1, 0x42).unwrap();
        assert_eq!(memory.read(MEM_SIZE - 1).unwrap(), 0x42);
    }

    #[test]
    fn test_sized_banks() {
        let memory = MemoryBank::new(MEM_START + 2).unwrap();
        assert_eq!(memory.program_capacity(), 2);
        assert_eq!(memory.read(0).unwrap(), 0xF0);

        assert!(matches!(MemoryBank::new(16), Err(Chip8Error::Config(_))));
        assert!(matches!(MemoryBank::new(0), Err(Chip8Error::Config(_))));
        assert!(matches!(
            MemoryBank::new(MEM_START + 1),
            Err(Chip8Error::Config(_))
        ));
        assert!(matches!(
            MemoryBank::new(MEM_SIZE + 1),
            Err(Chip8Error::Config(_))
        ));
    }

    #[test]
    fn test_range_overflow() {
        let mut memory = MemoryBank::default();
        assert!(matches!(
            memory.slice(usize::MAX, 2),
            Err(Chip8Error::OutOfBounds(usize::MAX))
        ));
        assert!(matches!(
            memory.slice_mut(2, usize::MAX),
            Err(Chip8Error::OutOfBounds(MEM_SIZE))
        ));
    }

    #[test]
    fn test_clear_restores_font() {
        let mut memory = MemoryBank::default();
        memory.write(0, 0).unwrap();
        memory.write(MEM_START, 0xFF).unwrap();
        memory.clear();
        assert_eq!(memory.read(0).unwrap(), 0xF0);
        assert_eq!(memory.read(MEM_START).unwrap(), 0);
    }
}
