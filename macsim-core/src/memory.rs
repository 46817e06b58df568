//! Flat byte-addressable main memory.
//!
//! This can be categorized as *main memory* according to the types of memory resources defined by
//! the RISC-V spec: a single contiguous little-endian RAM region starting at a base address.
//! Wider accesses must be naturally aligned.

use thiserror::Error;

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum MemoryError {
    #[error("access to address outside the mapped region")]
    AccessFault,
    #[error("access is not naturally aligned")]
    MisalignedAccess,
}

/// Zero-initialized little-endian RAM covering the address range `base..base + len`.
#[derive(Debug, Clone)]
pub struct Memory {
    base: u32,
    data: Vec<u8>,
}

impl Memory {
    /// Create a new zero-initialized memory of `size` bytes starting at address `base`.
    ///
    /// Returns `None` if `size` is zero or if the region would wrap around the address space.
    pub fn new(base: u32, size: u32) -> Option<Self> {
        if size == 0 || base.checked_add(size - 1).is_none() {
            None
        } else {
            Some(Self {
                base,
                data: vec![0; size as usize],
            })
        }
    }

    /// The lowest mapped address.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// The size of the mapped region in bytes. Guaranteed to be at least one.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Copies `image` into memory starting at `address`.
    ///
    /// Used to place program segments before the simulation starts. Fails without partial writes
    /// if any byte of the image would fall outside the mapped region.
    pub fn load_image(&mut self, address: u32, image: &[u8]) -> Result<(), MemoryError> {
        let offset = self.offset_of(address, image.len())?;
        self.data[offset..offset + image.len()].copy_from_slice(image);
        Ok(())
    }

    pub fn read_byte(&self, address: u32) -> Result<u8, MemoryError> {
        let offset = self.offset_of(address, 1)?;
        Ok(self.data[offset])
    }

    pub fn read_halfword(&self, address: u32) -> Result<u16, MemoryError> {
        self.check_alignment::<2>(address)?;
        let offset = self.offset_of(address, 2)?;
        let bytes = [self.data[offset], self.data[offset + 1]];
        Ok(u16::from_le_bytes(bytes))
    }

    pub fn read_word(&self, address: u32) -> Result<u32, MemoryError> {
        self.check_alignment::<4>(address)?;
        let offset = self.offset_of(address, 4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[offset..offset + 4]);
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn write_byte(&mut self, address: u32, value: u8) -> Result<(), MemoryError> {
        let offset = self.offset_of(address, 1)?;
        self.data[offset] = value;
        Ok(())
    }

    pub fn write_halfword(&mut self, address: u32, value: u16) -> Result<(), MemoryError> {
        self.check_alignment::<2>(address)?;
        let offset = self.offset_of(address, 2)?;
        self.data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn write_word(&mut self, address: u32, value: u32) -> Result<(), MemoryError> {
        self.check_alignment::<4>(address)?;
        let offset = self.offset_of(address, 4)?;
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Maps `address` to an offset in the backing buffer, checking that `len` bytes starting there
    /// stay within the mapped region.
    fn offset_of(&self, address: u32, len: usize) -> Result<usize, MemoryError> {
        let offset = address.wrapping_sub(self.base) as usize;
        let end = offset.checked_add(len);
        if address < self.base || end.map_or(true, |end| end > self.data.len()) {
            return Err(MemoryError::AccessFault);
        }
        Ok(offset)
    }

    fn check_alignment<const SIZE: u32>(&self, address: u32) -> Result<(), MemoryError> {
        if address & (SIZE - 1) != 0 {
            return Err(MemoryError::MisalignedAccess);
        }
        Ok(())
    }
}
