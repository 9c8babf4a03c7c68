//! Main RAM and the scratchpad.

use super::addressable::Addressable;
use crate::box_array::BoxArray;

/// System RAM: 2MB
pub const RAM_SIZE: usize = 2 * 1024 * 1024;

/// ScratchPad: the data cache, usable as a fast 1kB RAM
pub const SCRATCH_PAD_SIZE: usize = 1024;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Ram {
    data: BoxArray<u8, RAM_SIZE>,
}

impl Ram {
    pub fn new() -> Ram {
        Ram {
            data: BoxArray::filled_with(0),
        }
    }

    /// Fetch the little endian value at `offset`. The 2MB of RAM are mirrored four times over
    /// the first 8MB of address space, only the low bits of the offset matter.
    pub fn load<T: Addressable>(&self, offset: u32) -> T {
        let offset = (offset as usize) & (RAM_SIZE - 1);

        let mut v = 0;

        for i in 0..T::width() as usize {
            v |= u32::from(self.data[offset + i]) << (i * 8);
        }

        Addressable::from_u32(v)
    }

    /// Store `val` as a little endian value at `offset`
    pub fn store<T: Addressable>(&mut self, offset: u32, val: T) {
        let offset = (offset as usize) & (RAM_SIZE - 1);

        let val = val.as_u32();

        for i in 0..T::width() as usize {
            self.data[offset + i] = (val >> (i * 8)) as u8;
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct ScratchPad {
    #[serde(with = "serde_big_array::BigArray")]
    data: [u8; SCRATCH_PAD_SIZE],
}

impl ScratchPad {
    pub fn new() -> ScratchPad {
        ScratchPad {
            data: [0; SCRATCH_PAD_SIZE],
        }
    }

    /// Fetch the little endian value at `offset`
    pub fn load<T: Addressable>(&self, offset: u32) -> T {
        let offset = offset as usize;

        let mut v = 0;

        for i in 0..T::width() as usize {
            v |= u32::from(self.data[offset + i]) << (i * 8);
        }

        Addressable::from_u32(v)
    }

    /// Store `val` as a little endian value at `offset`
    pub fn store<T: Addressable>(&mut self, offset: u32, val: T) {
        let offset = offset as usize;

        let val = val.as_u32();

        for i in 0..T::width() as usize {
            self.data[offset + i] = (val >> (i * 8)) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_mirroring() {
        let mut ram = Ram::new();

        ram.store::<u32>(0x10, 0xdead_beef);

        assert_eq!(ram.load::<u32>(0x10), 0xdead_beef);
        assert_eq!(ram.load::<u32>(0x0020_0010), 0xdead_beef);
        assert_eq!(ram.load::<u32>(0x0060_0010), 0xdead_beef);
        assert_eq!(ram.load::<u16>(0x12), 0xdead);
        assert_eq!(ram.load::<u8>(0x13), 0xde);
    }

    #[test]
    fn scratchpad_byte_order() {
        let mut sp = ScratchPad::new();

        sp.store::<u16>(0x0, 0x1234);

        assert_eq!(sp.load::<u8>(0x0), 0x34);
        assert_eq!(sp.load::<u8>(0x1), 0x12);
    }
}
