//! BIOS ROM image.

use super::addressable::Addressable;
use crate::box_array::BoxArray;
use crate::error::{Result, StationError};
use log::info;

/// BIOS images are always exactly 512KB
pub const BIOS_SIZE: usize = 512 * 1024;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Bios {
    rom: BoxArray<u8, BIOS_SIZE>,
}

impl Bios {
    /// Create a BIOS from the raw image. Anything that isn't exactly `BIOS_SIZE` bytes long is
    /// rejected.
    pub fn new(binary: Vec<u8>) -> Result<Bios> {
        if binary.len() != BIOS_SIZE {
            return Err(StationError::BadBios {
                expected: BIOS_SIZE,
                got: binary.len(),
            });
        }

        Ok(Bios {
            rom: BoxArray::from_vec(binary),
        })
    }

    /// Fetch the little endian value at `offset`
    pub fn load<T: Addressable>(&self, offset: u32) -> T {
        let offset = offset as usize;

        let mut v = 0;

        for i in 0..T::width() as usize {
            v |= u32::from(self.rom[offset + i]) << (i * 8);
        }

        Addressable::from_u32(v)
    }

    /// Patch the instruction word at `offset` to `(old & !mask) | (value & mask)`.
    ///
    /// This is a pre-run affordance for the frontend, it's not reachable from emulated code:
    /// guest writes to the BIOS region are dropped by the bus.
    pub fn patch(&mut self, offset: u32, value: u32, mask: u32) {
        assert!(
            offset & 3 == 0 && (offset as usize) + 4 <= BIOS_SIZE,
            "Out of range BIOS patch at offset 0x{:x}",
            offset
        );

        let old: u32 = self.load(offset);
        let new = (old & !mask) | (value & mask);

        let offset = offset as usize;
        for i in 0..4 {
            self.rom[offset + i] = (new >> (i * 8)) as u8;
        }

        info!(
            "BIOS patch +0x{:x}: 0x{:08x} -> 0x{:08x}",
            offset, old, new
        );
    }

    /// Patch the shell so that `putchar` calls are echoed to the expansion 2 debug UART, making
    /// TTY output visible in the log.
    pub fn enable_tty_output(&mut self) {
        self.patch(0x6f0c, 0x2401_0001, 0xffff_ffff);
        self.patch(0x6f14, 0xaf81_a9c0, 0xffff_ffff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_size_is_rejected() {
        assert!(Bios::new(vec![0; BIOS_SIZE - 1]).is_err());
        assert!(Bios::new(vec![0; BIOS_SIZE + 1]).is_err());
        assert!(Bios::new(vec![0; BIOS_SIZE]).is_ok());
    }

    #[test]
    fn patching_masks_the_value() {
        let mut bios = Bios::new(vec![0xff; BIOS_SIZE]).unwrap();

        bios.patch(0x100, 0x1234_5678, 0x0000_ffff);

        assert_eq!(bios.load::<u32>(0x100), 0xffff_5678);
    }
}
