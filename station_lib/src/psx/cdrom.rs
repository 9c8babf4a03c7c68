//! CDROM controller stub. The register file is byte-wide; only the bank index register is
//! actually stored, everything else reads as an idle drive with empty FIFOs.

use super::Psx;
use log::debug;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct CdRom {
    /// Register bank selector (the low two bits of the status register)
    index: u8,
}

impl CdRom {
    pub fn new() -> CdRom {
        CdRom { index: 0 }
    }
}

pub fn load(psx: &mut Psx, offset: u32) -> u8 {
    match offset {
        // Status: parameter FIFO empty and ready for writing
        0x0 => 0x18 | psx.cdrom.index,
        _ => {
            debug!("CDROM read (offset 0x{:x})", offset);
            0
        }
    }
}

pub fn store(psx: &mut Psx, offset: u32, value: u8) {
    match offset {
        0x0 => psx.cdrom.index = value & 3,
        _ => debug!("CDROM write (offset 0x{:x}, value 0x{:02x})", offset, value),
    }
}
