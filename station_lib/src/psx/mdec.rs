//! Macroblock decoder stub: the status register reports an idle decoder, commands are dropped.

use super::Psx;
use log::debug;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct MDec {
    /// Status register. Stays at its reset value: data-out FIFO empty, no transfer in progress.
    status: u32,
}

impl MDec {
    pub fn new() -> MDec {
        MDec {
            status: 0x8004_0000,
        }
    }
}

pub fn load(psx: &mut Psx, offset: u32) -> u32 {
    match offset {
        // Data/response FIFO: empty
        0x0 => 0,
        _ => psx.mdec.status,
    }
}

pub fn store(_psx: &mut Psx, offset: u32, value: u32) {
    debug!("MDEC write (offset 0x{:x}, value 0x{:08x})", offset, value);
}
