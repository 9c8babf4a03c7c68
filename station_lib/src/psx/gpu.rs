//! GPU register stub. Commands are accepted and dropped; the status register reports an idle,
//! ready GPU so that the BIOS boot sequence makes progress.

use super::Psx;
use log::debug;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Gpu {
    /// GPUSTAT. Stays at its reset value: display disabled, ready to receive.
    status: u32,
}

impl Gpu {
    pub fn new() -> Gpu {
        Gpu {
            status: 0x1480_2000,
        }
    }
}

pub fn load(psx: &mut Psx, offset: u32) -> u32 {
    match offset {
        // GPUREAD: no transfer in progress
        0x0 => 0,
        _ => psx.gpu.status,
    }
}

pub fn store(_psx: &mut Psx, offset: u32, value: u32) {
    debug!("GPU write (offset 0x{:x}, value 0x{:08x})", offset, value);
}
