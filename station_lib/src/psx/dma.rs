//! DMA controller register file. Transfers themselves are not modeled, the registers just hold
//! their values so that the bus fixup and zero-extension policies are observable.

use super::Psx;
use log::warn;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Dma {
    /// Base address, block control and channel control for each of the 7 channels
    channels: [[u32; 3]; 7],
    control: u32,
    interrupt: u32,
}

impl Dma {
    pub fn new() -> Dma {
        Dma {
            channels: [[0; 3]; 7],
            // Priority reset value
            control: 0x0765_4321,
            interrupt: 0,
        }
    }
}

pub fn load(psx: &mut Psx, offset: u32) -> u32 {
    let channel = (offset >> 4) as usize;
    let reg = ((offset & 0xc) >> 2) as usize;

    match channel {
        0..=6 if reg < 3 => psx.dma.channels[channel][reg],
        7 => match reg {
            0 => psx.dma.control,
            1 => psx.dma.interrupt,
            _ => {
                warn!("Read from unknown DMA register (offset 0x{:x})", offset);
                0
            }
        },
        _ => {
            warn!("Read from unknown DMA register (offset 0x{:x})", offset);
            0
        }
    }
}

pub fn store(psx: &mut Psx, offset: u32, value: u32) {
    let channel = (offset >> 4) as usize;
    let reg = ((offset & 0xc) >> 2) as usize;

    match channel {
        0..=6 if reg < 3 => psx.dma.channels[channel][reg] = value,
        7 => match reg {
            0 => psx.dma.control = value,
            1 => psx.dma.interrupt = value,
            _ => warn!(
                "Write to unknown DMA register (offset 0x{:x}, value 0x{:08x})",
                offset, value
            ),
        },
        _ => warn!(
            "Write to unknown DMA register (offset 0x{:x}, value 0x{:08x})",
            offset, value
        ),
    }
}
