//! Gamepad and memory card controller, reduced to its register file. No device is plugged in:
//! reads of the RX FIFO always come back empty and transfers complete instantly.

use super::Psx;
use log::warn;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Pad {
    mode: u16,
    control: u16,
    baud_rate: u16,
}

impl Pad {
    pub fn new() -> Pad {
        Pad {
            mode: 0,
            control: 0,
            baud_rate: 0,
        }
    }
}

pub fn load(psx: &mut Psx, offset: u32) -> u32 {
    match offset {
        // RX FIFO: always empty
        0x0 => 0xffff_ffff,
        // Status: TX ready, TX idle
        0x4 => 0x5,
        0x8 => u32::from(psx.pad.mode),
        0xa => u32::from(psx.pad.control),
        0xe => u32::from(psx.pad.baud_rate),
        _ => {
            warn!("Read from unknown pad register (offset 0x{:x})", offset);
            0
        }
    }
}

pub fn store(psx: &mut Psx, offset: u32, value: u32) {
    match offset {
        // TX FIFO: the byte goes nowhere since nothing is connected
        0x0 => (),
        0x8 => psx.pad.mode = value as u16,
        0xa => psx.pad.control = value as u16,
        0xe => psx.pad.baud_rate = value as u16,
        _ => warn!(
            "Write to unknown pad register (offset 0x{:x}, value 0x{:08x})",
            offset, value
        ),
    }
}
