//! SPU register file. Sound isn't generated but the 16 bit registers hold their values, which
//! is enough for the BIOS initialization and for the bus word-splitting policy to be visible.

use super::Psx;

/// Number of 16 bit registers in the SPU block
const REG_COUNT: usize = 512;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Spu {
    #[serde(with = "serde_big_array::BigArray")]
    regs: [u16; REG_COUNT],
}

impl Spu {
    pub fn new() -> Spu {
        Spu {
            regs: [0; REG_COUNT],
        }
    }
}

pub fn load(psx: &mut Psx, offset: u32) -> u16 {
    psx.spu.regs[(offset >> 1) as usize]
}

pub fn store(psx: &mut Psx, offset: u32, value: u16) {
    psx.spu.regs[(offset >> 1) as usize] = value;
}
