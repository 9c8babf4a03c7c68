//! Programmable memory access timings.
//!
//! Nine registers describe the mapping and latency of the external bus devices: the base
//! addresses of the two expansion windows, one delay/size register per device and a common
//! delay register shared by all of them. The bus never evaluates these on the fly: every time a
//! register value changes the `(byte, halfword, word)` cycle costs are recomputed and cached.

use super::addressable::AccessWidth;
use super::CycleCount;
use bitfield::bitfield;
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

/// Writable bits of the per-device delay/size registers
const MEM_DELAY_WRITE_MASK: u32 = 0xaf1f_ffff;

/// Writable bits of the common delay register
const COM_DELAY_WRITE_MASK: u32 = 0x0003_ffff;

/// Devices whose access latency is driven by a delay/size register
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimedDevice {
    Exp1 = 0,
    Exp2 = 1,
    Bios = 2,
    CdRom = 3,
    Spu = 4,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Register {
    Exp1Base = 0,
    Exp2Base = 1,
    Exp1Delay = 2,
    Exp3Delay = 3,
    BiosDelay = 4,
    SpuDelay = 5,
    CdRomDelay = 6,
    Exp2Delay = 7,
    ComDelay = 8,
}

#[derive(Serialize)]
pub struct MemoryControl {
    regs: [u32; 9],
    /// Cached `(byte, halfword, word)` access cycles per timed device, always consistent with
    /// `regs`
    #[serde(skip)]
    timings: [[CycleCount; 3]; 5],
}

impl MemoryControl {
    pub fn new() -> MemoryControl {
        let mut mem_ctrl = MemoryControl {
            regs: [
                // EXP1 base
                0x1f00_0000,
                // EXP2 base
                0x1f80_2000,
                // EXP1 delay/size
                0x0013_243f,
                // EXP3 delay/size
                0x0000_3022,
                // BIOS delay/size
                0x0013_243f,
                // SPU delay/size
                0x2009_31e1,
                // CDROM delay/size
                0x0002_0843,
                // EXP2 delay/size
                0x0007_0777,
                // Common delay
                0x0003_1125,
            ],
            timings: [[0; 3]; 5],
        };

        mem_ctrl.recalculate();

        mem_ctrl
    }

    /// Cycle cost of an access of `width` to `device`
    pub fn access_time(&self, device: TimedDevice, width: AccessWidth) -> CycleCount {
        self.timings[device as usize][width.timing_index()]
    }

    /// Register read. `offset` must be word aligned (the bus fixes up narrow accesses).
    pub fn load(&self, offset: u32) -> u32 {
        self.regs[(offset >> 2) as usize]
    }

    /// Register write. Reserved bits keep their previous value; the timing cache is refreshed
    /// only when the stored value actually changes.
    pub fn store(&mut self, offset: u32, value: u32) {
        let index = (offset >> 2) as usize;

        let write_mask = if index == Register::ComDelay as usize {
            COM_DELAY_WRITE_MASK
        } else {
            MEM_DELAY_WRITE_MASK
        };

        let new_value = (self.regs[index] & !write_mask) | (value & write_mask);

        if self.regs[index] != new_value {
            self.regs[index] = new_value;
            self.recalculate();
        }
    }

    fn recalculate(&mut self) {
        self.timings[TimedDevice::Exp1 as usize] = self.timing_for(Register::Exp1Delay);
        self.timings[TimedDevice::Exp2 as usize] = self.timing_for(Register::Exp2Delay);
        self.timings[TimedDevice::Bios as usize] = self.timing_for(Register::BiosDelay);
        self.timings[TimedDevice::CdRom as usize] = self.timing_for(Register::CdRomDelay);
        self.timings[TimedDevice::Spu as usize] = self.timing_for(Register::SpuDelay);

        debug!(
            "BIOS access times: {:?} cycles",
            self.timings[TimedDevice::Bios as usize]
        );
    }

    /// Derive the `(byte, halfword, word)` cycle costs from a delay/size register and the common
    /// delay register, per the nocash timing model.
    fn timing_for(&self, delay_reg: Register) -> [CycleCount; 3] {
        let delay = MemDelay(self.regs[delay_reg as usize]);
        let com = ComDelay(self.regs[Register::ComDelay as usize]);

        let mut first: CycleCount = 0;
        let mut seq: CycleCount = 0;
        let mut min: CycleCount = 0;

        if delay.use_com0_time() {
            first += CycleCount::from(com.com0()) - 1;
            seq += CycleCount::from(com.com0()) - 1;
        }
        if delay.use_com2_time() {
            first += CycleCount::from(com.com2());
            seq += CycleCount::from(com.com2());
        }
        if delay.use_com3_time() {
            min = CycleCount::from(com.com3());
        }
        if first < 6 {
            first += 1;
        }

        first += CycleCount::from(delay.access_time()) + 2;
        seq += CycleCount::from(delay.access_time()) + 2;

        if first < min + 6 {
            first = min + 6;
        }
        if seq < min + 2 {
            seq = min + 2;
        }

        if delay.data_bus_16bit() {
            [first, first, first + seq]
        } else {
            [first, first + seq, first + seq * 3]
        }
    }
}

impl<'de> Deserialize<'de> for MemoryControl {
    fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Registers {
            regs: [u32; 9],
        }

        let r = Registers::deserialize(deserializer)?;

        let mut mem_ctrl = MemoryControl {
            regs: r.regs,
            timings: [[0; 3]; 5],
        };

        mem_ctrl.recalculate();

        Ok(mem_ctrl)
    }
}

bitfield! {
    /// Per-device delay/size register
    #[derive(Clone, Copy)]
    struct MemDelay(u32);
    impl Debug;

    /// Device access time on top of the 2 cycle base
    u8, access_time, _: 3, 0;
    /// Use the COM0 recovery period
    use_com0_time, _: 8;
    /// Use the COM2 floating release period
    use_com2_time, _: 9;
    /// Use the COM3 strobe delay as a floor
    use_com3_time, _: 10;
    /// Data bus width: false = 8 bits, true = 16 bits
    data_bus_16bit, _: 12;
}

bitfield! {
    /// Common delay register, shared by every timed device
    #[derive(Clone, Copy)]
    struct ComDelay(u32);
    impl Debug;

    /// COM0: recovery period cycles
    u8, com0, _: 3, 0;
    /// COM1: hold period cycles (unused by the timing model)
    u8, com1, _: 7, 4;
    /// COM2: floating release cycles
    u8, com2, _: 11, 8;
    /// COM3: strobe active-going edge delay
    u8, com3, _: 15, 12;
}
