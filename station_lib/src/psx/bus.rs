//! The memory bus fabric: decodes every CPU access to a physical region, routes a width-correct
//! read or write to the device behind it and returns the cycle cost of the access.
//!
//! Three width policies coexist on this bus:
//!
//! - memory-like regions (RAM, scratchpad, BIOS, expansion ROM) honor the access width directly;
//! - blocks of 32 bit registers (memory control, interrupt controller, DMA, timers) only decode
//!   word addresses, so narrow accesses are remapped: the offset is rounded down to the word
//!   boundary and the value is shifted into position;
//! - the SPU sits on a 16 bit bus, a word access is split into two halfword accesses.

use super::mem_ctrl::TimedDevice;
use super::{cdrom, dma, gpu, irq, map, mdec, pad, spu, timers};
use super::{AccessWidth, Addressable, CycleCount, Psx};
use log::{debug, error, warn};

/// Cycle cost of a RAM, scratchpad or internal register access
const FAST_ACCESS_TIME: CycleCount = 1;

/// Round a narrow access at `offset` down to its 32 bit register, shifting `value` into the lane
/// the register expects
fn fixup_word_store(offset: u32, value: u32) -> (u32, u32) {
    (offset & !3, value << ((offset & 3) * 8))
}

/// Shift a 32 bit register `value` so that the lane addressed by `offset` lands in the low bits
fn fixup_word_load(offset: u32, value: u32) -> u32 {
    value >> ((offset & 3) * 8)
}

/// Read of `T` at `address`. Returns the value and the access's cycle cost.
pub fn load<T: Addressable>(psx: &mut Psx, address: u32) -> (T, CycleCount) {
    let abs_addr = map::mask_region(address);

    if let Some(offset) = map::RAM.contains(abs_addr) {
        return (psx.ram.load(offset), FAST_ACCESS_TIME);
    }

    if let Some(offset) = map::BIOS.contains(abs_addr) {
        let timing = psx.mem_ctrl.access_time(TimedDevice::Bios, T::width());

        return (psx.bios.load(offset), timing);
    }

    if let Some(offset) = map::SCRATCH_PAD.contains(abs_addr) {
        return (psx.scratch_pad.load(offset), FAST_ACCESS_TIME);
    }

    if let Some(offset) = map::MEM_CONTROL.contains(abs_addr) {
        let v = psx.mem_ctrl.load(offset & !3);

        return (T::from_u32(fixup_word_load(offset, v)), FAST_ACCESS_TIME);
    }

    if let Some(offset) = map::PAD.contains(abs_addr) {
        return (T::from_u32(pad::load(psx, offset)), FAST_ACCESS_TIME);
    }

    if let Some(offset) = map::SIO.contains(abs_addr) {
        return (T::from_u32(sio_load(offset)), FAST_ACCESS_TIME);
    }

    if let Some(offset) = map::RAM_SIZE.contains(abs_addr) {
        let v = if offset == 0 {
            psx.ram_size
        } else {
            invalid_load::<T>(address)
        };

        return (T::from_u32(v), FAST_ACCESS_TIME);
    }

    if let Some(offset) = map::IRQ_CONTROL.contains(abs_addr) {
        let v = irq::load(psx, offset & !3);

        return (T::from_u32(fixup_word_load(offset, v)), FAST_ACCESS_TIME);
    }

    if let Some(offset) = map::DMA.contains(abs_addr) {
        let v = dma::load(psx, offset & !3);

        return (T::from_u32(fixup_word_load(offset, v)), FAST_ACCESS_TIME);
    }

    if let Some(offset) = map::TIMERS.contains(abs_addr) {
        let v = timers::load(psx, offset & !3);

        return (T::from_u32(fixup_word_load(offset, v)), FAST_ACCESS_TIME);
    }

    if let Some(offset) = map::CDROM.contains(abs_addr) {
        // The CDROM controller only decodes byte accesses
        debug_assert!(
            T::width() == AccessWidth::Byte,
            "{:?} CDROM read",
            T::width()
        );

        let timing = psx.mem_ctrl.access_time(TimedDevice::CdRom, T::width());

        return (T::from_u32(u32::from(cdrom::load(psx, offset))), timing);
    }

    if let Some(offset) = map::GPU.contains(abs_addr) {
        debug_assert!(T::width() == AccessWidth::Word, "{:?} GPU read", T::width());

        return (T::from_u32(gpu::load(psx, offset)), FAST_ACCESS_TIME);
    }

    if let Some(offset) = map::MDEC.contains(abs_addr) {
        debug_assert!(T::width() == AccessWidth::Word, "{:?} MDEC read", T::width());

        return (T::from_u32(mdec::load(psx, offset)), FAST_ACCESS_TIME);
    }

    if let Some(offset) = map::SPU.contains(abs_addr) {
        let timing = psx.mem_ctrl.access_time(TimedDevice::Spu, T::width());

        // The SPU sits on a 16 bit bus: word reads are two back-to-back halfword reads
        let v = if T::width() == AccessWidth::Word {
            let lo = u32::from(spu::load(psx, offset));
            let hi = u32::from(spu::load(psx, offset + 2));

            lo | (hi << 16)
        } else {
            u32::from(spu::load(psx, offset))
        };

        return (T::from_u32(v), timing);
    }

    if let Some(offset) = map::EXPANSION_1.contains(abs_addr) {
        let timing = psx.mem_ctrl.access_time(TimedDevice::Exp1, T::width());

        return (T::from_u32(exp1_load::<T>(psx, offset)), timing);
    }

    if let Some(offset) = map::EXPANSION_2.contains(abs_addr) {
        let timing = psx.mem_ctrl.access_time(TimedDevice::Exp2, T::width());

        return (T::from_u32(exp2_load(offset)), timing);
    }

    (T::from_u32(invalid_load::<T>(address)), FAST_ACCESS_TIME)
}

/// Write of `T` at `address`. Returns the access's cycle cost.
pub fn store<T: Addressable>(psx: &mut Psx, address: u32, val: T) -> CycleCount {
    let abs_addr = map::mask_region(address);
    let value = val.as_u32();

    if let Some(offset) = map::RAM.contains(abs_addr) {
        psx.ram.store(offset, val);

        return FAST_ACCESS_TIME;
    }

    if map::BIOS.contains(abs_addr).is_some() {
        // The BIOS is read-only through the CPU path, writes fall on the floor
        debug!(
            "Ignored write to the BIOS (address 0x{:08x}, value 0x{:08x})",
            address, value
        );

        return psx.mem_ctrl.access_time(TimedDevice::Bios, T::width());
    }

    if let Some(offset) = map::SCRATCH_PAD.contains(abs_addr) {
        psx.scratch_pad.store(offset, val);

        return FAST_ACCESS_TIME;
    }

    if let Some(offset) = map::MEM_CONTROL.contains(abs_addr) {
        let (offset, value) = fixup_word_store(offset, value);

        psx.mem_ctrl.store(offset, value);

        return FAST_ACCESS_TIME;
    }

    if let Some(offset) = map::PAD.contains(abs_addr) {
        pad::store(psx, offset, value);

        return FAST_ACCESS_TIME;
    }

    if let Some(offset) = map::SIO.contains(abs_addr) {
        error!(
            "SIO write (offset 0x{:x}, value 0x{:08x})",
            offset, value
        );

        return FAST_ACCESS_TIME;
    }

    if let Some(offset) = map::RAM_SIZE.contains(abs_addr) {
        if offset == 0 {
            psx.ram_size = value;
        } else {
            invalid_store::<T>(address, value);
        }

        return FAST_ACCESS_TIME;
    }

    if let Some(offset) = map::IRQ_CONTROL.contains(abs_addr) {
        let (offset, value) = fixup_word_store(offset, value);

        irq::store(psx, offset, value);

        return FAST_ACCESS_TIME;
    }

    if let Some(offset) = map::DMA.contains(abs_addr) {
        let (offset, value) = match T::width() {
            AccessWidth::Word => (offset, value),
            _ => {
                // Narrow writes to a channel's block control register are zero-extended instead
                // of being shifted into their byte lane
                if (offset >> 4) < 7 && (offset & 0xf) == 0x4 {
                    (offset, value)
                } else {
                    fixup_word_store(offset, value)
                }
            }
        };

        dma::store(psx, offset, value);

        return FAST_ACCESS_TIME;
    }

    if let Some(offset) = map::TIMERS.contains(abs_addr) {
        let (offset, value) = fixup_word_store(offset, value);

        timers::store(psx, offset, value);

        return FAST_ACCESS_TIME;
    }

    if let Some(offset) = map::CDROM.contains(abs_addr) {
        debug_assert!(
            T::width() == AccessWidth::Byte,
            "{:?} CDROM write",
            T::width()
        );

        cdrom::store(psx, offset, value as u8);

        return psx.mem_ctrl.access_time(TimedDevice::CdRom, T::width());
    }

    if let Some(offset) = map::GPU.contains(abs_addr) {
        debug_assert!(T::width() == AccessWidth::Word, "{:?} GPU write", T::width());

        gpu::store(psx, offset, value);

        return FAST_ACCESS_TIME;
    }

    if let Some(offset) = map::MDEC.contains(abs_addr) {
        debug_assert!(
            T::width() == AccessWidth::Word,
            "{:?} MDEC write",
            T::width()
        );

        mdec::store(psx, offset, value);

        return FAST_ACCESS_TIME;
    }

    if let Some(offset) = map::SPU.contains(abs_addr) {
        // Word writes are split in two on the SPU's 16 bit bus
        if T::width() == AccessWidth::Word {
            spu::store(psx, offset, value as u16);
            spu::store(psx, offset + 2, (value >> 16) as u16);
        } else {
            spu::store(psx, offset, value as u16);
        }

        return psx.mem_ctrl.access_time(TimedDevice::Spu, T::width());
    }

    if let Some(offset) = map::EXPANSION_1.contains(abs_addr) {
        warn!(
            "EXP1 write (offset 0x{:x}, value 0x{:08x})",
            offset, value
        );

        return psx.mem_ctrl.access_time(TimedDevice::Exp1, T::width());
    }

    if let Some(offset) = map::EXPANSION_2.contains(abs_addr) {
        exp2_store(psx, offset, value);

        return psx.mem_ctrl.access_time(TimedDevice::Exp2, T::width());
    }

    invalid_store::<T>(address, value);

    FAST_ACCESS_TIME
}

/// Install an expansion port ROM (Action Replay style). Pre-run affordance for the frontend.
pub fn set_expansion_rom(psx: &mut Psx, rom: Vec<u8>) {
    psx.exp1_rom = Some(rom);
}

fn invalid_load<T: Addressable>(address: u32) -> u32 {
    error!(
        "Invalid bus {:?} read at address 0x{:08x}",
        T::width(),
        address
    );

    0xffff_ffff
}

fn invalid_store<T: Addressable>(address: u32, value: u32) {
    error!(
        "Invalid bus {:?} write at address 0x{:08x} (value 0x{:08x})",
        T::width(),
        address,
        value
    );
}

fn exp1_load<T: Addressable>(psx: &Psx, offset: u32) -> u32 {
    let rom = match psx.exp1_rom {
        Some(ref rom) => rom,
        // Nothing plugged into the expansion port
        None => return 0xffff_ffff,
    };

    // Magic "cartridge present" bit
    if offset == 0x2_0018 {
        return 1;
    }

    let offset = offset as usize;
    let len = T::width() as usize;

    if offset + len > rom.len() {
        return 0;
    }

    let mut v = 0;

    for i in 0..len {
        v |= u32::from(rom[offset + i]) << (i * 8);
    }

    v
}

fn exp2_load(offset: u32) -> u32 {
    match offset {
        // UART status: rx and tx buffers empty
        0x21 => 0x04 | 0x08,
        _ => {
            warn!("EXP2 read (offset 0x{:x})", offset);
            0xffff_ffff
        }
    }
}

fn exp2_store(psx: &mut Psx, offset: u32, value: u32) {
    match offset {
        // UART data port: the BIOS echoes TTY output here
        0x23 => psx.tty.push_byte(value as u8),
        // BIOS POST status
        0x41 => warn!("BIOS POST status: 0x{:02x}", value & 0xf),
        _ => warn!(
            "EXP2 write (offset 0x{:x}, value 0x{:08x})",
            offset, value
        ),
    }
}

fn sio_load(offset: u32) -> u32 {
    error!("SIO read (offset 0x{:x})", offset);

    // Status register: TX ready and idle
    if offset == 0x4 {
        0x5
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psx::bios::{Bios, BIOS_SIZE};

    fn new_psx() -> Psx {
        Psx::new(Bios::new(vec![0; BIOS_SIZE]).unwrap())
    }

    fn load<T: Addressable>(psx: &mut Psx, address: u32) -> T {
        super::load::<T>(psx, address).0
    }

    fn store<T: Addressable>(psx: &mut Psx, address: u32, val: T) {
        super::store(psx, address, val);
    }

    #[test]
    fn ram_mirrors_and_segments() {
        let mut psx = new_psx();

        store::<u32>(&mut psx, 0x0000_0000, 0x0bad_cafe);

        // 2MB of RAM mirrored over 8MB, visible through KUSEG, KSEG0 and KSEG1
        assert_eq!(load::<u32>(&mut psx, 0x0020_0000), 0x0bad_cafe);
        assert_eq!(load::<u32>(&mut psx, 0x8000_0000), 0x0bad_cafe);
        assert_eq!(load::<u32>(&mut psx, 0xa060_0000), 0x0bad_cafe);
        assert_eq!(load::<u16>(&mut psx, 0x0000_0002), 0x0bad);
        assert_eq!(load::<u8>(&mut psx, 0x0000_0001), 0xca);
    }

    #[test]
    fn bios_writes_are_dropped() {
        let mut psx = new_psx();

        psx.bios.patch(0x100, 0x1234_5678, 0xffff_ffff);

        store::<u32>(&mut psx, 0x1fc0_0100, 0xdead_beef);

        assert_eq!(load::<u32>(&mut psx, 0x1fc0_0100), 0x1234_5678);
        // And through the cached KSEG0 mirror too
        assert_eq!(load::<u32>(&mut psx, 0xbfc0_0100), 0x1234_5678);
    }

    #[test]
    fn unaligned_timer_mode_read() {
        let mut psx = new_psx();

        store::<u32>(&mut psx, 0x1f80_1124, 0x0000_1234);

        // The byte lane is extracted from the containing word register
        assert_eq!(load::<u8>(&mut psx, 0x1f80_1125), 0x12);
    }

    #[test]
    fn unaligned_timer_counter_write() {
        let mut psx = new_psx();

        // A halfword write at +2 lands in the upper lane of the counter register and gets
        // truncated away by the 16 bit counter
        store::<u16>(&mut psx, 0x1f80_1112, 0xffff);
        assert_eq!(load::<u32>(&mut psx, 0x1f80_1110), 0);

        store::<u16>(&mut psx, 0x1f80_1110, 0x1234);
        assert_eq!(load::<u32>(&mut psx, 0x1f80_1110), 0x1234);
    }

    #[test]
    fn spu_word_access_is_split() {
        let mut psx = new_psx();

        store::<u32>(&mut psx, 0x1f80_1c20, 0xdead_beef);

        assert_eq!(load::<u16>(&mut psx, 0x1f80_1c20), 0xbeef);
        assert_eq!(load::<u16>(&mut psx, 0x1f80_1c22), 0xdead);
        assert_eq!(load::<u32>(&mut psx, 0x1f80_1c20), 0xdead_beef);
    }

    #[test]
    fn dma_narrow_block_control_write_is_zero_extended() {
        let mut psx = new_psx();

        // Halfword write to channel 2's block control
        store::<u16>(&mut psx, 0x1f80_10a4, 0xbeef);

        assert_eq!(load::<u32>(&mut psx, 0x1f80_10a4), 0x0000_beef);

        // Other narrow DMA writes use the regular byte lane remapping
        store::<u32>(&mut psx, 0x1f80_10a0, 0);
        store::<u8>(&mut psx, 0x1f80_10a1, 0x7f);

        assert_eq!(load::<u32>(&mut psx, 0x1f80_10a0), 0x0000_7f00);
    }

    #[test]
    fn exp1_reads() {
        let mut psx = new_psx();

        // Nothing plugged in
        assert_eq!(load::<u32>(&mut psx, 0x1f00_0000), 0xffff_ffff);

        set_expansion_rom(&mut psx, vec![0x11, 0x22, 0x33, 0x44]);

        assert_eq!(load::<u32>(&mut psx, 0x1f00_0000), 0x4433_2211);
        assert_eq!(load::<u8>(&mut psx, 0x1f00_0003), 0x44);
        // Reads past the end of the ROM
        assert_eq!(load::<u32>(&mut psx, 0x1f00_0002), 0);
        // Cartridge detection bit
        assert_eq!(load::<u32>(&mut psx, 0x1f02_0018), 1);
    }

    #[test]
    fn tty_output_through_exp2() {
        let mut psx = new_psx();

        for &b in b"hello" {
            store::<u8>(&mut psx, 0x1f80_2023, b);
        }

        assert!(!psx.tty.is_empty());

        store::<u8>(&mut psx, 0x1f80_2023, b'\n');

        assert!(psx.tty.is_empty());
    }

    #[test]
    fn mem_control_write_masks_reserved_bits() {
        let mut psx = new_psx();

        // Common delay register: bits 18+ are read-only
        store::<u32>(&mut psx, 0x1f80_1020, 0xffff_ffff);

        assert_eq!(load::<u32>(&mut psx, 0x1f80_1020), 0x0003_ffff);
    }

    #[test]
    fn ram_size_register() {
        let mut psx = new_psx();

        assert_eq!(load::<u32>(&mut psx, 0x1f80_1060), 0x0000_0b88);

        store::<u32>(&mut psx, 0x1f80_1060, 0x1234_5678);

        assert_eq!(load::<u32>(&mut psx, 0x1f80_1060), 0x1234_5678);
    }

    #[test]
    fn unmapped_addresses_read_all_ones() {
        let mut psx = new_psx();

        // Hole between the scratchpad and the I/O registers
        assert_eq!(load::<u32>(&mut psx, 0x1f80_0400), 0xffff_ffff);
        // Writes are dropped without side effects
        store::<u32>(&mut psx, 0x1f80_0400, 42);
    }

    #[test]
    fn access_costs_follow_the_timing_registers() {
        let mut psx = new_psx();

        let (_, ram_cost) = super::load::<u32>(&mut psx, 0x0000_0000);
        assert_eq!(ram_cost, 1);

        // Reset BIOS timings: 8 bit bus, access time 15 (see mem_ctrl)
        let (_, bios_byte) = super::load::<u8>(&mut psx, 0x1fc0_0000);
        let (_, bios_word) = super::load::<u32>(&mut psx, 0x1fc0_0000);
        assert_eq!(bios_byte, 18);
        assert_eq!(bios_word, 69);

        // Speed up the BIOS window and check the cost follows
        store::<u32>(&mut psx, 0x1f80_1010, 0);

        let (_, bios_word) = super::load::<u32>(&mut psx, 0x1fc0_0000);
        assert_eq!(bios_word, 6 + 2 * 3);
    }

    #[test]
    fn sio_stub_status() {
        let mut psx = new_psx();

        assert_eq!(load::<u32>(&mut psx, 0x1f80_1054), 0x5);
    }
}
