//! Interrupt controller: a status register latching request edges from the peripherals and a
//! mask register gating which of them reach the CPU.

use super::Psx;
use log::warn;

/// The ten interrupt lines of the controller. Only the sources the core raises are listed; the
/// discriminant is the bit index in the status/mask registers.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
    /// Display entered vertical blanking
    VBlank = 0,
    /// CDROM controller
    CdRom = 2,
    /// DMA transfer done
    Dma = 3,
    /// Timer 0
    Timer0 = 4,
    /// Timer 1
    Timer1 = 5,
    /// Timer 2
    Timer2 = 6,
    /// Gamepad and memory card controller
    PadMemCard = 7,
    /// SPU
    Spu = 9,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct InterruptState {
    /// Latched interrupt requests
    status: u16,
    /// Interrupt mask
    mask: u16,
}

impl InterruptState {
    pub fn new() -> InterruptState {
        InterruptState { status: 0, mask: 0 }
    }
}

pub fn status(psx: &Psx) -> u16 {
    psx.irq.status
}

pub fn mask(psx: &Psx) -> u16 {
    psx.irq.mask
}

/// Latch a request edge on `which`. This is the single entry point peripherals use to raise an
/// interrupt.
pub fn trigger(psx: &mut Psx, which: Interrupt) {
    psx.irq.status |= 1 << which as usize;
}

/// Acknowledge interrupts: guest writes 0 to the bits it wants to clear
pub fn ack(psx: &mut Psx, ack: u16) {
    psx.irq.status &= ack;
}

pub fn set_mask(psx: &mut Psx, mask: u16) {
    psx.irq.mask = mask;
}

/// True if at least one latched and unmasked interrupt is waiting for the CPU
pub fn pending(psx: &Psx) -> bool {
    psx.irq.status & psx.irq.mask != 0
}

/// Register interface, forwarded by the bus from the controller's register block
pub fn load(psx: &mut Psx, offset: u32) -> u32 {
    match offset {
        0x0 => u32::from(status(psx)),
        0x4 => u32::from(mask(psx)),
        _ => {
            warn!("Read from unknown IRQ register (offset 0x{:x})", offset);
            0
        }
    }
}

pub fn store(psx: &mut Psx, offset: u32, value: u32) {
    match offset {
        0x0 => ack(psx, value as u16),
        0x4 => set_mask(psx, value as u16),
        _ => warn!(
            "Write to unknown IRQ register (offset 0x{:x}, value 0x{:08x})",
            offset, value
        ),
    }
}

/// Helper enum for return values of functions that can trigger an interrupt. Generates a
/// compiler warning when it's not checked, which should help avoid "losing" interrupts.
#[must_use]
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum IrqState {
    Idle,
    Active,
}

impl IrqState {
    pub fn is_active(self) -> bool {
        self == IrqState::Active
    }
}
