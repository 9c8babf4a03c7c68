//! State of the emulated machine. Every subsystem lives in a submodule and is implemented as
//! free functions over the `Psx` aggregate, which keeps cross-module call chains (bus -> timers
//! -> irq) free of borrow juggling.

pub mod addressable;
pub mod bios;
pub mod bus;
pub mod cdrom;
pub mod dma;
pub mod gpu;
pub mod irq;
pub mod map;
pub mod mdec;
pub mod mem_ctrl;
pub mod pad;
pub mod ram;
pub mod spu;
pub mod sync;
pub mod timers;
pub mod tty;

pub use addressable::{AccessWidth, Addressable};

/// Count of CPU clock cycles (~33.87MHz). Signed so that deadline arithmetic can go negative
/// without wrapping.
pub type CycleCount = i32;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Psx {
    /// CPU cycles elapsed since the last counter rebase
    pub(crate) cycle_counter: CycleCount,
    pub(crate) sync: sync::Synchronizer,
    pub(crate) timers: timers::Timers,
    pub(crate) irq: irq::InterruptState,
    /// Main RAM, 2MB mirrored four times over the first 8MB of address space
    pub(crate) ram: ram::Ram,
    pub(crate) bios: bios::Bios,
    pub(crate) mem_ctrl: mem_ctrl::MemoryControl,
    /// Opaque RAM configuration register, written by the BIOS early in the boot sequence
    pub(crate) ram_size: u32,
    pub(crate) tty: tty::Tty,
    pub(crate) scratch_pad: ram::ScratchPad,
    /// Expansion port ROM, if one is plugged in
    pub(crate) exp1_rom: Option<Vec<u8>>,
    pub(crate) pad: pad::Pad,
    pub(crate) dma: dma::Dma,
    pub(crate) gpu: gpu::Gpu,
    pub(crate) cdrom: cdrom::CdRom,
    pub(crate) mdec: mdec::MDec,
    pub(crate) spu: spu::Spu,
}

impl Psx {
    pub fn new(bios: bios::Bios) -> Psx {
        let mut psx = Psx {
            cycle_counter: 0,
            sync: sync::Synchronizer::new(),
            timers: timers::Timers::new(),
            irq: irq::InterruptState::new(),
            ram: ram::Ram::new(),
            bios,
            mem_ctrl: mem_ctrl::MemoryControl::new(),
            ram_size: 0x0000_0b88,
            tty: tty::Tty::new(),
            scratch_pad: ram::ScratchPad::new(),
            exp1_rom: None,
            pad: pad::Pad::new(),
            dma: dma::Dma::new(),
            gpu: gpu::Gpu::new(),
            cdrom: cdrom::CdRom::new(),
            mdec: mdec::MDec::new(),
            spu: spu::Spu::new(),
        };

        // Publish the initial timer deadline
        sync::synchronize(&mut psx);

        psx
    }

    /// Return every subsystem to its power-on state. The BIOS image and an installed expansion
    /// ROM survive the reset.
    pub fn reset(&mut self) {
        self.cycle_counter = 0;
        self.sync = sync::Synchronizer::new();
        self.timers = timers::Timers::new();
        self.irq = irq::InterruptState::new();
        self.ram = ram::Ram::new();
        self.mem_ctrl = mem_ctrl::MemoryControl::new();
        self.ram_size = 0x0000_0b88;
        self.tty = tty::Tty::new();
        self.scratch_pad = ram::ScratchPad::new();
        self.pad = pad::Pad::new();
        self.dma = dma::Dma::new();
        self.gpu = gpu::Gpu::new();
        self.cdrom = cdrom::CdRom::new();
        self.mdec = mdec::MDec::new();
        self.spu = spu::Spu::new();

        sync::synchronize(self);
    }
}
