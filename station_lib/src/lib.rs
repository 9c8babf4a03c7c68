//! Emulation core for a MIPS-based fifth generation home console, centered on the two pieces of
//! hardware every instruction interacts with: the three-counter timer block and the memory bus
//! fabric with its programmable access timings.
//!
//! The CPU core itself is not part of this crate. Instead the crate exposes the exact surface a
//! CPU needs: width-typed bus accesses that return their cycle cost, a downcount telling it how
//! long it can run before the timers need attention, and the interrupt controller state.

mod box_array;
mod error;
mod psx;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use error::{Result, StationError};
pub use psx::bios::{Bios, BIOS_SIZE};
pub use psx::irq::Interrupt;
pub use psx::{AccessWidth, Addressable, CycleCount};

use psx::{bus, irq, sync, timers, Psx};

/// Rebase the cycle counters well before a `CycleCount` could overflow
const REBASE_THRESHOLD: CycleCount = 0x1000_0000;

pub struct Station {
    psx: Psx,
}

impl Station {
    /// Build a machine around `bios`
    pub fn new(bios: Bios) -> Station {
        Station {
            psx: Psx::new(bios),
        }
    }

    /// Build a machine, loading the BIOS image from `path`. Fails if the file can't be read or
    /// isn't a valid BIOS image.
    pub fn from_bios_file(path: &Path) -> Result<Station> {
        let binary = std::fs::read(path)?;

        Ok(Station::new(Bios::new(binary)?))
    }

    /// Read of `T` at `address`. The access's cycle cost is charged to the emulated CPU.
    pub fn load<T: Addressable>(&mut self, address: u32) -> T {
        let (v, cost) = bus::load(&mut self.psx, address);

        self.psx.cycle_counter += cost;

        v
    }

    /// Write of `T` at `address`. The access's cycle cost is charged to the emulated CPU.
    pub fn store<T: Addressable>(&mut self, address: u32, val: T) {
        let cost = bus::store(&mut self.psx, address, val);

        self.psx.cycle_counter += cost;
    }

    /// Account for `cycles` spent executing CPU instructions, then run whatever timer work came
    /// due.
    pub fn run(&mut self, cycles: CycleCount) {
        self.psx.cycle_counter += cycles;

        sync::handle_events(&mut self.psx);

        if self.psx.cycle_counter >= REBASE_THRESHOLD {
            sync::rebase_counters(&mut self.psx);
        }
    }

    /// Return the machine to its power-on state. The BIOS image and an installed expansion ROM
    /// are kept.
    pub fn reset(&mut self) {
        self.psx.reset();
    }

    /// Number of cycles the CPU can execute before it must call `run`. The deadline is
    /// conservative: running past it is tolerated but delays timer interrupts.
    pub fn downcount(&self) -> CycleCount {
        sync::downcount(&self.psx)
    }

    /// True if a latched, unmasked interrupt is waiting for the CPU
    pub fn irq_pending(&self) -> bool {
        irq::pending(&self.psx)
    }

    /// Drive the gate input of timer `which`. On the real machine timer 0 is gated by HBlank and
    /// timer 1 by VBlank; the video code calls this on every transition.
    pub fn set_timer_gate(&mut self, which: usize, state: bool) {
        timers::set_gate(&mut self.psx, which, state);
    }

    /// Deliver externally generated clock pulses (dot clock, hblank counts) to timer `which`
    pub fn add_timer_ticks(&mut self, which: usize, count: CycleCount) {
        timers::add_ticks(&mut self.psx, which, count);
    }

    /// Patch a word of the BIOS image before execution starts
    pub fn patch_bios(&mut self, offset: u32, value: u32, mask: u32) {
        self.psx.bios.patch(offset, value, mask);
    }

    /// Patch the BIOS so that its TTY output lands in the log
    pub fn enable_tty_output(&mut self) {
        self.psx.bios.enable_tty_output();
    }

    /// Plug a ROM into the expansion port
    pub fn set_expansion_rom(&mut self, rom: Vec<u8>) {
        bus::set_expansion_rom(&mut self.psx, rom);
    }

    /// Serialize the complete machine state
    pub fn save_state(&self) -> Result<Vec<u8>> {
        let mut fb = flexbuffers::FlexbufferSerializer::new();

        self.psx
            .serialize(&mut fb)
            .map_err(|e| StationError::DeserializationError(e.to_string()))?;

        Ok(fb.take_buffer())
    }

    /// Replace the machine state with a previously saved one. On failure the current state is
    /// left untouched.
    pub fn load_state(&mut self, state: &[u8]) -> Result<()> {
        let reader = flexbuffers::Reader::get_root(state)
            .map_err(|e| StationError::DeserializationError(e.to_string()))?;

        self.psx = Psx::deserialize(reader)
            .map_err(|e| StationError::DeserializationError(e.to_string()))?;

        Ok(())
    }
}
