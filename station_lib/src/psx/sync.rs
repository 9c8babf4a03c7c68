//! Scheduling glue between the CPU and the timers.
//!
//! The CPU free-runs and only accounts for elapsed cycles in `Psx::cycle_counter`. Before any
//! register access that could observe timer state (and whenever the published deadline expires)
//! the accumulated tick debt is flushed into the timers in one batch. The timers report back the
//! date of their next guaranteed event (the "downcount"), which tells the CPU how long it can run
//! before it must synchronize again.

use super::{timers, CycleCount, Psx};

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Synchronizer {
    /// Date of the last time the timers caught up with the CPU
    last_sync: CycleCount,
    /// Date at which the timers must run again at the latest
    next_event: CycleCount,
}

impl Synchronizer {
    pub fn new() -> Synchronizer {
        Synchronizer {
            last_sync: 0,
            next_event: 0,
        }
    }
}

/// Flush the tick debt accumulated since the last sync into the timers. Always runs the timer
/// batch (possibly with 0 ticks) so that the published downcount is refreshed.
pub fn synchronize(psx: &mut Psx) {
    let elapsed = psx.cycle_counter - psx.sync.last_sync;

    debug_assert!(elapsed >= 0);

    psx.sync.last_sync = psx.cycle_counter;

    timers::execute(psx, elapsed.max(0));
}

/// Publish the number of ticks until the next guaranteed timer event
pub fn set_downcount(psx: &mut Psx, delay: CycleCount) {
    debug_assert!(delay > 0);

    psx.sync.next_event = psx.cycle_counter.saturating_add(delay);
}

/// Remaining ticks the CPU may run before it has to call `handle_events`. Negative when we're
/// already overdue.
pub fn downcount(psx: &Psx) -> CycleCount {
    psx.sync.next_event - psx.cycle_counter
}

pub fn is_event_pending(psx: &Psx) -> bool {
    psx.cycle_counter >= psx.sync.next_event
}

/// Run the timers if their deadline expired. `synchronize` always republishes a deadline in the
/// future, so this converges.
pub fn handle_events(psx: &mut Psx) {
    while is_event_pending(psx) {
        synchronize(psx);
    }
}

/// Rebase every date on cycle 0 so that `cycle_counter` can't overflow no matter how long the
/// machine runs.
pub fn rebase_counters(psx: &mut Psx) {
    let cc = psx.cycle_counter;

    psx.sync.last_sync -= cc;
    psx.sync.next_event = psx.sync.next_event.saturating_sub(cc);

    psx.cycle_counter = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psx::bios::{Bios, BIOS_SIZE};

    fn new_psx() -> Psx {
        Psx::new(Bios::new(vec![0; BIOS_SIZE]).unwrap())
    }

    #[test]
    fn downcount_decreases_as_cpu_runs() {
        let mut psx = new_psx();

        let dc = downcount(&psx);
        psx.cycle_counter += 100;

        assert_eq!(downcount(&psx), dc - 100);
    }

    #[test]
    fn rebase_preserves_deadlines() {
        let mut psx = new_psx();

        psx.cycle_counter += 1000;
        synchronize(&mut psx);

        let dc = downcount(&psx);

        rebase_counters(&mut psx);

        assert_eq!(psx.cycle_counter, 0);
        assert_eq!(downcount(&psx), dc);
    }
}
