//! The engine's combined mutable surface.
//!
//! `AlarmCore` bundles the operating state, the trigger latch set and a
//! transition epoch.  The service keeps exactly one of these behind one
//! mutex, so a transition and a poll tick can never interleave into a
//! mixed view.  Nothing in here blocks or does I/O.

use std::collections::BTreeSet;

use super::OperatingState;
use crate::site::ZoneId;

/// State + latches + epoch.  Only mutated through its methods.
#[derive(Debug, Default)]
pub struct AlarmCore {
    state: OperatingState,
    /// Zones already notified since the last transition.
    latches: BTreeSet<ZoneId>,
    /// Bumped on every transition.  A poll tick that started under an older
    /// epoch must not latch anything.
    epoch: u64,
}

impl AlarmCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &OperatingState {
        &self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Replace the state, clear every latch and bump the epoch as one step.
    /// Returns the previous state.
    pub fn transition(&mut self, next: OperatingState) -> OperatingState {
        self.latches.clear();
        self.epoch = self.epoch.wrapping_add(1);
        core::mem::replace(&mut self.state, next)
    }

    /// Set the latch for `zone`.  Returns `false` if it was already set.
    pub fn latch(&mut self, zone: ZoneId) -> bool {
        self.latches.insert(zone)
    }

    pub fn is_latched(&self, zone: ZoneId) -> bool {
        self.latches.contains(&zone)
    }

    /// Latched zone IDs in ascending order.
    pub fn latched(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.latches.iter().copied()
    }

    pub fn latch_count(&self) -> usize {
        self.latches.len()
    }
}
