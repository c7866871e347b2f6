//! Simulated sensor bank for hosts without GPIO.
//!
//! Levels live in atomics behind an `Arc`, so the console (or a test) can
//! hold one clone and drive inputs while the poller reads through another.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::app::ports::SensorPort;

/// Number of addressable pins.  Higher pin numbers always read low.
pub const SIM_PIN_COUNT: usize = 64;

#[derive(Clone)]
pub struct SimulatedSensors {
    levels: Arc<[AtomicBool; SIM_PIN_COUNT]>,
}

impl SimulatedSensors {
    /// All pins low.
    pub fn new() -> Self {
        Self {
            levels: Arc::new(core::array::from_fn(|_| AtomicBool::new(false))),
        }
    }

    /// Drive `pin`.  Returns `false` if the pin is out of range.
    pub fn set_level(&self, pin: u8, high: bool) -> bool {
        match self.levels.get(usize::from(pin)) {
            Some(level) => {
                level.store(high, Ordering::Release);
                true
            }
            None => false,
        }
    }

    pub fn level(&self, pin: u8) -> bool {
        self.levels
            .get(usize::from(pin))
            .is_some_and(|l| l.load(Ordering::Acquire))
    }
}

impl Default for SimulatedSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for SimulatedSensors {
    fn read_level(&mut self, pin: u8) -> bool {
        self.level(pin)
    }
}
