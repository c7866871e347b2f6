//! GPIO sensor bank over `embedded-hal` 1.0 input pins.
//!
//! Each zone's pin number is mapped to one configured input.  Pull-ups and
//! pin ownership are the board bring-up code's job; this bank only reads.
//!
//! The host binary has no GPIO and runs on [`SimulatedSensors`].  On a
//! board, bring-up code builds the HAL's input pins, maps them here by BCM
//! number, and hands the bank to [`Poller::spawn`] in place of the
//! simulated bank:
//!
//! ```text
//! let bank = GpioBank::new().with_pin(17, door).with_pin(27, hall);
//! Poller::spawn(service, bank, PollerConfig::default())?;
//! ```
//!
//! [`SimulatedSensors`]: super::SimulatedSensors
//! [`Poller::spawn`]: crate::poller::Poller::spawn

use embedded_hal::digital::InputPin;
use log::{debug, warn};

use crate::app::ports::SensorPort;

/// A set of input pins addressed by BCM number.
///
/// Unmapped pins and read errors report low.
pub struct GpioBank<P> {
    pins: Vec<(u8, P)>,
}

impl<P: InputPin> GpioBank<P> {
    pub fn new() -> Self {
        Self { pins: Vec::new() }
    }

    /// Map `number` to `pin`, replacing any previous mapping.
    pub fn with_pin(mut self, number: u8, pin: P) -> Self {
        self.insert(number, pin);
        self
    }

    pub fn insert(&mut self, number: u8, pin: P) {
        if let Some(slot) = self.pins.iter_mut().find(|(n, _)| *n == number) {
            warn!("GPIO {} mapped twice, keeping the newer pin", number);
            slot.1 = pin;
        } else {
            self.pins.push((number, pin));
        }
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

impl<P: InputPin> Default for GpioBank<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: InputPin> SensorPort for GpioBank<P> {
    fn read_level(&mut self, pin: u8) -> bool {
        let Some((_, input)) = self.pins.iter_mut().find(|(n, _)| *n == pin) else {
            debug!("GPIO {} not mapped, reading low", pin);
            return false;
        };
        match input.is_high() {
            Ok(high) => high,
            Err(e) => {
                debug!("GPIO {} read failed ({:?}), reading low", pin, e);
                false
            }
        }
    }
}
