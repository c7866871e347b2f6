//! Sensor inputs: wiring-mode interpretation and the banks that implement
//! [`SensorPort`](crate::app::ports::SensorPort).
//!
//! ```text
//!   GpioBank (embedded-hal InputPin)  ─┐
//!                                      ├─▶ SensorPort ─▶ wiring::activated ─▶ engine
//!   SimulatedSensors (atomics)        ─┘
//! ```

pub mod gpio;
pub mod sim;
pub mod wiring;

pub use gpio::GpioBank;
pub use sim::SimulatedSensors;
pub use wiring::WiringMode;
