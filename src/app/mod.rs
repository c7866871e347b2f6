//! Application core: the alarm engine and its boundary.
//!
//! This module contains the engine's rules: arm/disarm transitions, the
//! trigger latch, per-tick polling and alert dispatch.  All interaction
//! with sensors, channels, storage and the audit trail happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod status;
