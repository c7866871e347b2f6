//! Minder alarm engine library.
//!
//! Zones, arm profiles, the arm/disarm state machine, edge-triggered
//! latching, per-tick polling and pluggable alert channels.  Everything
//! outside the engine is reached through the port traits in
//! [`app::ports`], so the library runs against GPIO, simulated inputs or
//! test mocks alike.

#![deny(unused_must_use)]

pub mod adapters;
pub mod alerts;
pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod poller;
pub mod sensors;
pub mod site;

pub use app::service::AlarmService;
pub use error::{AlarmError, ChannelError};
