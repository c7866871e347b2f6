//! Outbound audit events.
//!
//! The [`AlarmService`](super::service::AlarmService) records these through
//! the [`AuditSink`](super::ports::AuditSink) port.  Adapters on the other
//! side decide where they go: the process log, an append-only file, a test
//! recorder.

use core::fmt;

use crate::fsm::OperatingState;
use crate::site::{Zone, ZoneId};

/// Why a zone was latched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchOrigin {
    /// Sensor activation while armed; channels are notified.
    Sensor,
    /// Manual injection in `TestSoft`; channels are notified.
    Manual,
    /// Sensor activation in `TestWiring`; audit only.
    WiringTest,
}

/// Structured events recorded by the engine and its channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    /// The operating state changed (latches were cleared).
    Transition { from: OperatingState, to: OperatingState },

    /// A zone was latched for the first time since the last transition.
    Latched {
        zone_id: ZoneId,
        zone_name: String,
        origin: LatchOrigin,
    },

    /// The log channel's notification.
    Alert { zone_id: ZoneId, zone_name: String },

    /// One alert channel failed for one zone.  Dispatch continued.
    ChannelFailure {
        channel: String,
        zone_id: ZoneId,
        cause: String,
    },

    /// The site configuration was edited from the control surface.
    ConfigChanged { change: String },
}

impl AuditEvent {
    pub fn latched(zone: &Zone, origin: LatchOrigin) -> Self {
        Self::Latched {
            zone_id: zone.id,
            zone_name: zone.name.clone(),
            origin,
        }
    }

    pub fn alert(zone: &Zone) -> Self {
        Self::Alert {
            zone_id: zone.id,
            zone_name: zone.name.clone(),
        }
    }

    pub fn channel_failure(channel: &str, zone: &Zone, cause: impl Into<String>) -> Self {
        Self::ChannelFailure {
            channel: channel.to_owned(),
            zone_id: zone.id,
            cause: cause.into(),
        }
    }

    /// True for events that report something going wrong.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::ChannelFailure { .. })
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transition { from, to } => match to {
                OperatingState::Disarmed => write!(f, "disarm (was {})", from),
                other => write!(f, "arm {} (was {})", other.label(), from),
            },
            Self::Latched { zone_id, zone_name, origin } => match origin {
                LatchOrigin::Sensor => write!(f, "trigger zone id={} ({})", zone_id, zone_name),
                LatchOrigin::Manual => write!(f, "test trigger zone id={} ({})", zone_id, zone_name),
                LatchOrigin::WiringTest => {
                    write!(f, "wiring test trigger zone id={} ({})", zone_id, zone_name)
                }
            },
            Self::Alert { zone_id, zone_name } => {
                write!(f, "alert: zone {} ({}) triggered", zone_id, zone_name)
            }
            Self::ChannelFailure { channel, zone_id, cause } => {
                write!(f, "alert handler {} error for zone {}: {}", channel, zone_id, cause)
            }
            Self::ConfigChanged { change } => f.write_str(change),
        }
    }
}
