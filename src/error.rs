//! Unified error types for the alarm engine.
//!
//! Control-surface errors ([`AlarmError`]) are returned synchronously and
//! never mutate engine state.  Channel errors ([`ChannelError`]) never reach
//! a caller of `arm` / `disarm` / `trigger_manually`; the dispatcher records
//! them to the audit sink and moves on to the next channel.

use core::fmt;

use crate::site::ZoneId;

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

/// Errors surfaced by the engine's control entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmError {
    /// `arm` named neither a configured profile nor a built-in test mode.
    UnknownProfile(String),
    /// A manual trigger was attempted outside `TestSoft`.
    NotInTestSoftMode,
    /// A manual trigger referenced a zone ID absent from configuration.
    UnknownZone(ZoneId),
    /// A specific alert channel failed to deliver.  Recorded, never returned
    /// from a control call.
    ChannelDeliveryFailure { channel: String, cause: String },
}

impl fmt::Display for AlarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProfile(name) => write!(f, "unknown arm mode: {name}"),
            Self::NotInTestSoftMode => write!(f, "not in TestSoft mode"),
            Self::UnknownZone(id) => write!(f, "zone {id} not found"),
            Self::ChannelDeliveryFailure { channel, cause } => {
                write!(f, "alert channel {channel} failed: {cause}")
            }
        }
    }
}

impl std::error::Error for AlarmError {}

// ---------------------------------------------------------------------------
// Channel errors
// ---------------------------------------------------------------------------

/// Failure reported by an [`AlertChannel`](crate::app::ports::AlertChannel).
///
/// Every variant carries a human-readable cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel's settings cannot produce a deliverable message
    /// (e.g. an unparseable recipient address).
    Misconfigured(String),
    /// The transport could not be reached or dropped the connection.
    Transport(String),
    /// The remote end refused the notification.
    Rejected(String),
}

impl ChannelError {
    /// The human-readable cause, without the category prefix.
    pub fn cause(&self) -> &str {
        match self {
            Self::Misconfigured(c) | Self::Transport(c) | Self::Rejected(c) => c,
        }
    }

    /// Wrap this failure as the engine-level error for `channel`.
    pub fn into_alarm_error(self, channel: &str) -> AlarmError {
        AlarmError::ChannelDeliveryFailure {
            channel: channel.to_owned(),
            cause: self.to_string(),
        }
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Misconfigured(c) => write!(f, "misconfigured: {c}"),
            Self::Transport(c) => write!(f, "transport: {c}"),
            Self::Rejected(c) => write!(f, "rejected: {c}"),
        }
    }
}

impl std::error::Error for ChannelError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Engine-wide `Result` alias.
pub type Result<T> = core::result::Result<T, AlarmError>;
