//! Port traits: the hexagonal boundary between the alarm engine and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AlarmService (domain)
//! ```
//!
//! Driven adapters (sensor banks, alert channels, audit sinks, config
//! stores) implement these traits.  The [`AlarmService`](super::service::AlarmService)
//! consumes them as trait objects or generics, so the engine never touches
//! GPIO, SMTP or the filesystem directly.

use std::sync::Arc;

use crate::error::ChannelError;
use crate::site::{Site, Zone};

use super::events::AuditEvent;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: raw input levels by pin.
///
/// Reads are expected to be fast and non-blocking.  There is no error
/// channel; an unreadable pin must report a stable default (low).
pub trait SensorPort {
    /// `true` = high.
    fn read_level(&mut self, pin: u8) -> bool;
}

impl<S: SensorPort + ?Sized> SensorPort for &mut S {
    fn read_level(&mut self, pin: u8) -> bool {
        (**self).read_level(pin)
    }
}

// ───────────────────────────────────────────────────────────────
// Alert channel port (driven adapter: domain → notification)
// ───────────────────────────────────────────────────────────────

/// A pluggable notification sink invoked once per latched zone.
///
/// Implementations own their own retry policy, if any.  The engine calls
/// `send` exactly once per dispatch and records failures without retrying.
pub trait AlertChannel: Send + Sync {
    /// Stable channel name used in audit records (`"log"`, `"email"`, ...).
    fn name(&self) -> &str;

    /// Deliver a notification for `zone`.
    fn send(&self, zone: &Zone) -> Result<(), ChannelError>;
}

// ───────────────────────────────────────────────────────────────
// Audit sink port (driven adapter: domain → audit trail)
// ───────────────────────────────────────────────────────────────

/// Append-only, timestamped event recorder.
///
/// Called for every transition, every latch and every channel failure,
/// sometimes while the engine lock is held.  Implementations must not
/// block for long and must never call back into the engine.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn record(&self, event: &AuditEvent) {
        (**self).record(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration provider (driven adapter: config store → domain)
// ───────────────────────────────────────────────────────────────

/// Read-only, point-in-time access to zones and arm profiles.
///
/// The engine calls this on every tick and every control request, so
/// edits made through the control surface take effect on the next read.
pub trait ConfigProvider: Send + Sync {
    fn site(&self) -> Arc<Site>;
}

/// A fixed site, for tests and embedded builds without a config store.
#[derive(Debug, Clone, Default)]
pub struct StaticSite(Arc<Site>);

impl StaticSite {
    pub fn new(site: Site) -> Self {
        Self(Arc::new(site))
    }
}

impl ConfigProvider for StaticSite {
    fn site(&self) -> Arc<Site> {
        Arc::clone(&self.0)
    }
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from configuration loading and persistence.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found at the given location.
    NotFound,
    /// Stored config failed to parse.
    Corrupted(String),
    /// A config field failed validation.  The string names the field and why.
    ValidationFailed(String),
    /// An edit named a zone or profile that does not exist.
    UnknownEntry(String),
    /// Filesystem error from the storage backend.
    Io(std::io::Error),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted(msg) => write!(f, "config corrupted: {}", msg),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::UnknownEntry(what) => write!(f, "{} not found", what),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}
