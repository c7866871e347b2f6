//! Log-based audit sink adapter.
//!
//! Implements [`AuditSink`] by writing every [`AuditEvent`] to the process
//! log.  Used on its own when no audit file is configured and as the
//! console mirror of [`FileAuditLog`](super::audit_file::FileAuditLog).

use log::{info, warn};

use crate::app::events::{AuditEvent, LatchOrigin};
use crate::app::ports::AuditSink;

/// Adapter that logs every [`AuditEvent`] under the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuditSink;

impl LogAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for LogAuditSink {
    fn record(&self, event: &AuditEvent) {
        match event {
            AuditEvent::Latched {
                origin: LatchOrigin::Sensor | LatchOrigin::Manual,
                ..
            }
            | AuditEvent::Alert { .. } => warn!(target: "audit", "{}", event),
            _ if event.is_failure() => warn!(target: "audit", "{}", event),
            _ => info!(target: "audit", "{}", event),
        }
    }
}
