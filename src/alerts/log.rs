//! The default alert channel: one line on the audit trail per alert.

use std::sync::Arc;

use crate::app::events::AuditEvent;
use crate::app::ports::{AlertChannel, AuditSink};
use crate::error::ChannelError;
use crate::site::Zone;

/// Writes `alert: zone <id> (<name>) triggered` to the audit sink.
/// Never fails.
pub struct LogChannel {
    audit: Arc<dyn AuditSink>,
}

impl LogChannel {
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self { audit }
    }
}

impl AlertChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&self, zone: &Zone) -> Result<(), ChannelError> {
        self.audit.record(&AuditEvent::alert(zone));
        Ok(())
    }
}
