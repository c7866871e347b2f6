//! Alert channel adapters and their construction from configuration.

pub mod email;
pub mod log;

use std::sync::Arc;

use ::log::{info, warn};

use crate::app::ports::{AlertChannel, AuditSink};
use crate::config::AlertConfig;

use self::log::LogChannel;

/// Build the channel set from the `alerts` configuration, in order.
///
/// Unsupported entries are skipped with a warning.  An empty result is
/// returned as-is; the engine installs its own log channel in that case.
pub fn build_channels(
    configs: &[AlertConfig],
    audit: Arc<dyn AuditSink>,
) -> Vec<Box<dyn AlertChannel>> {
    let mut channels: Vec<Box<dyn AlertChannel>> = Vec::with_capacity(configs.len());
    for config in configs {
        match config {
            AlertConfig::Log => channels.push(Box::new(LogChannel::new(Arc::clone(&audit)))),
            #[cfg(feature = "smtp")]
            AlertConfig::Email(settings) => {
                info!(
                    "Email alerts to {} via {}:{}",
                    settings.to,
                    settings.smtp_server,
                    settings.port()
                );
                channels.push(Box::new(email::EmailChannel::smtp(settings.clone())));
            }
            #[cfg(not(feature = "smtp"))]
            AlertConfig::Email(_) => {
                warn!("Email alert configured but built without the smtp feature, skipping");
            }
            AlertConfig::Unsupported(kind) => {
                warn!("Unknown alert type '{}', skipping", kind);
            }
        }
    }
    channels
}
