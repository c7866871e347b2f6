//! Email alert channel.
//!
//! [`EmailChannel`] composes the notification; a [`MailTransport`] delivers
//! it.  The SMTP transport ([`SmtpMailer`], `smtp` feature) is built on
//! `lettre` and talks plain SMTP with optional credentials.
//!
//! ```text
//!   Zone ──▶ EmailChannel ──▶ OutgoingMail ──▶ MailTransport (SMTP, mock, ...)
//! ```

use serde::{Deserialize, Serialize};

use crate::app::ports::AlertChannel;
use crate::error::ChannelError;
use crate::site::Zone;

/// Subject used when the configured one is empty.
pub const DEFAULT_SUBJECT: &str = "Minder alert";

/// Default SMTP port when none is configured.
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// SMTP settings of one `email` alert entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSettings {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub smtp_server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_port: Option<u16>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subject: String,
}

impl EmailSettings {
    pub fn port(&self) -> u16 {
        self.smtp_port.filter(|p| *p != 0).unwrap_or(DEFAULT_SMTP_PORT)
    }

    pub fn subject(&self) -> &str {
        if self.subject.trim().is_empty() {
            DEFAULT_SUBJECT
        } else {
            &self.subject
        }
    }

    /// `None` unless both username and password are set (unauthenticated
    /// relay).
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            None
        } else {
            Some((self.username.trim(), &self.password))
        }
    }

    /// Names the first missing mandatory field.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.smtp_server.trim().is_empty() {
            Some("smtp_server")
        } else if self.from.trim().is_empty() {
            Some("from")
        } else if self.to.trim().is_empty() {
            Some("to")
        } else {
            None
        }
    }
}

/// A composed plaintext notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery side of the email channel.
pub trait MailTransport: Send + Sync {
    fn deliver(&self, mail: &OutgoingMail) -> Result<(), ChannelError>;
}

pub struct EmailChannel {
    settings: EmailSettings,
    transport: Box<dyn MailTransport>,
}

impl EmailChannel {
    pub fn new(settings: EmailSettings, transport: Box<dyn MailTransport>) -> Self {
        Self {
            settings,
            transport,
        }
    }

    /// Channel delivering over SMTP with `settings`.
    #[cfg(feature = "smtp")]
    pub fn smtp(settings: EmailSettings) -> Self {
        let mailer = SmtpMailer::new(&settings);
        Self::new(settings, Box::new(mailer))
    }

    pub fn compose(&self, zone: &Zone) -> OutgoingMail {
        OutgoingMail {
            from: self.settings.from.clone(),
            to: self.settings.to.clone(),
            subject: self.settings.subject().to_owned(),
            body: format!("Zone {} (ID {}) has been triggered", zone.name, zone.id),
        }
    }
}

impl AlertChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    fn send(&self, zone: &Zone) -> Result<(), ChannelError> {
        if let Some(field) = self.settings.missing_field() {
            return Err(ChannelError::Misconfigured(format!("{} is empty", field)));
        }
        self.transport.deliver(&self.compose(zone))
    }
}

// ───────────────────────────────────────────────────────────────
// SMTP transport (lettre)
// ───────────────────────────────────────────────────────────────

#[cfg(feature = "smtp")]
pub use smtp::SmtpMailer;

#[cfg(feature = "smtp")]
mod smtp {
    use std::time::Duration;

    use lettre::message::header::ContentType;
    use lettre::message::Mailbox;
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{Message, SmtpTransport, Transport};
    use log::debug;

    use super::{EmailSettings, MailTransport, OutgoingMail};
    use crate::error::ChannelError;

    /// Bound on connect + each SMTP command, so a dead relay cannot stall
    /// the dispatcher indefinitely.
    const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

    /// Plain (non-TLS) SMTP submission.
    pub struct SmtpMailer {
        transport: SmtpTransport,
    }

    impl SmtpMailer {
        pub fn new(settings: &EmailSettings) -> Self {
            let mut builder = SmtpTransport::builder_dangerous(settings.smtp_server.trim())
                .port(settings.port())
                .timeout(Some(SMTP_TIMEOUT));
            if let Some((user, pass)) = settings.credentials() {
                builder = builder.credentials(Credentials::new(user.to_owned(), pass.to_owned()));
            }
            Self {
                transport: builder.build(),
            }
        }
    }

    fn mailbox(field: &str, raw: &str) -> Result<Mailbox, ChannelError> {
        raw.trim()
            .parse()
            .map_err(|e| ChannelError::Misconfigured(format!("{} address '{}': {}", field, raw, e)))
    }

    impl MailTransport for SmtpMailer {
        fn deliver(&self, mail: &OutgoingMail) -> Result<(), ChannelError> {
            let message = Message::builder()
                .from(mailbox("from", &mail.from)?)
                .to(mailbox("to", &mail.to)?)
                .subject(mail.subject.as_str())
                .header(ContentType::TEXT_PLAIN)
                .body(mail.body.clone())
                .map_err(|e| ChannelError::Misconfigured(e.to_string()))?;

            match self.transport.send(&message) {
                Ok(response) => {
                    debug!("SMTP accepted alert mail: {:?}", response.code());
                    Ok(())
                }
                Err(e) if e.is_permanent() => Err(ChannelError::Rejected(e.to_string())),
                Err(e) => Err(ChannelError::Transport(e.to_string())),
            }
        }
    }
}
