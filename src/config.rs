//! System configuration.
//!
//! Everything persisted in `config.json`: poll timing, audit log path, the
//! site (zones and arm profiles) and the alert channel list.  Loaded and
//! saved by [`JsonConfigStore`](crate::adapters::config_file::JsonConfigStore).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::alerts::email::EmailSettings;
use crate::app::ports::ConfigError;
use crate::site::{ArmProfile, Site, Zone, ZoneId};

/// Default sensor sampling period.
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 200;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Sensor sampling period (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u32,

    /// Append-only audit trail
    #[serde(default = "default_log_file")]
    pub log_file: String,

    #[serde(default)]
    pub zones: Vec<Zone>,

    /// Arm profiles
    #[serde(default)]
    pub arm_modes: Vec<ArmProfile>,

    #[serde(default)]
    pub alerts: Vec<AlertConfig>,
}

fn default_poll_interval_ms() -> u32 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_log_file() -> String {
    "events.log".to_owned()
}

impl Default for SystemConfig {
    /// First-boot configuration: no zones, empty `Away` and `Home`
    /// profiles, one log alert.
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            log_file: default_log_file(),
            zones: Vec::new(),
            arm_modes: vec![
                ArmProfile::new("Away", Vec::new()),
                ArmProfile::new("Home", Vec::new()),
            ],
            alerts: vec![AlertConfig::Log],
        }
    }
}

impl SystemConfig {
    /// The engine-facing part of the configuration.
    pub fn site(&self) -> Site {
        Site::new(self.zones.clone(), self.arm_modes.clone())
    }

    /// Replace the profile with the same name (case-insensitive) or append
    /// it.  Returns `true` when an existing profile was replaced.
    pub fn upsert_arm_mode(&mut self, profile: ArmProfile) -> bool {
        match self
            .arm_modes
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(&profile.name))
        {
            Some(existing) => {
                *existing = profile;
                true
            }
            None => {
                self.arm_modes.push(profile);
                false
            }
        }
    }

    /// Append `zone` under the next free ID (one above the highest) and
    /// return that ID.
    pub fn add_zone(&mut self, mut zone: Zone) -> ZoneId {
        zone.id = self.zones.iter().map(|z| z.id).max().map_or(1, |max| max + 1);
        let id = zone.id;
        self.zones.push(zone);
        id
    }

    /// Remove zone `id`.  Profiles keep referring to it; unknown IDs are
    /// skipped at poll time.
    pub fn remove_zone(&mut self, id: ZoneId) -> Option<Zone> {
        let idx = self.zones.iter().position(|z| z.id == id)?;
        Some(self.zones.remove(idx))
    }

    pub fn zone_mut(&mut self, id: ZoneId) -> Option<&mut Zone> {
        self.zones.iter_mut().find(|z| z.id == id)
    }
}

/// Check a config before it is persisted or applied.
pub fn validate(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if !(10..=10_000).contains(&cfg.poll_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "poll_interval_ms must be 10–10000".into(),
        ));
    }

    let mut seen = BTreeSet::new();
    for zone in &cfg.zones {
        if !seen.insert(zone.id) {
            return Err(ConfigError::ValidationFailed(format!(
                "duplicate zone id {}",
                zone.id
            )));
        }
    }

    for profile in &cfg.arm_modes {
        if profile.name.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "arm mode name must not be empty".into(),
            ));
        }
    }

    for (idx, alert) in cfg.alerts.iter().enumerate() {
        if let AlertConfig::Email(settings) = alert {
            if let Some(field) = settings.missing_field() {
                return Err(ConfigError::ValidationFailed(format!(
                    "alerts[{}]: email {} is required",
                    idx, field
                )));
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Alert entries
// ---------------------------------------------------------------------------

/// One entry of the `alerts` list, selected by its `type` field
/// (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AlertEntry", into = "AlertEntry")]
pub enum AlertConfig {
    Log,
    Email(EmailSettings),
    /// A `type` this build does not know.  Kept so a save does not drop it;
    /// skipped when channels are built.
    Unsupported(String),
}

/// Flat on-disk form: `type` plus the SMTP fields, all optional.
#[derive(Serialize, Deserialize)]
struct AlertEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    email: EmailSettings,
}

impl From<AlertEntry> for AlertConfig {
    fn from(entry: AlertEntry) -> Self {
        match entry.kind.trim().to_ascii_lowercase().as_str() {
            "log" => Self::Log,
            "email" => Self::Email(entry.email),
            _ => Self::Unsupported(entry.kind),
        }
    }
}

impl From<AlertConfig> for AlertEntry {
    fn from(config: AlertConfig) -> Self {
        match config {
            AlertConfig::Log => Self {
                kind: "log".into(),
                email: EmailSettings::default(),
            },
            AlertConfig::Email(email) => Self {
                kind: "email".into(),
                email,
            },
            AlertConfig::Unsupported(kind) => Self {
                kind,
                email: EmailSettings::default(),
            },
        }
    }
}
