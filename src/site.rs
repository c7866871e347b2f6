//! Site model: zones and arm profiles.
//!
//! These are owned by the configuration layer.  The engine reads them
//! through [`ConfigProvider`](crate::app::ports::ConfigProvider) and never
//! mutates them.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::fsm::OperatingState;
use crate::sensors::wiring::WiringMode;

/// Stable numeric zone identifier.
pub type ZoneId = u32;

/// Physical sensor type wired to a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// Magnetic door/window contact.
    #[default]
    Contact,
    /// Passive-infrared motion detector.
    #[serde(alias = "pir")]
    Motion,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contact => f.pad("contact"),
            Self::Motion => f.pad("motion"),
        }
    }
}

/// A monitored sensor input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: SensorKind,
    /// GPIO pin, BCM numbering.
    pub pin: u8,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub mode: WiringMode,
}

fn default_enabled() -> bool {
    true
}

impl Zone {
    pub fn new(id: ZoneId, name: impl Into<String>, pin: u8, mode: WiringMode) -> Self {
        Self {
            id,
            name: name.into(),
            kind: SensorKind::Contact,
            pin,
            enabled: true,
            mode,
        }
    }

    pub fn with_kind(mut self, kind: SensorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A named set of zones monitored when that profile is armed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmProfile {
    pub name: String,
    #[serde(default)]
    pub active_zones: Vec<ZoneId>,
}

impl ArmProfile {
    pub fn new(name: impl Into<String>, active_zones: Vec<ZoneId>) -> Self {
        Self {
            name: name.into(),
            active_zones,
        }
    }
}

/// Point-in-time view of every zone and profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Site {
    pub zones: Vec<Zone>,
    pub profiles: Vec<ArmProfile>,
}

impl Site {
    pub fn new(zones: Vec<Zone>, profiles: Vec<ArmProfile>) -> Self {
        Self { zones, profiles }
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    /// Case-insensitive profile lookup.
    pub fn profile(&self, name: &str) -> Option<&ArmProfile> {
        let name = name.trim();
        self.profiles.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Zones the poll loop samples in `state`, in profile order.
    ///
    /// Disabled zones and IDs with no configured zone are skipped.
    /// `Disarmed` and `TestSoft` never sample sensors.
    pub fn active_zones(&self, state: &OperatingState) -> Vec<&Zone> {
        match state {
            OperatingState::Disarmed | OperatingState::TestSoft => Vec::new(),
            OperatingState::TestWiring => self.zones.iter().filter(|z| z.enabled).collect(),
            OperatingState::Armed(profile) => {
                let Some(profile) = self.profile(profile) else {
                    log::debug!("armed profile '{}' no longer configured", profile);
                    return Vec::new();
                };
                let mut zones: Vec<&Zone> = Vec::with_capacity(profile.active_zones.len());
                for id in &profile.active_zones {
                    match self.zone(*id) {
                        Some(z) if z.enabled => {
                            if !zones.iter().any(|seen| seen.id == z.id) {
                                zones.push(z);
                            }
                        }
                        Some(_) => {}
                        None => log::debug!("profile '{}' references unknown zone {}", profile.name, id),
                    }
                }
                zones
            }
        }
    }
}
