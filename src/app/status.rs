//! Read-only status snapshot handed to the control surface.

use serde::Serialize;

use crate::fsm::OperatingState;
use crate::site::{SensorKind, ZoneId};

/// Operating state plus per-zone latch flags, captured under one lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub state: OperatingState,
    /// Every latched zone ID, ascending.
    pub triggered: Vec<ZoneId>,
    /// Every configured zone, in configuration order.
    pub zones: Vec<ZoneStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneStatus {
    pub id: ZoneId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SensorKind,
    pub pin: u8,
    pub enabled: bool,
    pub latched: bool,
}

impl StatusSnapshot {
    pub fn is_latched(&self, zone: ZoneId) -> bool {
        self.triggered.binary_search(&zone).is_ok()
    }

    pub fn zone(&self, zone: ZoneId) -> Option<&ZoneStatus> {
        self.zones.iter().find(|z| z.id == zone)
    }
}
