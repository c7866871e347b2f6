//! Operating-state machine.
//!
//! ```text
//!   ┌──────────┐ ── arm(profile) ─────▶ Armed(profile)
//!   │ Disarmed │ ── arm("Test Soft") ──▶ TestSoft
//!   └──────────┘ ── arm("Test Wiring") ▶ TestWiring
//!        ▲
//!        └──────── disarm() from any state
//! ```
//!
//! Every state is reachable from every other state through `arm` or
//! `disarm`; there is no terminal state.  The transition itself (state
//! value, latch clear, epoch bump) is performed by
//! [`AlarmCore::transition`](context::AlarmCore::transition) so that all
//! three change together under the engine lock.

pub mod context;

use core::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// The engine's single source of truth for what is monitored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(tag = "mode", content = "profile", rename_all = "snake_case")]
pub enum OperatingState {
    #[default]
    Disarmed,
    /// Armed with the named profile (canonical configured spelling).
    Armed(String),
    /// Manual trigger injection, full alert delivery, no sensor reads.
    TestSoft,
    /// Sensor polling on every zone, alert delivery suppressed.
    TestWiring,
}

impl OperatingState {
    /// Whether the poll loop reads sensors in this state.
    pub const fn polls_sensors(&self) -> bool {
        matches!(self, Self::Armed(_) | Self::TestWiring)
    }

    /// Whether a freshly latched zone is handed to the alert channels.
    pub const fn delivers_alerts(&self) -> bool {
        matches!(self, Self::Armed(_) | Self::TestSoft)
    }

    /// Short label: `Disarmed`, the profile name, `TestSoft` or `TestWiring`.
    pub fn label(&self) -> &str {
        match self {
            Self::Disarmed => "Disarmed",
            Self::Armed(profile) => profile,
            Self::TestSoft => "TestSoft",
            Self::TestWiring => "TestWiring",
        }
    }
}

impl fmt::Display for OperatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Armed(profile) => write!(f, "Armed({profile})"),
            other => f.write_str(other.label()),
        }
    }
}

// ---------------------------------------------------------------------------
// Arm request resolution
// ---------------------------------------------------------------------------

/// What an `arm(name)` request asks for, before profile lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArmTarget<'a> {
    TestSoft,
    TestWiring,
    /// A user-defined profile; must still be resolved against configuration.
    Profile(&'a str),
}

impl<'a> ArmTarget<'a> {
    /// Classify a requested mode name.
    ///
    /// The built-in test modes match case- and whitespace-insensitively
    /// ("Test Soft", "testsoft", "TEST  SOFT") and take precedence over any
    /// profile of the same name.
    pub fn parse(requested: &'a str) -> Self {
        let folded: String = requested
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match folded.as_str() {
            "testsoft" => Self::TestSoft,
            "testwiring" => Self::TestWiring,
            _ => Self::Profile(requested.trim()),
        }
    }
}
