//! Zone trigger interpreter.
//!
//! Maps a raw input level and a zone's wiring mode to "activated".
//! Pure: no engine state, no I/O.
//!
//! | Mode  | Activated when | Notes                                   |
//! |-------|----------------|-----------------------------------------|
//! | `NC`  | level low      | loop broken                             |
//! | `NO`  | level high     | contact made                            |
//! | `EOL` | level high     | no tamper band; same as `NO`            |
//! | other | level high     | unrecognised modes fall back to `NO`    |

use core::fmt;

use serde::{Deserialize, Serialize};

/// How a zone's sensor loop is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WiringMode {
    #[default]
    NormallyOpen,
    NormallyClosed,
    EndOfLine,
}

impl WiringMode {
    /// Parse a configured mode string.  Case-insensitive; anything other
    /// than `NO`, `NC` or `EOL` (including the empty string) is `NormallyOpen`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "NC" => Self::NormallyClosed,
            "EOL" => Self::EndOfLine,
            _ => Self::NormallyOpen,
        }
    }

    /// Short code used in configuration files.
    pub const fn code(self) -> &'static str {
        match self {
            Self::NormallyOpen => "NO",
            Self::NormallyClosed => "NC",
            Self::EndOfLine => "EOL",
        }
    }

    /// Whether `raw_level` means this zone is disturbed.
    pub const fn activated(self, raw_level: bool) -> bool {
        match self {
            Self::NormallyClosed => !raw_level,
            // TODO: split EOL into normal/alarm/tamper once the pin driver
            // reports the resistor band instead of a single level.
            Self::NormallyOpen | Self::EndOfLine => raw_level,
        }
    }
}

/// Free-function form of [`WiringMode::activated`].
pub const fn activated(raw_level: bool, mode: WiringMode) -> bool {
    mode.activated(raw_level)
}

impl From<&str> for WiringMode {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for WiringMode {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<WiringMode> for String {
    fn from(mode: WiringMode) -> Self {
        mode.code().to_owned()
    }
}

impl fmt::Display for WiringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
