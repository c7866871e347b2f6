//! Inbound commands to the alarm service.
//!
//! These represent actions requested by the outside world (the console
//! today) that the control surface interprets and forwards to the
//! [`AlarmService`](super::service::AlarmService).

use core::fmt;
use core::str::FromStr;

use crate::sensors::wiring::WiringMode;
use crate::site::{SensorKind, ZoneId};

/// Audit lines shown by `logs` without a count.
pub const DEFAULT_LOG_LINES: usize = 200;

/// One parsed control-surface line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Arm with a profile name or enter a test mode.  The argument is
    /// passed through untouched; the engine resolves it.
    Arm(String),

    /// Return to `Disarmed`.
    Disarm,

    /// Manual trigger (TestSoft only).
    Trigger(ZoneId),

    /// Print the status snapshot, as JSON when `json` is set.
    Status { json: bool },

    /// Drive a simulated input pin.
    Level { pin: u8, high: bool },

    /// List the configured arm profiles.
    Modes,

    /// Create or replace an arm profile (matched case-insensitively).
    ModeSet { name: String, zones: Vec<ZoneId> },

    /// Add a zone; the store assigns the ID.
    ZoneAdd {
        pin: u8,
        mode: WiringMode,
        kind: SensorKind,
        name: String,
    },

    ZoneDelete(ZoneId),

    ZoneEnable { id: ZoneId, enabled: bool },

    /// Print the newest audit log lines.
    Logs { lines: usize },

    Help,
    Quit,
}

/// A line that is not a valid [`ControlCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    Empty,
    UnknownVerb(String),
    MissingArgument(&'static str),
    BadArgument { what: &'static str, value: String },
}

impl fmt::Display for CommandParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::UnknownVerb(v) => write!(f, "unknown command '{}', try 'help'", v),
            Self::MissingArgument(what) => write!(f, "missing {}", what),
            Self::BadArgument { what, value } => write!(f, "invalid {} '{}'", what, value),
        }
    }
}

impl std::error::Error for CommandParseError {}

impl FromStr for ControlCommand {
    type Err = CommandParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        if verb.is_empty() {
            return Err(CommandParseError::Empty);
        }

        match verb.to_ascii_lowercase().as_str() {
            "arm" => {
                if rest.is_empty() {
                    Err(CommandParseError::MissingArgument("profile name"))
                } else {
                    Ok(Self::Arm(rest.to_owned()))
                }
            }
            "disarm" => Ok(Self::Disarm),
            "trigger" => {
                let id = required(rest, "zone id")?;
                id.parse()
                    .map(Self::Trigger)
                    .map_err(|_| bad("zone id", id))
            }
            "status" => match rest.to_ascii_lowercase().as_str() {
                "" => Ok(Self::Status { json: false }),
                "json" => Ok(Self::Status { json: true }),
                _ => Err(bad("status format", rest)),
            },
            "level" => {
                let mut args = rest.split_whitespace();
                let pin = required(args.next().unwrap_or(""), "pin")?;
                let pin = pin.parse().map_err(|_| bad("pin", pin))?;
                let level = required(args.next().unwrap_or(""), "level")?;
                let high = match level.to_ascii_lowercase().as_str() {
                    "1" | "high" | "on" => true,
                    "0" | "low" | "off" => false,
                    _ => return Err(bad("level", level)),
                };
                Ok(Self::Level { pin, high })
            }
            "modes" => Ok(Self::Modes),
            "mode" => parse_mode(rest),
            "zone" => parse_zone(rest),
            "logs" => {
                if rest.is_empty() {
                    return Ok(Self::Logs { lines: DEFAULT_LOG_LINES });
                }
                match rest.parse::<usize>() {
                    Ok(lines) if lines > 0 => Ok(Self::Logs { lines }),
                    _ => Err(bad("line count", rest)),
                }
            }
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandParseError::UnknownVerb(other.to_owned())),
        }
    }
}

/// `mode list` | `mode set <name> [ids...]`
fn parse_mode(rest: &str) -> Result<ControlCommand, CommandParseError> {
    let (sub, rest) = next_word(rest);
    match sub.to_ascii_lowercase().as_str() {
        "" => Err(CommandParseError::MissingArgument("mode action")),
        "list" => Ok(ControlCommand::Modes),
        "set" => {
            let (name, ids) = next_word(rest);
            let name = required(name, "profile name")?;
            let zones = ids
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty())
                .map(|t| t.parse().map_err(|_| bad("zone id", t)))
                .collect::<Result<Vec<ZoneId>, _>>()?;
            Ok(ControlCommand::ModeSet {
                name: name.to_owned(),
                zones,
            })
        }
        _ => Err(bad("mode action", sub)),
    }
}

/// `zone add <pin> <no|nc|eol> <contact|motion> <name...>`
/// | `zone del|enable|disable <id>`
fn parse_zone(rest: &str) -> Result<ControlCommand, CommandParseError> {
    let (sub, rest) = next_word(rest);
    let sub = sub.to_ascii_lowercase();
    match sub.as_str() {
        "" => Err(CommandParseError::MissingArgument("zone action")),
        "add" => {
            let (pin, rest) = next_word(rest);
            let pin = required(pin, "pin")?;
            let pin = pin.parse().map_err(|_| bad("pin", pin))?;

            let (mode, rest) = next_word(rest);
            let mode = match required(mode, "wiring mode")?.to_ascii_uppercase().as_str() {
                "NO" => WiringMode::NormallyOpen,
                "NC" => WiringMode::NormallyClosed,
                "EOL" => WiringMode::EndOfLine,
                _ => return Err(bad("wiring mode", mode)),
            };

            let (kind, name) = next_word(rest);
            let kind = match required(kind, "sensor type")?.to_ascii_lowercase().as_str() {
                "contact" => SensorKind::Contact,
                "motion" | "pir" => SensorKind::Motion,
                _ => return Err(bad("sensor type", kind)),
            };

            let name = required(name, "zone name")?;
            Ok(ControlCommand::ZoneAdd {
                pin,
                mode,
                kind,
                name: name.to_owned(),
            })
        }
        "del" | "delete" | "rm" | "enable" | "disable" => {
            let id = required(rest, "zone id")?;
            let id = id.parse().map_err(|_| bad("zone id", id))?;
            Ok(match sub.as_str() {
                "enable" => ControlCommand::ZoneEnable { id, enabled: true },
                "disable" => ControlCommand::ZoneEnable { id, enabled: false },
                _ => ControlCommand::ZoneDelete(id),
            })
        }
        _ => Err(bad("zone action", &sub)),
    }
}

/// First whitespace-separated word and the trimmed remainder.
fn next_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (s, ""),
    }
}

fn required<'a>(arg: &'a str, what: &'static str) -> Result<&'a str, CommandParseError> {
    if arg.is_empty() {
        Err(CommandParseError::MissingArgument(what))
    } else {
        Ok(arg)
    }
}

fn bad(what: &'static str, value: &str) -> CommandParseError {
    CommandParseError::BadArgument {
        what,
        value: value.to_owned(),
    }
}

/// Help text listed by the console.
pub const HELP: &str = "\
commands:
  arm <profile|testsoft|testwiring>   arm or enter a test mode
  disarm                              return to Disarmed
  trigger <zone id>                   manual trigger (TestSoft only)
  status [json]                       show mode, zones and latches
  level <pin> <high|low>              drive a simulated input
  modes                               list arm profiles
  mode set <name> [ids...]            create or replace an arm profile
  zone add <pin> <no|nc|eol> <contact|motion> <name>
                                      add a zone
  zone del|enable|disable <id>        remove or toggle a zone
  logs [n]                            last n audit lines (default 200)
  help                                this text
  quit                                stop the engine and exit";
