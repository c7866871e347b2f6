//! Line-oriented console control surface.
//!
//! Reads [`ControlCommand`]s from any `BufRead`, forwards them to the
//! [`AlarmService`] and writes replies to any `Write`.  The binary wires it
//! to stdin/stdout; tests wire it to in-memory buffers.
//!
//! Site edits (`mode set`, `zone ...`) and `logs` need the config store,
//! attached with [`Console::with_site_admin`].  Edits are persisted
//! through [`JsonConfigStore`], audited, and picked up by the engine on
//! its next site read.

use std::io::{self, BufRead, Write};

use log::debug;

use super::audit_file;
use super::config_file::JsonConfigStore;
use crate::app::commands::{ControlCommand, HELP};
use crate::app::events::AuditEvent;
use crate::app::ports::{AuditSink, ConfigError};
use crate::app::service::{AlarmService, TriggerOutcome};
use crate::app::status::StatusSnapshot;
use crate::sensors::sim::SimulatedSensors;
use crate::site::{ArmProfile, Zone, ZoneId};

/// Whether the session continues after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Config store and audit trail used by the site-editing commands.
struct SiteAdmin<'a> {
    store: &'a JsonConfigStore,
    audit: &'a dyn AuditSink,
}

pub struct Console<'a> {
    service: &'a AlarmService,
    /// Present when the poller reads simulated inputs.
    sim: Option<SimulatedSensors>,
    admin: Option<SiteAdmin<'a>>,
}

impl<'a> Console<'a> {
    pub fn new(service: &'a AlarmService, sim: Option<SimulatedSensors>) -> Self {
        Self {
            service,
            sim,
            admin: None,
        }
    }

    /// Enable site edits and `logs` against `store`, auditing to `audit`.
    pub fn with_site_admin(mut self, store: &'a JsonConfigStore, audit: &'a dyn AuditSink) -> Self {
        self.admin = Some(SiteAdmin { store, audit });
        self
    }

    /// Serve commands until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&self, input: R, mut output: W) -> io::Result<()> {
        writeln!(output, "minder ready, mode {} (type 'help')", self.service.state())?;
        output.flush()?;
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if self.handle_line(&line, &mut output)? == Flow::Quit {
                break;
            }
            output.flush()?;
        }
        Ok(())
    }

    /// Parse and execute one line.
    pub fn handle_line<W: Write>(&self, line: &str, out: &mut W) -> io::Result<Flow> {
        let command = match line.parse::<ControlCommand>() {
            Ok(command) => command,
            Err(e) => {
                writeln!(out, "error: {}", e)?;
                return Ok(Flow::Continue);
            }
        };
        debug!("Console command: {:?}", command);

        match command {
            ControlCommand::Arm(name) => match self.service.arm(&name) {
                Ok(state) => writeln!(out, "ok: {}", state)?,
                Err(e) => writeln!(out, "error: {}", e)?,
            },
            ControlCommand::Disarm => {
                self.service.disarm();
                writeln!(out, "ok: Disarmed")?;
            }
            ControlCommand::Trigger(zone) => match self.service.trigger_manually(zone) {
                Ok(TriggerOutcome::Dispatched(report)) => {
                    write!(out, "ok: zone {} triggered", zone)?;
                    if !report.delivered.is_empty() {
                        write!(out, ", delivered via {}", report.delivered.join(", "))?;
                    }
                    writeln!(out)?;
                    for failure in &report.failed {
                        writeln!(out, "warning: {}", failure)?;
                    }
                }
                Ok(TriggerOutcome::AlreadyLatched) => {
                    writeln!(out, "ok: zone {} already triggered", zone)?;
                }
                Ok(TriggerOutcome::ZoneDisabled) => {
                    writeln!(out, "ok: zone {} is disabled, ignored", zone)?;
                }
                Err(e) => writeln!(out, "error: {}", e)?,
            },
            ControlCommand::Status { json } => {
                let snapshot = self.service.snapshot();
                if json {
                    let text = serde_json::to_string_pretty(&snapshot).map_err(io::Error::other)?;
                    writeln!(out, "{}", text)?;
                } else {
                    write_status(out, &snapshot)?;
                }
            }
            ControlCommand::Level { pin, high } => match &self.sim {
                Some(sim) if sim.set_level(pin, high) => {
                    writeln!(out, "ok: pin {} {}", pin, if high { "high" } else { "low" })?;
                }
                Some(_) => writeln!(out, "error: pin {} out of range", pin)?,
                None => writeln!(out, "error: inputs are not simulated")?,
            },
            ControlCommand::Modes
            | ControlCommand::ModeSet { .. }
            | ControlCommand::ZoneAdd { .. }
            | ControlCommand::ZoneDelete(_)
            | ControlCommand::ZoneEnable { .. }
            | ControlCommand::Logs { .. } => match &self.admin {
                Some(admin) => admin.handle(command, out)?,
                None => writeln!(out, "error: site editing is not available")?,
            },
            ControlCommand::Help => writeln!(out, "{}", HELP)?,
            ControlCommand::Quit => {
                writeln!(out, "bye")?;
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }
}

impl SiteAdmin<'_> {
    fn handle<W: Write>(&self, command: ControlCommand, out: &mut W) -> io::Result<()> {
        let outcome = match command {
            ControlCommand::Modes => {
                let config = self.store.config();
                if config.arm_modes.is_empty() {
                    writeln!(out, "no arm modes configured")?;
                }
                for profile in &config.arm_modes {
                    writeln!(out, "  {:<16} zones {}", profile.name, join_ids(&profile.active_zones))?;
                }
                return Ok(());
            }
            ControlCommand::Logs { lines } => {
                let path = self.store.config().log_file.clone();
                match audit_file::tail(&path, lines) {
                    Ok(entries) if entries.is_empty() => writeln!(out, "audit log is empty")?,
                    Ok(entries) => {
                        for entry in entries {
                            writeln!(out, "{}", entry)?;
                        }
                    }
                    Err(e) => writeln!(out, "error: audit log {}: {}", path, e)?,
                }
                return Ok(());
            }
            ControlCommand::ModeSet { name, zones } => {
                let ids = join_ids(&zones);
                let profile = ArmProfile::new(name.clone(), zones);
                self.store
                    .try_update(|c| Ok(c.upsert_arm_mode(profile)))
                    .map(|replaced| {
                        let verb = if replaced { "updated" } else { "created" };
                        (
                            format!("arm mode {} {} (zones {})", name, verb, ids),
                            format!("update arm mode {}", name),
                        )
                    })
            }
            ControlCommand::ZoneAdd {
                pin,
                mode,
                kind,
                name,
            } => {
                let zone = Zone::new(0, name.clone(), pin, mode).with_kind(kind);
                self.store.try_update(|c| Ok(c.add_zone(zone))).map(|id| {
                    (
                        format!("zone {} added", id),
                        format!("create zone {} (id={})", name, id),
                    )
                })
            }
            ControlCommand::ZoneDelete(id) => self
                .store
                .try_update(|c| c.remove_zone(id).ok_or_else(|| unknown_zone(id)))
                .map(|_| (format!("zone {} deleted", id), format!("delete zone id={}", id))),
            ControlCommand::ZoneEnable { id, enabled } => {
                let verb = if enabled { "enabled" } else { "disabled" };
                self.store
                    .try_update(|c| {
                        let zone = c.zone_mut(id).ok_or_else(|| unknown_zone(id))?;
                        zone.enabled = enabled;
                        Ok(())
                    })
                    .map(|()| {
                        (
                            format!("zone {} {}", id, verb),
                            format!("{} zone id={}", if enabled { "enable" } else { "disable" }, id),
                        )
                    })
            }
            _ => return Ok(()),
        };

        match outcome {
            Ok((reply, change)) => {
                self.audit.record(&AuditEvent::ConfigChanged { change });
                writeln!(out, "ok: {}", reply)
            }
            Err(e) => writeln!(out, "error: {}", e),
        }
    }
}

fn unknown_zone(id: ZoneId) -> ConfigError {
    ConfigError::UnknownEntry(format!("zone {}", id))
}

fn join_ids(ids: &[ZoneId]) -> String {
    if ids.is_empty() {
        return "none".to_owned();
    }
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn write_status<W: Write>(out: &mut W, snapshot: &StatusSnapshot) -> io::Result<()> {
    writeln!(out, "mode: {}", snapshot.state)?;
    if snapshot.zones.is_empty() {
        writeln!(out, "no zones configured")?;
    }
    for zone in &snapshot.zones {
        writeln!(
            out,
            "  zone {:>3}  {:<20} {:<8} pin {:>2}  {}{}",
            zone.id,
            zone.name,
            zone.kind,
            zone.pin,
            if zone.enabled { "enabled" } else { "disabled" },
            if zone.latched { "  TRIGGERED" } else { "" },
        )?;
    }
    Ok(())
}
