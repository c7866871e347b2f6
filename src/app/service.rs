//! Alarm service, the hexagonal core.
//!
//! [`AlarmService`] owns the operating state and the trigger latch set and
//! exposes the control-surface entry points (`arm`, `disarm`,
//! `trigger_manually`, `snapshot`) plus the per-tick poll step.  All I/O
//! flows through port traits, so the whole service runs against mocks.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────┐ ──▶ AlertChannel × N
//!                 │       AlarmService        │
//! ConfigProvider ▶│  state · latches · epoch  │ ──▶ AuditSink
//!                 └──────────────────────────┘
//! ```
//!
//! ## Locking
//!
//! `{state, latches, epoch}` sit behind one mutex.  It is held only while
//! reading or mutating that value (and recording the matching audit
//! event), never across a sensor read or an alert channel.  A poll tick
//! snapshots the state, reads sensors unlocked, then re-locks and latches
//! only if no transition happened in between.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};

use crate::alerts::log::LogChannel;
use crate::error::{AlarmError, ChannelError, Result};
use crate::fsm::context::AlarmCore;
use crate::fsm::{ArmTarget, OperatingState};
use crate::sensors::wiring::activated;
use crate::site::{Zone, ZoneId};

use super::events::{AuditEvent, LatchOrigin};
use super::ports::{AlertChannel, AuditSink, ConfigProvider, SensorPort};
use super::status::{StatusSnapshot, ZoneStatus};

// ───────────────────────────────────────────────────────────────
// Outcomes
// ───────────────────────────────────────────────────────────────

/// Per-zone result of one dispatch pass over every channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub zone_id: ZoneId,
    /// Channels that accepted the notification, in invocation order.
    pub delivered: Vec<String>,
    /// One `ChannelDeliveryFailure` per failed channel, in invocation order.
    pub failed: Vec<AlarmError>,
}

impl DispatchReport {
    fn new(zone_id: ZoneId) -> Self {
        Self {
            zone_id,
            delivered: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of a successful `trigger_manually` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Newly latched; channels were invoked.
    Dispatched(DispatchReport),
    /// Already latched in this session; nothing happened.
    AlreadyLatched,
    /// The zone is disabled and is never latched.
    ZoneDisabled,
}

// ───────────────────────────────────────────────────────────────
// AlarmService
// ───────────────────────────────────────────────────────────────

/// The alarm engine.  Share it as `Arc<AlarmService>` between the poller
/// and any number of control-surface callers.
pub struct AlarmService {
    core: Mutex<AlarmCore>,
    config: Arc<dyn ConfigProvider>,
    /// Fixed at construction, invoked in this order.
    channels: Vec<Box<dyn AlertChannel>>,
    audit: Arc<dyn AuditSink>,
}

impl AlarmService {
    /// Build the engine in `Disarmed`.
    ///
    /// If `channels` is empty a [`LogChannel`] is installed so that every
    /// alert leaves at least an audit trail.
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        channels: Vec<Box<dyn AlertChannel>>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let channels: Vec<Box<dyn AlertChannel>> = if channels.is_empty() {
            info!("No alert channels configured, using log channel");
            vec![Box::new(LogChannel::new(Arc::clone(&audit)))]
        } else {
            channels
        };
        info!(
            "AlarmService ready with {} alert channel(s): {:?}",
            channels.len(),
            channels.iter().map(|c| c.name()).collect::<Vec<_>>()
        );
        Self {
            core: Mutex::new(AlarmCore::new()),
            config,
            channels,
            audit,
        }
    }

    // ── Control surface ───────────────────────────────────────

    /// Arm with a configured profile or enter a built-in test mode.
    ///
    /// Profile names match case-insensitively; `TestSoft` / `TestWiring`
    /// also ignore whitespace and are always available.  On failure the
    /// state is untouched.
    pub fn arm(&self, requested: &str) -> Result<OperatingState> {
        let next = match ArmTarget::parse(requested) {
            ArmTarget::TestSoft => OperatingState::TestSoft,
            ArmTarget::TestWiring => OperatingState::TestWiring,
            ArmTarget::Profile(name) => {
                let site = self.config.site();
                let profile = site
                    .profile(name)
                    .ok_or_else(|| AlarmError::UnknownProfile(name.to_owned()))?;
                OperatingState::Armed(profile.name.clone())
            }
        };
        self.apply(next.clone());
        Ok(next)
    }

    /// Return to `Disarmed`.  Always succeeds.
    pub fn disarm(&self) {
        self.apply(OperatingState::Disarmed);
    }

    /// Inject an activation for `zone_id` while in `TestSoft`.
    ///
    /// Runs the same dispatch step as the poll loop.  A zone that is
    /// already latched is a silent no-op.
    pub fn trigger_manually(&self, zone_id: ZoneId) -> Result<TriggerOutcome> {
        let site = self.config.site();
        let zone = {
            let mut core = self.lock();
            if *core.state() != OperatingState::TestSoft {
                return Err(AlarmError::NotInTestSoftMode);
            }
            let zone = site.zone(zone_id).ok_or(AlarmError::UnknownZone(zone_id))?;
            if !zone.enabled {
                debug!("Manual trigger ignored, zone {} is disabled", zone_id);
                return Ok(TriggerOutcome::ZoneDisabled);
            }
            if !core.latch(zone.id) {
                return Ok(TriggerOutcome::AlreadyLatched);
            }
            self.audit.record(&AuditEvent::latched(zone, LatchOrigin::Manual));
            zone.clone()
        };
        info!("Manual trigger: zone {} ({})", zone.id, zone.name);
        Ok(TriggerOutcome::Dispatched(self.dispatch(&zone)))
    }

    /// Consistent view of the state and every zone's latch.
    pub fn snapshot(&self) -> StatusSnapshot {
        let site = self.config.site();
        let (state, triggered) = {
            let core = self.lock();
            (core.state().clone(), core.latched().collect::<Vec<_>>())
        };
        let zones = site
            .zones
            .iter()
            .map(|z| ZoneStatus {
                id: z.id,
                name: z.name.clone(),
                kind: z.kind,
                pin: z.pin,
                enabled: z.enabled,
                latched: triggered.binary_search(&z.id).is_ok(),
            })
            .collect();
        StatusSnapshot {
            state,
            triggered,
            zones,
        }
    }

    /// Current operating state.
    pub fn state(&self) -> OperatingState {
        self.lock().state().clone()
    }

    /// Configured channel names, in invocation order.
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    // ── Per-tick polling ──────────────────────────────────────

    /// Sample the active zones once and latch fresh activations.
    ///
    /// Returns the zones whose alerts must now be dispatched; the caller
    /// decides where that happens (inline or on a dispatcher thread).  In
    /// `TestWiring` latches are audited but nothing is returned.
    pub fn poll_tick(&self, sensors: &mut impl SensorPort) -> Vec<Zone> {
        let (state, epoch) = {
            let core = self.lock();
            (core.state().clone(), core.epoch())
        };
        if !state.polls_sensors() {
            return Vec::new();
        }

        let site = self.config.site();
        let tripped: Vec<&Zone> = site
            .active_zones(&state)
            .into_iter()
            .filter(|z| activated(sensors.read_level(z.pin), z.mode))
            .collect();
        if tripped.is_empty() {
            return Vec::new();
        }

        let origin = if state.delivers_alerts() {
            LatchOrigin::Sensor
        } else {
            LatchOrigin::WiringTest
        };

        let mut fresh = Vec::new();
        {
            let mut core = self.lock();
            if core.epoch() != epoch {
                debug!(
                    "State changed during tick, discarding {} activation(s)",
                    tripped.len()
                );
                return Vec::new();
            }
            for zone in tripped {
                if core.latch(zone.id) {
                    self.audit.record(&AuditEvent::latched(zone, origin));
                    fresh.push(zone.clone());
                }
            }
        }

        for zone in &fresh {
            match origin {
                LatchOrigin::WiringTest => {
                    info!("Wiring test: zone {} ({}) activated", zone.id, zone.name);
                }
                _ => warn!("ALARM: zone {} ({}) triggered in {}", zone.id, zone.name, state),
            }
        }

        if origin == LatchOrigin::WiringTest {
            Vec::new()
        } else {
            fresh
        }
    }

    /// [`poll_tick`](Self::poll_tick) followed by inline dispatch.
    pub fn tick(&self, sensors: &mut impl SensorPort) -> Vec<DispatchReport> {
        self.poll_tick(sensors)
            .iter()
            .map(|zone| self.dispatch(zone))
            .collect()
    }

    // ── Alert dispatch ────────────────────────────────────────

    /// Invoke every channel, in order, for a freshly latched zone.
    ///
    /// Never called with the engine lock held.  A failing (or panicking)
    /// channel is audited and the remaining channels still run; the latch
    /// is not rolled back.
    pub fn dispatch(&self, zone: &Zone) -> DispatchReport {
        let mut report = DispatchReport::new(zone.id);
        for channel in &self.channels {
            let result = panic::catch_unwind(AssertUnwindSafe(|| channel.send(zone)))
                .unwrap_or_else(|_| Err(ChannelError::Transport("channel panicked".into())));
            match result {
                Ok(()) => {
                    debug!("Alert channel '{}' delivered zone {}", channel.name(), zone.id);
                    report.delivered.push(channel.name().to_owned());
                }
                Err(e) => {
                    warn!(
                        "Alert channel '{}' failed for zone {}: {}",
                        channel.name(),
                        zone.id,
                        e
                    );
                    self.audit
                        .record(&AuditEvent::channel_failure(channel.name(), zone, e.to_string()));
                    report.failed.push(e.into_alarm_error(channel.name()));
                }
            }
        }
        report
    }

    // ── Internal ──────────────────────────────────────────────

    /// State value, latch clear and epoch bump as one locked step; the
    /// audit record is written under the same lock so the trail keeps
    /// transition order.
    fn apply(&self, next: OperatingState) {
        let mut core = self.lock();
        let from = core.transition(next.clone());
        self.audit.record(&AuditEvent::Transition {
            from: from.clone(),
            to: next.clone(),
        });
        drop(core);
        info!("State {} -> {}", from, next);
    }

    fn lock(&self) -> MutexGuard<'_, AlarmCore> {
        // A panic while holding the lock cannot leave AlarmCore half-updated
        // (every mutation is a single call), so poisoning is ignored.
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
