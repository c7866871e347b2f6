//! End-to-end engine scenarios: arm/disarm, polling, manual triggers and
//! alert dispatch, all against recording mocks.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use minder::app::events::{AuditEvent, LatchOrigin};
use minder::app::ports::{AlertChannel, SensorPort};
use minder::app::service::{AlarmService, TriggerOutcome};
use minder::error::{AlarmError, ChannelError};
use minder::fsm::OperatingState;
use minder::site::{Zone, ZoneId};

use crate::mock_hw::{
    FailingChannel, MemoryAudit, RecordingChannel, quiet_sensors, two_zone_site,
};

fn make_engine() -> (AlarmService, Arc<Mutex<Vec<ZoneId>>>, Arc<MemoryAudit>) {
    let audit = MemoryAudit::new();
    let (channel, sent) = RecordingChannel::new("test");
    let service = AlarmService::new(
        Arc::new(two_zone_site()),
        vec![Box::new(channel)],
        audit.clone(),
    );
    (service, sent, audit)
}

// ── Armed polling ─────────────────────────────────────────────

#[test]
fn away_then_home_scenario() {
    let (engine, sent, _audit) = make_engine();
    let mut sensors = quiet_sensors();

    engine.arm("Away").unwrap();
    assert!(engine.tick(&mut sensors).is_empty(), "quiet inputs must not alert");

    // Door opens: NC loop goes low.
    sensors.set(17, false);
    let reports = engine.tick(&mut sensors);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].zone_id, 1);
    assert_eq!(*sent.lock().unwrap(), vec![1]);

    // Still open on the next tick: latched, no repeat.
    assert!(engine.tick(&mut sensors).is_empty());
    assert_eq!(sent.lock().unwrap().len(), 1);

    // Hall motion is a separate zone.
    sensors.set(27, true);
    engine.tick(&mut sensors);
    assert_eq!(*sent.lock().unwrap(), vec![1, 2]);

    // Disarmed: nothing is even read.
    engine.disarm();
    let reads = sensors.reads;
    assert!(engine.tick(&mut sensors).is_empty());
    assert_eq!(sensors.reads, reads);

    // Home only watches the door; the latch was cleared by the transitions.
    engine.arm("home").unwrap();
    engine.tick(&mut sensors);
    assert_eq!(*sent.lock().unwrap(), vec![1, 2, 1]);
}

#[test]
fn away_then_home_with_two_channels() {
    let audit = MemoryAudit::new();
    let (first, first_sent) = RecordingChannel::new("log");
    let (second, second_sent) = RecordingChannel::new("email");
    let engine = AlarmService::new(
        Arc::new(two_zone_site()),
        vec![Box::new(first), Box::new(second)],
        audit,
    );
    let mut sensors = quiet_sensors();

    engine.arm("Away").unwrap();
    sensors.set(17, false);
    engine.tick(&mut sensors);
    assert!(engine.snapshot().is_latched(1));
    assert_eq!(*first_sent.lock().unwrap(), vec![1]);
    assert_eq!(*second_sent.lock().unwrap(), vec![1]);

    for _ in 0..5 {
        assert!(engine.tick(&mut sensors).is_empty());
    }
    assert_eq!(first_sent.lock().unwrap().len(), 1);
    assert_eq!(second_sent.lock().unwrap().len(), 1);

    engine.disarm();
    assert!(!engine.snapshot().is_latched(1));

    // Door closed again, hall motion: zone 2 is not watched in Home.
    engine.arm("Home").unwrap();
    sensors.set(17, true).set(27, true);
    assert!(engine.tick(&mut sensors).is_empty());
    assert!(!engine.snapshot().is_latched(2));
    assert!(engine.snapshot().triggered.is_empty());
    assert_eq!(first_sent.lock().unwrap().len(), 1);
    assert_eq!(second_sent.lock().unwrap().len(), 1);
}

#[test]
fn profile_names_match_case_insensitively() {
    let (engine, _, _) = make_engine();
    assert_eq!(engine.arm("aWaY"), Ok(OperatingState::Armed("Away".into())));
    assert_eq!(engine.snapshot().state, OperatingState::Armed("Away".into()));
}

#[test]
fn transitions_clear_latches() {
    let (engine, _, _) = make_engine();
    let mut sensors = quiet_sensors();
    sensors.set(17, false);

    engine.arm("Away").unwrap();
    engine.tick(&mut sensors);
    assert_eq!(engine.snapshot().triggered, vec![1]);

    // Re-arming the same profile still counts as a transition.
    engine.arm("Away").unwrap();
    assert!(engine.snapshot().triggered.is_empty());
}

#[test]
fn disabled_zone_is_never_polled_or_triggered() {
    use minder::app::ports::StaticSite;
    use minder::sensors::WiringMode;
    use minder::site::{ArmProfile, Site};

    let site = Site::new(
        vec![Zone::new(5, "Shed", 4, WiringMode::NormallyOpen).disabled()],
        vec![ArmProfile::new("Away", vec![5])],
    );
    let (channel, sent) = RecordingChannel::new("test");
    let engine = AlarmService::new(
        Arc::new(StaticSite::new(site)),
        vec![Box::new(channel)],
        MemoryAudit::new(),
    );

    let mut sensors = crate::mock_hw::MockSensors::new();
    sensors.set(4, true);
    engine.arm("Away").unwrap();
    engine.tick(&mut sensors);
    assert_eq!(sensors.reads, 0);

    engine.arm("TestSoft").unwrap();
    assert_eq!(engine.trigger_manually(5), Ok(TriggerOutcome::ZoneDisabled));
    assert!(sent.lock().unwrap().is_empty());
    assert!(engine.snapshot().triggered.is_empty());
}

// ── TestSoft ──────────────────────────────────────────────────

#[test]
fn manual_trigger_is_edge_triggered() {
    let (engine, sent, _) = make_engine();
    engine.arm("test soft").unwrap();
    assert_eq!(engine.state(), OperatingState::TestSoft);

    let first = engine.trigger_manually(2).unwrap();
    let TriggerOutcome::Dispatched(report) = first else {
        panic!("first trigger should dispatch, got {:?}", first);
    };
    assert_eq!(report.delivered, vec!["test".to_owned()]);
    assert!(report.all_delivered());

    assert_eq!(engine.trigger_manually(2), Ok(TriggerOutcome::AlreadyLatched));
    assert_eq!(*sent.lock().unwrap(), vec![2]);
    assert!(engine.snapshot().is_latched(2));
}

#[test]
fn test_soft_never_reads_sensors() {
    let (engine, sent, _) = make_engine();
    let mut sensors = quiet_sensors();
    sensors.set(17, false).set(27, true);

    engine.arm("TESTSOFT").unwrap();
    assert!(engine.tick(&mut sensors).is_empty());
    assert_eq!(sensors.reads, 0);
    assert!(sent.lock().unwrap().is_empty());
}

#[test]
fn manual_trigger_outside_test_soft_is_rejected() {
    let (engine, _, _) = make_engine();

    assert_eq!(engine.trigger_manually(1), Err(AlarmError::NotInTestSoftMode));
    engine.arm("Away").unwrap();
    assert_eq!(engine.trigger_manually(1), Err(AlarmError::NotInTestSoftMode));
    engine.arm("testwiring").unwrap();
    assert_eq!(engine.trigger_manually(1), Err(AlarmError::NotInTestSoftMode));
    assert!(engine.snapshot().triggered.is_empty());
}

#[test]
fn rejected_requests_do_not_mutate_state() {
    let (engine, sent, audit) = make_engine();
    engine.arm("TestSoft").unwrap();
    engine.trigger_manually(1).unwrap();
    let before = engine.snapshot();
    let events_before = audit.events().len();

    assert_eq!(engine.arm("Night"), Err(AlarmError::UnknownProfile("Night".into())));
    assert_eq!(engine.trigger_manually(42), Err(AlarmError::UnknownZone(42)));

    assert_eq!(engine.snapshot(), before);
    assert_eq!(audit.events().len(), events_before);
    assert_eq!(sent.lock().unwrap().len(), 1);
}

// ── TestWiring ────────────────────────────────────────────────

#[test]
fn test_wiring_audits_but_never_alerts() {
    let (engine, sent, audit) = make_engine();
    let mut sensors = quiet_sensors();
    engine.arm("Test Wiring").unwrap();
    audit.clear();

    sensors.set(27, true);
    assert!(engine.tick(&mut sensors).is_empty());
    assert!(engine.tick(&mut sensors).is_empty());

    assert!(sent.lock().unwrap().is_empty());
    assert_eq!(audit.lines(), vec!["wiring test trigger zone id=2 (Hall)"]);
    assert!(engine.snapshot().is_latched(2));
}

// ── Channel failures ──────────────────────────────────────────

#[test]
fn failing_channel_does_not_block_the_others() {
    let audit = MemoryAudit::new();
    let (failing, attempts) = FailingChannel::new();
    let (recording, sent) = RecordingChannel::new("test");
    let engine = AlarmService::new(
        Arc::new(two_zone_site()),
        vec![Box::new(failing), Box::new(recording)],
        audit.clone(),
    );

    engine.arm("TestSoft").unwrap();
    let Ok(TriggerOutcome::Dispatched(report)) = engine.trigger_manually(1) else {
        panic!("trigger should dispatch");
    };
    assert_eq!(report.delivered, vec!["test".to_owned()]);
    assert_eq!(
        report.failed,
        vec![AlarmError::ChannelDeliveryFailure {
            channel: "flaky".into(),
            cause: "transport: connection refused".into(),
        }]
    );

    engine.trigger_manually(2).unwrap();
    assert_eq!(attempts.load(Ordering::SeqCst), 2, "exactly one attempt per alert");
    assert_eq!(*sent.lock().unwrap(), vec![1, 2]);
    assert_eq!(audit.failures().len(), 2);
    assert!(engine.snapshot().is_latched(1), "failure must not roll back the latch");
}

#[test]
fn failing_channel_audits_once_per_dispatching_tick() {
    let audit = MemoryAudit::new();
    let (failing, attempts) = FailingChannel::new();
    let (recording, sent) = RecordingChannel::new("test");
    let engine = AlarmService::new(
        Arc::new(two_zone_site()),
        vec![Box::new(failing), Box::new(recording)],
        audit.clone(),
    );
    let mut sensors = quiet_sensors();
    engine.arm("Away").unwrap();

    // Tick 1: door opens.
    sensors.set(17, false);
    let reports = engine.tick(&mut sensors);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].failed.len(), 1);
    assert!(engine.snapshot().is_latched(1));
    assert_eq!(audit.failures().len(), 1);

    // Tick 2: nothing new, nothing attempted.
    assert!(engine.tick(&mut sensors).is_empty());
    assert_eq!(audit.failures().len(), 1);

    // Tick 3: hall motion.
    sensors.set(27, true);
    engine.tick(&mut sensors);
    assert_eq!(audit.failures().len(), 2);

    // Tick 4: both latched, nothing attempted.
    engine.tick(&mut sensors);

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(audit.failures().len(), 2);
    assert_eq!(*sent.lock().unwrap(), vec![1, 2]);
    assert!(audit.failures().iter().all(|e| matches!(
        e,
        AuditEvent::ChannelFailure { channel, .. } if channel == "flaky"
    )));
}

struct PanickingChannel;

impl AlertChannel for PanickingChannel {
    fn name(&self) -> &str {
        "broken"
    }

    fn send(&self, _zone: &Zone) -> Result<(), ChannelError> {
        panic!("driver bug");
    }
}

#[test]
fn panicking_channel_is_contained() {
    let audit = MemoryAudit::new();
    let (recording, sent) = RecordingChannel::new("test");
    let engine = AlarmService::new(
        Arc::new(two_zone_site()),
        vec![Box::new(PanickingChannel), Box::new(recording)],
        audit.clone(),
    );

    engine.arm("TestSoft").unwrap();
    let Ok(TriggerOutcome::Dispatched(report)) = engine.trigger_manually(1) else {
        panic!("trigger should dispatch");
    };
    assert_eq!(report.failed.len(), 1);
    assert_eq!(*sent.lock().unwrap(), vec![1]);

    // The engine is still fully usable.
    engine.disarm();
    assert_eq!(engine.state(), OperatingState::Disarmed);
}

// ── Default channel and audit trail ───────────────────────────

#[test]
fn empty_channel_list_falls_back_to_log_channel() {
    let audit = MemoryAudit::new();
    let engine = AlarmService::new(Arc::new(two_zone_site()), Vec::new(), audit.clone());
    assert_eq!(engine.channel_names(), vec!["log"]);

    engine.arm("Away").unwrap();
    let mut sensors = quiet_sensors();
    sensors.set(17, false);
    engine.tick(&mut sensors);

    assert_eq!(
        audit.lines(),
        vec![
            "arm Away (was Disarmed)",
            "trigger zone id=1 (Front Door)",
            "alert: zone 1 (Front Door) triggered",
        ]
    );
}

#[test]
fn audit_records_latch_origin() {
    let (engine, _, audit) = make_engine();
    engine.arm("TestSoft").unwrap();
    engine.trigger_manually(1).unwrap();

    assert!(audit.events().contains(&AuditEvent::Latched {
        zone_id: 1,
        zone_name: "Front Door".into(),
        origin: LatchOrigin::Manual,
    }));
}

// ── Concurrency: transition during a tick ─────────────────────

/// Sensor bank that disarms the engine from inside the first read, i.e.
/// between the tick's state snapshot and its latch step.
struct DisarmingSensors<'a> {
    engine: &'a AlarmService,
    fired: bool,
}

impl SensorPort for DisarmingSensors<'_> {
    fn read_level(&mut self, _pin: u8) -> bool {
        if !self.fired {
            self.fired = true;
            self.engine.disarm();
        }
        // Every input reads "tripped" for NO zones.
        true
    }
}

#[test]
fn tick_discards_activations_after_a_concurrent_transition() {
    let (engine, sent, _) = make_engine();
    engine.arm("Away").unwrap();

    let mut sensors = DisarmingSensors {
        engine: &engine,
        fired: false,
    };
    assert!(engine.tick(&mut sensors).is_empty());

    let snap = engine.snapshot();
    assert_eq!(snap.state, OperatingState::Disarmed);
    assert!(snap.triggered.is_empty(), "no latch may survive into the new state");
    assert!(sent.lock().unwrap().is_empty());
}

#[test]
fn concurrent_control_calls_keep_snapshot_consistent() {
    let (engine, _, _) = make_engine();
    let engine = Arc::new(engine);

    let writers: Vec<_> = (0..4)
        .map(|i| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    if i % 2 == 0 {
                        engine.arm("TestSoft").unwrap();
                        let _ = engine.trigger_manually(1);
                    } else {
                        engine.disarm();
                    }
                }
            })
        })
        .collect();

    for _ in 0..500 {
        let snap = engine.snapshot();
        if snap.state != OperatingState::TestSoft {
            assert!(snap.triggered.is_empty(), "latched zone outside TestSoft: {:?}", snap);
        }
    }
    for w in writers {
        w.join().unwrap();
    }
}

// ── Status serialization ──────────────────────────────────────

#[test]
fn status_snapshot_serializes_for_clients() {
    let (engine, _, _) = make_engine();
    engine.arm("TestSoft").unwrap();
    engine.trigger_manually(2).unwrap();

    let json = serde_json::to_value(engine.snapshot()).unwrap();
    assert_eq!(json["state"]["mode"], "test_soft");
    assert_eq!(json["triggered"], serde_json::json!([2]));
    assert_eq!(json["zones"][1]["type"], "motion");
    assert_eq!(json["zones"][1]["latched"], true);
    assert_eq!(json["zones"][0]["latched"], false);

    engine.arm("Away").unwrap();
    let json = serde_json::to_value(engine.snapshot()).unwrap();
    assert_eq!(json["state"], serde_json::json!({"mode": "armed", "profile": "Away"}));
}
