//! Background poller: real threads, simulated inputs, short periods.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use minder::app::ports::{AlertChannel, StaticSite};
use minder::app::service::AlarmService;
use minder::error::ChannelError;
use minder::poller::{DISPATCH_DEPTH, Poller, PollerConfig};
use minder::sensors::{GpioBank, SimulatedSensors, WiringMode};
use minder::site::{ArmProfile, Site, Zone, ZoneId};

use crate::mock_hw::{MemoryAudit, RecordingChannel, two_zone_site, wait_for};

const FAST: PollerConfig = PollerConfig {
    period: Duration::from_millis(5),
};

const PATIENCE: Duration = Duration::from_secs(5);

#[test]
fn poller_delivers_alert_once_per_activation() {
    let audit = MemoryAudit::new();
    let (channel, sent) = RecordingChannel::new("test");
    let service = Arc::new(AlarmService::new(
        Arc::new(two_zone_site()),
        vec![Box::new(channel)],
        audit.clone(),
    ));
    let sensors = SimulatedSensors::new();
    sensors.set_level(17, true);

    let poller = Poller::spawn(Arc::clone(&service), sensors.clone(), FAST).unwrap();
    service.arm("Away").unwrap();
    assert!(wait_for(PATIENCE, || poller.stats().ticks >= 3));
    assert!(sent.lock().unwrap().is_empty());

    sensors.set_level(17, false);
    assert!(wait_for(PATIENCE, || !sent.lock().unwrap().is_empty()));

    // Let several more ticks pass with the door still open.
    let ticks = poller.stats().ticks;
    assert!(wait_for(PATIENCE, || poller.stats().ticks >= ticks + 5));

    let stats = poller.stop();
    assert_eq!(*sent.lock().unwrap(), vec![1]);
    assert_eq!(stats.dispatched, 1);
    assert_eq!(stats.queue_full, 0);
}

#[test]
fn disarm_stops_alerting_while_poller_runs() {
    let (channel, sent) = RecordingChannel::new("test");
    let service = Arc::new(AlarmService::new(
        Arc::new(two_zone_site()),
        vec![Box::new(channel)],
        MemoryAudit::new(),
    ));
    let sensors = SimulatedSensors::new();
    sensors.set_level(17, true);

    let poller = Poller::spawn(Arc::clone(&service), sensors.clone(), FAST).unwrap();
    service.arm("Away").unwrap();
    service.disarm();

    sensors.set_level(27, true);
    let ticks = poller.stats().ticks;
    assert!(wait_for(PATIENCE, || poller.stats().ticks >= ticks + 5));
    drop(poller);

    assert!(sent.lock().unwrap().is_empty());
}

#[test]
fn stopped_poller_reads_nothing() {
    let (channel, sent) = RecordingChannel::new("test");
    let service = Arc::new(AlarmService::new(
        Arc::new(two_zone_site()),
        vec![Box::new(channel)],
        MemoryAudit::new(),
    ));
    let sensors = SimulatedSensors::new();

    let poller = Poller::spawn(Arc::clone(&service), sensors.clone(), FAST).unwrap();
    let stopped = poller.stop();

    service.arm("Away").unwrap();
    sensors.set_level(27, true);
    std::thread::sleep(Duration::from_millis(50));
    assert!(sent.lock().unwrap().is_empty());
    assert!(service.snapshot().triggered.is_empty());
    assert_eq!(stopped.dispatched, 0);
}

/// Blocks every send until the test releases the gate.
struct GatedChannel {
    open: Arc<AtomicBool>,
    sent: Arc<Mutex<Vec<ZoneId>>>,
}

impl AlertChannel for GatedChannel {
    fn name(&self) -> &str {
        "gated"
    }

    fn send(&self, zone: &Zone) -> Result<(), ChannelError> {
        while !self.open.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_millis(1));
        }
        self.sent.lock().unwrap().push(zone.id);
        Ok(())
    }
}

#[test]
fn full_dispatch_queue_delays_but_delivers_every_zone() {
    let zone_count = DISPATCH_DEPTH + 4;
    let zones: Vec<Zone> = (0..zone_count)
        .map(|i| Zone::new(i as u32 + 1, format!("Zone {}", i + 1), i as u8, WiringMode::NormallyOpen))
        .collect();
    let ids: Vec<ZoneId> = zones.iter().map(|z| z.id).collect();
    let site = Site::new(zones, vec![ArmProfile::new("All", ids.clone())]);

    let open = Arc::new(AtomicBool::new(false));
    let sent = Arc::new(Mutex::new(Vec::new()));
    let audit = MemoryAudit::new();
    let service = Arc::new(AlarmService::new(
        Arc::new(StaticSite::new(site)),
        vec![Box::new(GatedChannel {
            open: Arc::clone(&open),
            sent: Arc::clone(&sent),
        })],
        audit.clone(),
    ));

    let sensors = SimulatedSensors::new();
    for pin in 0..zone_count {
        sensors.set_level(pin as u8, true);
    }

    let poller = Poller::spawn(Arc::clone(&service), sensors, FAST).unwrap();
    service.arm("All").unwrap();

    // Every zone latches on one tick; the tick then waits for queue room
    // while the dispatcher is stuck.
    assert!(wait_for(PATIENCE, || service.snapshot().triggered.len() == zone_count));
    assert!(wait_for(PATIENCE, || poller.stats().queue_full >= 1));
    assert!(sent.lock().unwrap().is_empty());

    open.store(true, Ordering::Release);
    assert!(wait_for(PATIENCE, || sent.lock().unwrap().len() == zone_count));

    let stats = poller.stop();
    assert_eq!(stats.dispatched, zone_count as u64);

    let mut delivered = sent.lock().unwrap().clone();
    delivered.sort_unstable();
    assert_eq!(delivered, ids);
    assert!(audit.failures().is_empty());
}

#[test]
fn stop_while_queue_is_full_still_delivers_everything() {
    let zone_count = DISPATCH_DEPTH + 2;
    let zones: Vec<Zone> = (0..zone_count)
        .map(|i| Zone::new(i as u32 + 1, format!("Zone {}", i + 1), i as u8, WiringMode::NormallyOpen))
        .collect();
    let ids: Vec<ZoneId> = zones.iter().map(|z| z.id).collect();
    let site = Site::new(zones, vec![ArmProfile::new("All", ids)]);

    let open = Arc::new(AtomicBool::new(false));
    let sent = Arc::new(Mutex::new(Vec::new()));
    let service = Arc::new(AlarmService::new(
        Arc::new(StaticSite::new(site)),
        vec![Box::new(GatedChannel {
            open: Arc::clone(&open),
            sent: Arc::clone(&sent),
        })],
        MemoryAudit::new(),
    ));

    let sensors = SimulatedSensors::new();
    for pin in 0..zone_count {
        sensors.set_level(pin as u8, true);
    }

    let poller = Poller::spawn(Arc::clone(&service), sensors, FAST).unwrap();
    service.arm("All").unwrap();
    assert!(wait_for(PATIENCE, || poller.stats().queue_full >= 1));

    let releaser = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        open.store(true, Ordering::Release);
    });
    let stats = poller.stop();
    releaser.join().unwrap();

    assert_eq!(stats.dispatched, zone_count as u64);
    assert_eq!(sent.lock().unwrap().len(), zone_count);
}

/// Input pin backed by a shared flag, as a board HAL pin would be.
struct FlagPin(Arc<AtomicBool>);

impl embedded_hal::digital::ErrorType for FlagPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::InputPin for FlagPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.load(Ordering::Acquire))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.load(Ordering::Acquire))
    }
}

#[test]
fn poller_drives_a_gpio_bank() {
    let (channel, sent) = RecordingChannel::new("test");
    let service = Arc::new(AlarmService::new(
        Arc::new(two_zone_site()),
        vec![Box::new(channel)],
        MemoryAudit::new(),
    ));

    let door = Arc::new(AtomicBool::new(true));
    let hall = Arc::new(AtomicBool::new(false));
    let bank = GpioBank::new()
        .with_pin(17, FlagPin(Arc::clone(&door)))
        .with_pin(27, FlagPin(Arc::clone(&hall)));

    let poller = Poller::spawn(Arc::clone(&service), bank, FAST).unwrap();
    service.arm("Away").unwrap();
    assert!(wait_for(PATIENCE, || poller.stats().ticks >= 3));
    assert!(sent.lock().unwrap().is_empty());

    hall.store(true, Ordering::Release);
    assert!(wait_for(PATIENCE, || !sent.lock().unwrap().is_empty()));
    drop(poller);

    assert_eq!(*sent.lock().unwrap(), vec![2]);
}
