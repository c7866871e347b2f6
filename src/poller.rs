//! Background polling task.
//!
//! Two dedicated threads, each driving one future on an `edge-executor`
//! with `async-io-mini` reactor timers:
//!
//! 1. **Poll**: one engine tick per period; freshly latched zones are
//!    pushed onto the dispatch queue without waiting.
//! 2. **Dispatch**: wakes on `queue.receive()` and runs every alert
//!    channel for the zone, so a slow SMTP relay never delays sampling.
//!
//! ```text
//!  ┌──────────────┐   Zone (bounded)   ┌──────────────────┐
//!  │  Poll thread │ ─────────────────▶ │ Dispatch thread  │ ──▶ AlertChannel × N
//!  │  period ⏱    │                    │  wake-on-send    │
//!  └──────────────┘                    └──────────────────┘
//!          ▲ stop                               ▲ stop (after draining)
//! ```
//!
//! A full queue makes the tick wait for the dispatcher; latched zones are
//! never dropped.  The wait is bounded by the channels' own timeouts.
//! The poll loop only observes the stop signal at its timer await, i.e.
//! between ticks, never in the middle of one.

use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::{debug, error, info};

use crate::app::ports::SensorPort;
use crate::app::service::AlarmService;
use crate::config::DEFAULT_POLL_INTERVAL_MS;
use crate::site::Zone;

/// Zones that may wait for the dispatcher before a tick has to wait.
pub const DISPATCH_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub period: Duration,
}

impl PollerConfig {
    pub fn from_interval_ms(ms: u32) -> Self {
        Self {
            period: Duration::from_millis(u64::from(ms.max(1))),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::from_interval_ms(DEFAULT_POLL_INTERVAL_MS)
    }
}

// ── Statistics ───────────────────────────────────────────────

#[derive(Debug, Default)]
struct PollStats {
    ticks: AtomicU64,
    overruns: AtomicU64,
    worst_tick_us: AtomicU64,
    dispatched: AtomicU64,
    queue_full: AtomicU64,
}

/// Point-in-time copy of the poller counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStatsSnapshot {
    pub ticks: u64,
    /// Ticks that took longer than the period.
    pub overruns: u64,
    pub worst_tick_us: u64,
    /// Zones handed to the alert channels.
    pub dispatched: u64,
    /// Zones that had to wait for room in the dispatch queue.
    pub queue_full: u64,
}

impl PollStats {
    fn record_tick(&self, elapsed: Duration, period: Duration) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        if elapsed > period {
            self.overruns.fetch_add(1, Ordering::Relaxed);
        }
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.worst_tick_us.fetch_max(us, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PollStatsSnapshot {
        PollStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            worst_tick_us: self.worst_tick_us.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            queue_full: self.queue_full.load(Ordering::Relaxed),
        }
    }
}

// ── Shared state between the two threads ─────────────────────

struct Shared {
    queue: Channel<CriticalSectionRawMutex, Zone, DISPATCH_DEPTH>,
    stop_poll: Signal<CriticalSectionRawMutex, ()>,
    stop_dispatch: Signal<CriticalSectionRawMutex, ()>,
    stats: PollStats,
}

// ── Async loops ──────────────────────────────────────────────

async fn poll_loop<S: SensorPort>(
    service: Arc<AlarmService>,
    mut sensors: S,
    shared: Arc<Shared>,
    period: Duration,
) {
    loop {
        let started = Instant::now();

        let fresh = panic::catch_unwind(AssertUnwindSafe(|| service.poll_tick(&mut sensors)))
            .unwrap_or_else(|_| {
                error!("Poll tick panicked, continuing with next tick");
                Vec::new()
            });

        for zone in fresh {
            if let Err(TrySendError::Full(zone)) = shared.queue.try_send(zone) {
                debug!("Dispatch queue full, zone {} waits for the dispatcher", zone.id);
                shared.stats.queue_full.fetch_add(1, Ordering::Relaxed);
                shared.queue.send(zone).await;
            }
        }

        let elapsed = started.elapsed();
        shared.stats.record_tick(elapsed, period);
        if elapsed > period {
            debug!("Poll tick overran: {:?} > {:?}", elapsed, period);
        }

        let stopped = future::or(
            async {
                shared.stop_poll.wait().await;
                true
            },
            async {
                async_io_mini::Timer::after(period.saturating_sub(elapsed)).await;
                false
            },
        )
        .await;
        if stopped {
            break;
        }
    }
}

async fn dispatch_loop(service: Arc<AlarmService>, shared: Arc<Shared>) {
    loop {
        let zone = shared.queue.receive().await;
        dispatch_one(&service, &shared, &zone);
    }
}

fn dispatch_one(service: &AlarmService, shared: &Shared, zone: &Zone) {
    let report = service.dispatch(zone);
    shared.stats.dispatched.fetch_add(1, Ordering::Relaxed);
    if !report.all_delivered() {
        debug!(
            "Zone {} dispatched: {} delivered, {} failed",
            zone.id,
            report.delivered.len(),
            report.failed.len()
        );
    }
}

// ── Thread entry points ──────────────────────────────────────

fn run_poll_thread<S: SensorPort>(
    service: Arc<AlarmService>,
    sensors: S,
    shared: Arc<Shared>,
    period: Duration,
) {
    let executor: edge_executor::LocalExecutor<'_, 2> = edge_executor::LocalExecutor::new();
    let task = executor.spawn(poll_loop(service, sensors, shared, period));

    info!("Poll task started (period {:?})", period);
    future::block_on(executor.run(task));
    info!("Poll task stopped");
}

fn run_dispatch_thread(service: Arc<AlarmService>, shared: Arc<Shared>) {
    let executor: edge_executor::LocalExecutor<'_, 2> = edge_executor::LocalExecutor::new();
    executor
        .spawn(dispatch_loop(Arc::clone(&service), Arc::clone(&shared)))
        .detach();

    future::block_on(executor.run(shared.stop_dispatch.wait()));

    // Alerts latched before the stop still go out.
    while let Ok(zone) = shared.queue.try_receive() {
        dispatch_one(&service, &shared, &zone);
    }
    info!("Dispatch task stopped");
}

// ── Handle ───────────────────────────────────────────────────

/// Handle to the running poll and dispatch threads.
///
/// Dropping the handle stops both threads.
pub struct Poller {
    shared: Arc<Shared>,
    poll_thread: Option<JoinHandle<()>>,
    dispatch_thread: Option<JoinHandle<()>>,
}

impl Poller {
    /// Start polling `sensors` for `service` every `config.period`.
    pub fn spawn<S>(
        service: Arc<AlarmService>,
        sensors: S,
        config: PollerConfig,
    ) -> io::Result<Self>
    where
        S: SensorPort + Send + 'static,
    {
        let shared = Arc::new(Shared {
            queue: Channel::new(),
            stop_poll: Signal::new(),
            stop_dispatch: Signal::new(),
            stats: PollStats::default(),
        });

        let dispatch_thread = {
            let service = Arc::clone(&service);
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("minder-dispatch".into())
                .spawn(move || run_dispatch_thread(service, shared))?
        };

        let poll_thread = {
            let poll_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name("minder-poll".into())
                .spawn(move || run_poll_thread(service, sensors, poll_shared, config.period));
            match spawned {
                Ok(handle) => handle,
                Err(e) => {
                    shared.stop_dispatch.signal(());
                    let _ = dispatch_thread.join();
                    return Err(e);
                }
            }
        };

        Ok(Self {
            shared,
            poll_thread: Some(poll_thread),
            dispatch_thread: Some(dispatch_thread),
        })
    }

    pub fn stats(&self) -> PollStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Stop polling, deliver anything still queued, and join both threads.
    pub fn stop(mut self) -> PollStatsSnapshot {
        self.shutdown();
        self.stats()
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.poll_thread.take() {
            self.shared.stop_poll.signal(());
            if handle.join().is_err() {
                error!("Poll thread panicked");
            }
        }
        if let Some(handle) = self.dispatch_thread.take() {
            self.shared.stop_dispatch.signal(());
            if handle.join().is_err() {
                error!("Dispatch thread panicked");
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown();
    }
}
