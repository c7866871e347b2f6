//! Minder zone alarm engine, host entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  JsonConfigStore   FileAuditLog   LogChannel / EmailChannel  │
//! │  (ConfigProvider)  (AuditSink)    (AlertChannel)             │
//! │  SimulatedSensors  Console                                   │
//! │  (SensorPort)      (control surface)                         │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │          AlarmService (state · latches)            │      │
//! │  └────────────────────────────────────────────────────┘      │
//! │                                                              │
//! │  Poller (poll thread + dispatch thread)                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use minder::adapters::audit_file::FileAuditLog;
use minder::adapters::config_file::JsonConfigStore;
use minder::adapters::console::Console;
use minder::adapters::log_sink::LogAuditSink;
use minder::alerts::build_channels;
use minder::app::ports::AuditSink;
use minder::app::service::AlarmService;
use minder::poller::{Poller, PollerConfig};
use minder::sensors::{SimulatedSensors, WiringMode};

#[derive(Debug, Parser)]
#[command(name = "minder", version, about = "Zone alarm engine")]
struct Args {
    /// Configuration file, created with defaults if missing
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Override the configured poll interval (milliseconds)
    #[arg(long, value_parser = clap::value_parser!(u32).range(10..=10_000))]
    poll_ms: Option<u32>,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) -> Result<()> {
    let default = if verbose { "minder=debug,audit=info" } else { "minder=info,audit=info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .context("invalid log filter")?;

    // stdout belongs to the console; logs go to stderr.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(io::stderr)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("logger already installed")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    info!("minder {} starting", env!("CARGO_PKG_VERSION"));

    // ── Configuration ─────────────────────────────────────────
    let store = Arc::new(
        JsonConfigStore::open(&args.config)
            .with_context(|| format!("loading {}", args.config.display()))?,
    );
    let cfg = store.config();
    info!(
        "{} zone(s), {} arm mode(s), {} alert entr(y/ies)",
        cfg.zones.len(),
        cfg.arm_modes.len(),
        cfg.alerts.len()
    );

    // ── Audit trail ───────────────────────────────────────────
    let audit: Arc<dyn AuditSink> = match FileAuditLog::open(&cfg.log_file) {
        Ok(file) => {
            info!("Audit log: {}", file.path().display());
            Arc::new(file)
        }
        Err(e) => {
            warn!("Cannot open audit log {}: {}, logging only", cfg.log_file, e);
            Arc::new(LogAuditSink::new())
        }
    };

    // ── Engine ────────────────────────────────────────────────
    let channels = build_channels(&cfg.alerts, Arc::clone(&audit));
    let service = Arc::new(AlarmService::new(store.clone(), channels, Arc::clone(&audit)));

    // No GPIO on this host: inputs are simulated, closed loops idle high.
    let sensors = SimulatedSensors::new();
    for zone in &cfg.zones {
        if zone.mode == WiringMode::NormallyClosed && !sensors.set_level(zone.pin, true) {
            warn!("Zone {} pin {} cannot be simulated", zone.id, zone.pin);
        }
    }

    let interval_ms = args.poll_ms.unwrap_or(cfg.poll_interval_ms);
    let poller = Poller::spawn(
        Arc::clone(&service),
        sensors.clone(),
        PollerConfig::from_interval_ms(interval_ms),
    )
    .context("starting poller")?;

    // ── Control surface ───────────────────────────────────────
    let console = Console::new(&service, Some(sensors)).with_site_admin(&store, &*audit);
    let result = console.run(io::stdin().lock(), io::stdout().lock());

    let stats = poller.stop();
    info!(
        "Stopped after {} tick(s): {} overrun(s), worst {}us, {} dispatched, {} queue wait(s)",
        stats.ticks, stats.overruns, stats.worst_tick_us, stats.dispatched, stats.queue_full
    );

    result.context("console I/O")
}
