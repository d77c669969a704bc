//! Ranger Monitor - Entry Point
//!
//! Wires the metrics exporter and the periodic access probe around the
//! authorization engine. Runs until SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 1. Parse CLI (`--interval`, `--config`)
//! 2. Load config.toml (defaults when absent) + validate
//! 3. Init tracing (JSON structured logging)
//! 4. Register the monitor instruments
//! 5. Start the exporter on :6085 (`METRICS_PORT` overrides)
//! 6. Initialize the engine (bounded retries); on failure stop the exporter and exit
//! 7. Start the probe loop
//! 8. Wait for SIGINT/SIGTERM or an unexpected loop exit, then stop both

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use ranger_monitor::adapters::authz::HttpAccessChecker;
use ranger_monitor::adapters::metrics::{MetricsRegistry, MetricsServer, MonitorMetrics};
use ranger_monitor::config::{
    self, AppConfig, METRICS_PORT_ENV, RawInterval, resolve_interval, resolve_metrics_port,
};
use ranger_monitor::usecases::{AccessProbe, MonitorState, ProbeSettings};

/// Periodic synthetic access checks against an authorization engine,
/// exported as Prometheus metrics.
#[derive(Debug, Parser)]
#[command(name = "ranger-monitor", version, about)]
struct Cli {
    /// Seconds between access checks; overrides `probe.interval_seconds`.
    #[arg(long, value_name = "SECONDS")]
    interval: Option<String>,

    /// Path to the TOML configuration file.
    #[arg(long, short, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── 1. Load configuration ───────────────────────────────
    let config_present = Path::new(&cli.config).exists();
    let config = if config_present {
        config::loader::load_config(&cli.config).context("Failed to load configuration")?
    } else {
        AppConfig::default()
    };

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.monitor.log_level)),
        )
        .json()
        .init();

    if !config_present {
        warn!(path = %cli.config, "Config file not found, using defaults");
    }

    // CLI flag wins over the file; bad values degrade to 60s.
    let raw_interval = cli
        .interval
        .map(RawInterval::Text)
        .or_else(|| config.probe.interval_seconds.clone());
    let interval = resolve_interval(raw_interval.as_ref());

    info!(
        name = %config.monitor.name,
        version = env!("CARGO_PKG_VERSION"),
        interval_secs = interval.as_secs(),
        "Starting Ranger monitor"
    );

    // ── 3. Metrics registry + exporter ──────────────────────
    let registry = Arc::new(MetricsRegistry::new());
    let metrics = Arc::new(
        MonitorMetrics::new(&registry).context("Failed to register monitor metrics")?,
    );

    let mut metrics_config = config.metrics.clone();
    metrics_config.port = resolve_metrics_port(
        std::env::var(METRICS_PORT_ENV).ok().as_deref(),
        metrics_config.port,
    );
    let exporter = MetricsServer::new(
        metrics_config.bind_address(),
        Arc::clone(&registry),
        Arc::clone(&metrics),
    );
    exporter.start().await.context("Failed to start metrics server")?;

    // ── 4. Initialize engine + probe ────────────────────────
    let target = config
        .probe
        .target()
        .context("Invalid probe target in configuration")?;
    let settings = ProbeSettings::from_config(&config.probe, target, interval);

    let checker = HttpAccessChecker::new(&config.authz)
        .context("Failed to create authorization engine client")?;
    let initialized =
        AccessProbe::initialize(Arc::new(checker), settings, Arc::clone(&metrics)).await;
    let probe = match initialized {
        Ok(probe) => probe,
        Err(e) => {
            error!(error = %e, "Monitor failed to start");
            exporter.stop().await;
            return Err(e).context("Authorization engine initialization failed");
        }
    };

    // ── 5. Run until signalled ──────────────────────────────
    probe.start().await;
    let mut state_rx = probe.subscribe_state();
    info!("Ranger monitor is running");

    tokio::select! {
        () = shutdown_signal() => {}
        _ = state_rx.wait_for(|s| *s == MonitorState::Stopped) => {
            error!("Access probe stopped unexpectedly, shutting down");
        }
    }

    // ── 6. Graceful shutdown ────────────────────────────────
    probe.stop().await;
    exporter.stop().await;

    let stats = probe.stats();
    info!(
        total = stats.total,
        allowed = stats.allowed,
        denied = stats.denied,
        errors = stats.errors,
        "Shutdown complete"
    );
    Ok(())
}

/// Resolve on SIGINT or (on unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("SIGINT received, initiating graceful shutdown"),
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGINT");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("SIGTERM received, initiating graceful shutdown");
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
