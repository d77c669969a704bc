//! Access Probe - Periodic Synthetic Access Checks
//!
//! Drives the authorization engine with the same access check at a fixed
//! interval and records outcome and latency:
//! 1. Initialize the engine (bounded retries with backoff)
//! 2. `start()` spawns one loop task; a second `start()` is a no-op
//! 3. Each cycle: check, measure, count, log running statistics
//! 4. `stop()` cancels the inter-cycle wait immediately, waits a bounded
//!    grace for an in-flight check, then aborts
//!
//! A failed check never ends the loop. If the loop task dies anyway the
//! probe reports `Stopped` to its state subscribers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::metrics::{Gauge, MonitorMetrics};
use crate::config::{DEFAULT_INTERVAL_SECS, ProbeConfig};
use crate::domain::access::ProbeTarget;
use crate::domain::probe_stats::{
  ProbeResult, ProbeRun, ProbeStats, ProbeStatsSnapshot, duration_ms,
};
use crate::error::MonitorError;
use crate::ports::access_checker::AccessChecker;

/// Default bounded wait for an in-flight cycle during `stop()`.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// Lifecycle of the probe loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonitorState {
  Stopped,
  Starting,
  Running,
  Stopping,
}

/// Immutable probe parameters, fixed at construction.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
  pub target: ProbeTarget,
  /// Time between the end of one cycle and the start of the next.
  pub interval: Duration,
  pub stop_grace: Duration,
  pub init_attempts: u32,
  /// First retry delay; doubles per attempt.
  pub init_retry_delay: Duration,
}

impl ProbeSettings {
  /// Settings with default grace and a single initialization attempt.
  ///
  /// A zero interval is replaced by the 60s default.
  pub fn new(target: ProbeTarget, interval: Duration) -> Self {
    let interval = if interval.is_zero() {
      warn!(
        default_secs = DEFAULT_INTERVAL_SECS,
        "Interval must be positive, using default"
      );
      Duration::from_secs(DEFAULT_INTERVAL_SECS)
    } else {
      interval
    };

    Self {
      target,
      interval,
      stop_grace: DEFAULT_STOP_GRACE,
      init_attempts: 1,
      init_retry_delay: Duration::from_secs(2),
    }
  }

  /// Settings from the `[probe]` section with an already-resolved interval.
  pub fn from_config(
    config: &ProbeConfig,
    target: ProbeTarget,
    interval: Duration,
  ) -> Self {
    Self {
      stop_grace: config.stop_grace(),
      init_attempts: config.init_attempts.max(1),
      init_retry_delay: config.init_retry_delay(),
      ..Self::new(target, interval)
    }
  }
}

/// State shared between the handle and the loop task.
struct ProbeLoop {
  checker: Arc<dyn AccessChecker>,
  settings: ProbeSettings,
  metrics: Arc<MonitorMetrics>,
  stats: ProbeStats,
}

struct RunningLoop {
  cancel_tx: watch::Sender<bool>,
  handle: JoinHandle<()>,
}

/// Keeps the in-flight gauge balanced even if the cycle is aborted.
struct InFlight<'a>(&'a Gauge);

impl<'a> InFlight<'a> {
  fn enter(gauge: &'a Gauge) -> Self {
    gauge.inc(&[]);
    Self(gauge)
  }
}

impl Drop for InFlight<'_> {
  fn drop(&mut self) {
    self.0.dec(&[]);
  }
}

/// Owned by the loop task; flags a loop that ended without being cancelled.
struct LoopExit {
  state: Arc<watch::Sender<MonitorState>>,
  metrics: Arc<MonitorMetrics>,
  cancel_rx: watch::Receiver<bool>,
}

impl Drop for LoopExit {
  fn drop(&mut self) {
    if *self.cancel_rx.borrow() {
      return;
    }
    error!("Monitoring loop exited unexpectedly");
    self.metrics.set_monitor_running(false);
    self.state.send_replace(MonitorState::Stopped);
  }
}

/// Handle to the periodic access probe.
pub struct AccessProbe {
  inner: Arc<ProbeLoop>,
  /// `Some` exactly while a loop task exists.
  lifecycle: Mutex<Option<RunningLoop>>,
  state: Arc<watch::Sender<MonitorState>>,
}

impl AccessProbe {
  /// Initialize the engine behind `checker` and build a stopped probe.
  ///
  /// Updates `ranger_authorizer_initialized` either way.
  ///
  /// # Errors
  /// `MonitorError::Initialization` once every attempt failed; the probe
  /// is then never constructed and can never reach `Running`.
  #[instrument(skip_all, fields(attempts = settings.init_attempts))]
  pub async fn initialize(
    checker: Arc<dyn AccessChecker>,
    settings: ProbeSettings,
    metrics: Arc<MonitorMetrics>,
  ) -> Result<Self, MonitorError> {
    let attempts = settings.init_attempts.max(1);
    let mut attempt = 1;

    loop {
      match checker.initialize().await {
        Ok(()) => {
          metrics.set_authorizer_initialized(true);
          info!(attempt, "Authorization engine initialized");
          return Ok(Self::new(checker, settings, metrics));
        }
        Err(e) if attempt >= attempts => {
          metrics.set_authorizer_initialized(false);
          error!(attempt, error = %e, "Authorization engine failed to initialize");
          return Err(MonitorError::Initialization {
            attempts: attempt,
            source: e,
          });
        }
        Err(e) => {
          let delay = settings
            .init_retry_delay
            .saturating_mul(2u32.saturating_pow(attempt - 1));
          warn!(
            attempt,
            delay_ms = duration_ms(delay),
            error = %e,
            "Authorization engine initialization failed, retrying"
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
      }
    }
  }

  fn new(
    checker: Arc<dyn AccessChecker>,
    settings: ProbeSettings,
    metrics: Arc<MonitorMetrics>,
  ) -> Self {
    info!(
      interval_secs = settings.interval.as_secs_f64(),
      user = %settings.target.user,
      groups = ?settings.target.groups,
      resource = %settings.target.resource,
      "Access probe created"
    );

    let (state, _) = watch::channel(MonitorState::Stopped);
    Self {
      inner: Arc::new(ProbeLoop {
        checker,
        settings,
        metrics,
        stats: ProbeStats::new(),
      }),
      lifecycle: Mutex::new(None),
      state: Arc::new(state),
    }
  }

  /// Launch the probe loop. No-op with a warning unless stopped.
  pub async fn start(&self) {
    let mut lifecycle = self.lifecycle.lock().await;
    if lifecycle
      .as_ref()
      .is_some_and(|running| !running.handle.is_finished())
    {
      warn!(state = ?self.state(), "Access probe is already running");
      return;
    }

    self.state.send_replace(MonitorState::Starting);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let exit = LoopExit {
      state: Arc::clone(&self.state),
      metrics: Arc::clone(&self.inner.metrics),
      cancel_rx: cancel_rx.clone(),
    };
    self.inner.metrics.set_monitor_running(true);
    self.state.send_replace(MonitorState::Running);

    let inner = Arc::clone(&self.inner);
    let handle = tokio::spawn(async move {
      let _exit = exit;
      inner.run(cancel_rx).await;
    });

    *lifecycle = Some(RunningLoop { cancel_tx, handle });
    info!("Access probe started");
  }

  /// Stop the probe loop. No-op with a warning if not running.
  ///
  /// Returns once the loop task has finished; no metric is touched by
  /// the loop afterwards.
  pub async fn stop(&self) {
    let mut lifecycle = self.lifecycle.lock().await;
    let Some(running) = lifecycle.take() else {
      warn!("Access probe is not running");
      return;
    };

    self.state.send_replace(MonitorState::Stopping);
    running.cancel_tx.send_replace(true);

    let mut handle = running.handle;
    let grace = self.inner.settings.stop_grace;
    match tokio::time::timeout(grace, &mut handle).await {
      Ok(Ok(())) => debug!("Probe loop exited"),
      Ok(Err(e)) => warn!(error = %e, "Probe loop task ended abnormally"),
      Err(_) => {
        warn!(
          grace_ms = duration_ms(grace),
          "In-flight access check outlived stop grace, aborting"
        );
        handle.abort();
        let _ = handle.await;
      }
    }

    self.inner.metrics.set_monitor_running(false);
    self.state.send_replace(MonitorState::Stopped);
    drop(lifecycle);
    info!("Access probe stopped");
  }

  pub fn state(&self) -> MonitorState {
    *self.state.borrow()
  }

  pub fn is_running(&self) -> bool {
    self.state() == MonitorState::Running
  }

  /// Watch lifecycle transitions.
  pub fn subscribe_state(&self) -> watch::Receiver<MonitorState> {
    self.state.subscribe()
  }

  pub fn stats(&self) -> ProbeStatsSnapshot {
    self.inner.stats.snapshot()
  }
}

impl ProbeLoop {
  #[instrument(skip_all, name = "access_probe_loop")]
  async fn run(self: Arc<Self>, mut cancel_rx: watch::Receiver<bool>) {
    info!(
      interval_secs = self.settings.interval.as_secs_f64(),
      "Monitoring loop started"
    );

    loop {
      if *cancel_rx.borrow() {
        break;
      }

      self.run_cycle().await;

      debug!(
        interval_secs = self.settings.interval.as_secs_f64(),
        "Sleeping until next access check"
      );
      // Any change (or a dropped sender) means stop.
      tokio::select! {
        biased;
        _ = cancel_rx.changed() => break,
        () = tokio::time::sleep(self.settings.interval) => {}
      }
    }

    info!("Monitoring loop ended");
  }

  async fn run_cycle(&self) {
    let _in_flight = InFlight::enter(&self.metrics.active_access_checks);
    let target = &self.settings.target;

    debug!("Performing periodic access check");
    let started_at = Utc::now();
    let timer = Instant::now();
    let checked = self
      .checker
      .check_access(&target.user, &target.groups, &target.resource)
      .await;
    let elapsed = timer.elapsed();
    let time_taken_ms = duration_ms(elapsed);

    let result = match checked {
      Ok(decision) => {
        self.metrics.record_access_decision(decision, elapsed);
        self.stats.record_decision(decision, elapsed);

        let s = self.stats.snapshot();
        info!(
          result = %decision,
          total = s.total,
          allowed = s.allowed,
          denied = s.denied,
          time_taken_ms,
          average_time_taken_ms = s.average_time_ms,
          min_time_taken_ms = s.min_time_ms,
          max_time_taken_ms = s.max_time_ms,
          "Periodic access check completed"
        );
        ProbeResult::Decided(decision)
      }
      Err(e) => {
        self.metrics.record_access_error();
        self.stats.record_error();
        error!(
          error = %e,
          time_taken_ms,
          "Error during access check in monitoring loop"
        );
        ProbeResult::Error(e.to_string())
      }
    };

    self.stats.set_last_run(ProbeRun {
      started_at,
      result,
      duration: elapsed,
    });
  }
}
