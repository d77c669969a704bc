//! Monitor Instruments - The Fixed Metric Set
//!
//! Access-check metrics carry no labels to keep cardinality at one
//! series each. Admin-API metrics are labelled by method name (a closed
//! set of 21) and status (`success` / `error`).

use std::time::Duration;

use tracing::info;

use super::registry::{Counter, Gauge, Histogram, MetricsRegistry};
use crate::domain::access::AccessDecision;
use crate::domain::outcome::ApiCallOutcome;
use crate::error::MetricsError;

/// Access-check latency buckets (milliseconds).
pub const ACCESS_CHECK_BUCKETS_MS: [f64; 8] =
    [10.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0];

/// Admin-API latency buckets (milliseconds).
pub const API_CALL_BUCKETS_MS: [f64; 9] =
    [10.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0];

/// Handles to every instrument the monitor updates.
///
/// Construct once per process and share via `Arc`: the names are
/// registered in the given registry, so a second construction against
/// the same registry returns the same underlying series.
#[derive(Clone)]
pub struct MonitorMetrics {
    /// Decided access checks (allowed + denied).
    pub access_checks_total: Counter,
    pub access_allowed_total: Counter,
    pub access_denied_total: Counter,
    /// Probe cycles whose check raised an error.
    pub access_check_errors_total: Counter,
    pub access_check_duration_ms: Histogram,
    /// Checks currently in flight.
    pub active_access_checks: Gauge,
    /// Labels: `api_method`, `status`.
    pub api_calls_total: Counter,
    /// Labels: `api_method`.
    pub api_errors_total: Counter,
    /// Labels: `api_method`.
    pub api_duration_ms: Histogram,
    /// 1 while the probe loop is running.
    pub monitoring_plugin_running: Gauge,
    /// 1 once the authorization engine initialized.
    pub authorizer_initialized: Gauge,
}

impl MonitorMetrics {
    /// Register (or look up) the full instrument set.
    pub fn new(registry: &MetricsRegistry) -> Result<Self, MetricsError> {
        let metrics = Self {
            access_checks_total: registry.counter(
                "ranger_access_checks_total",
                "Total number of access checks performed",
                &[],
            )?,
            access_allowed_total: registry.counter(
                "ranger_access_allowed_total",
                "Total number of access checks that were allowed",
                &[],
            )?,
            access_denied_total: registry.counter(
                "ranger_access_denied_total",
                "Total number of access checks that were denied",
                &[],
            )?,
            access_check_errors_total: registry.counter(
                "ranger_access_check_errors_total",
                "Total number of errors during access checks",
                &[],
            )?,
            access_check_duration_ms: registry.histogram(
                "ranger_access_check_duration_ms",
                "Duration of access checks in milliseconds",
                &ACCESS_CHECK_BUCKETS_MS,
                &[],
            )?,
            active_access_checks: registry.gauge(
                "ranger_active_access_checks",
                "Number of currently active access checks",
                &[],
            )?,
            api_calls_total: registry.counter(
                "ranger_api_calls_total",
                "Total number of Ranger Admin API calls",
                &["api_method", "status"],
            )?,
            api_errors_total: registry.counter(
                "ranger_api_errors_total",
                "Total number of Ranger Admin API errors",
                &["api_method"],
            )?,
            api_duration_ms: registry.histogram(
                "ranger_api_duration_ms",
                "Duration of Ranger Admin API calls in milliseconds",
                &API_CALL_BUCKETS_MS,
                &["api_method"],
            )?,
            monitoring_plugin_running: registry.gauge(
                "ranger_monitoring_plugin_running",
                "Whether the monitoring plugin is running (1 = running, 0 = stopped)",
                &[],
            )?,
            authorizer_initialized: registry.gauge(
                "ranger_authorizer_initialized",
                "Whether the authorizer is initialized (1 = initialized, 0 = not initialized)",
                &[],
            )?,
        };

        // Unlabelled series are exported from the first scrape, at zero.
        for counter in [
            &metrics.access_checks_total,
            &metrics.access_allowed_total,
            &metrics.access_denied_total,
            &metrics.access_check_errors_total,
        ] {
            counter.touch(&[]);
        }
        metrics.access_check_duration_ms.touch(&[]);
        metrics.active_access_checks.touch(&[]);
        metrics.monitoring_plugin_running.touch(&[]);
        metrics.authorizer_initialized.touch(&[]);

        info!("Monitor metrics registered");
        Ok(metrics)
    }

    /// Record a decided probe: total, allowed|denied, and latency.
    pub fn record_access_decision(&self, decision: AccessDecision, elapsed: Duration) {
        self.access_checks_total.inc(&[]);
        match decision {
            AccessDecision::Allowed => self.access_allowed_total.inc(&[]),
            AccessDecision::Denied => self.access_denied_total.inc(&[]),
        }
        self.access_check_duration_ms.observe(as_millis_f64(elapsed), &[]);
    }

    pub fn record_access_error(&self) {
        self.access_check_errors_total.inc(&[]);
    }

    /// Record one intercepted admin call. Error counter moves for both
    /// `Failed` and `AmbiguousEmpty`; duration is always observed.
    pub fn record_api_call(&self, method: &str, outcome: ApiCallOutcome, elapsed: Duration) {
        let status = outcome.status_label();
        self.api_calls_total.inc(&[method, status]);
        if !outcome.is_success() {
            self.api_errors_total.inc(&[method]);
        }
        self.api_duration_ms.observe(as_millis_f64(elapsed), &[method]);
    }

    pub fn set_monitor_running(&self, running: bool) {
        self.monitoring_plugin_running.set(flag(running), &[]);
    }

    pub fn set_authorizer_initialized(&self, initialized: bool) {
        self.authorizer_initialized.set(flag(initialized), &[]);
    }

    /// Readiness as seen by `/ready`: loop running and engine initialized.
    pub fn is_ready(&self) -> bool {
        self.monitoring_plugin_running.get(&[]) >= 1.0
            && self.authorizer_initialized.get(&[]) >= 1.0
    }
}

fn flag(on: bool) -> f64 {
    if on { 1.0 } else { 0.0 }
}

fn as_millis_f64(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}
