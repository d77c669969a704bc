//! Configuration Module - TOML-based Monitor Configuration
//!
//! Loads configuration from `config.toml`; every field has a default so
//! an absent file or section yields a runnable monitor. Precedence is
//! CLI flag > environment > file > default, resolved in `main`.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::domain::access::{DEFAULT_CLUSTER_NAME, ProbeTarget, ResourceTuple};
use crate::error::AccessError;

/// Default seconds between probe cycles.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Default metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 6085;

/// Environment variable overriding `[metrics].port`.
pub const METRICS_PORT_ENV: &str = "METRICS_PORT";

/// Top-level monitor configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  #[serde(default)]
  pub monitor: MonitorConfig,
  /// Synthetic access check parameters.
  #[serde(default)]
  pub probe: ProbeConfig,
  #[serde(default)]
  pub metrics: MetricsConfig,
  /// Authorization engine endpoint.
  #[serde(default)]
  pub authz: AuthzConfig,
}

/// Process identity and logging.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// Probe target and cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
  #[serde(default = "default_user")]
  pub user: String,
  #[serde(default)]
  pub groups: Vec<String>,
  #[serde(default = "default_database")]
  pub database: String,
  #[serde(default = "default_table")]
  pub table: Option<String>,
  #[serde(default = "default_column")]
  pub column: Option<String>,
  /// Seconds between cycles. Any TOML value parses; `resolve_interval`
  /// replaces unusable ones with the default.
  #[serde(default)]
  pub interval_seconds: Option<RawInterval>,
  /// Bounded wait for an in-flight cycle on stop.
  #[serde(default = "default_stop_grace_ms")]
  pub stop_grace_ms: u64,
  #[serde(default = "default_init_attempts")]
  pub init_attempts: u32,
  /// First retry delay; doubles on every further attempt.
  #[serde(default = "default_init_retry_delay_ms")]
  pub init_retry_delay_ms: u64,
}

/// Metrics exporter binding.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  #[serde(default = "default_bind_host")]
  pub bind_host: String,
  #[serde(default = "default_metrics_port")]
  pub port: u16,
}

/// Authorization engine HTTP endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthzConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Request timeout in milliseconds.
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  #[serde(default = "default_cluster_name")]
  pub cluster_name: String,
}

/// Interval as written by an operator: a number, or text from a flag.
/// Any other TOML value (float, bool, table) lands in `Other`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawInterval {
  Seconds(i64),
  Text(String),
  Other(toml::Value),
}

impl ProbeConfig {
  /// Normalized probe target.
  pub fn target(&self) -> Result<ProbeTarget, AccessError> {
    Ok(ProbeTarget {
      user: self.user.clone(),
      groups: self.groups.clone(),
      resource: ResourceTuple::new(
        &self.database,
        self.table.as_deref(),
        self.column.as_deref(),
      )?,
    })
  }

  pub fn stop_grace(&self) -> Duration {
    Duration::from_millis(self.stop_grace_ms)
  }

  pub fn init_retry_delay(&self) -> Duration {
    Duration::from_millis(self.init_retry_delay_ms)
  }
}

impl MetricsConfig {
  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.bind_host, self.port)
  }
}

/// Resolve the probe interval, falling back to 60s on bad input.
///
/// Non-positive and unparseable values are logged and replaced.
pub fn resolve_interval(raw: Option<&RawInterval>) -> Duration {
  let default = Duration::from_secs(DEFAULT_INTERVAL_SECS);
  let seconds = match raw {
    None => return default,
    Some(RawInterval::Seconds(s)) => *s,
    Some(RawInterval::Text(text)) => match text.trim().parse::<i64>() {
      Ok(s) => s,
      Err(_) => {
        warn!(
          value = %text,
          default_secs = DEFAULT_INTERVAL_SECS,
          "Invalid interval format, using default"
        );
        return default;
      }
    },
    Some(RawInterval::Other(value)) => {
      warn!(
        value = %value,
        default_secs = DEFAULT_INTERVAL_SECS,
        "Invalid interval format, using default"
      );
      return default;
    }
  };

  match u64::try_from(seconds) {
    Ok(s) if s > 0 => Duration::from_secs(s),
    _ => {
      warn!(
        value = seconds,
        default_secs = DEFAULT_INTERVAL_SECS,
        "Interval must be positive, using default"
      );
      default
    }
  }
}

/// Apply a `METRICS_PORT` override. Unparseable or zero values are ignored.
pub fn resolve_metrics_port(env_value: Option<&str>, configured: u16) -> u16 {
  let Some(raw) = env_value.map(str::trim).filter(|v| !v.is_empty()) else {
    return configured;
  };
  match raw.parse::<u16>() {
    Ok(port) if port > 0 => port,
    _ => {
      warn!(
        value = %raw,
        using = configured,
        "Invalid {METRICS_PORT_ENV} environment variable"
      );
      configured
    }
  }
}

impl Default for MonitorConfig {
  fn default() -> Self {
    Self {
      name: default_name(),
      log_level: default_log_level(),
    }
  }
}

impl Default for ProbeConfig {
  fn default() -> Self {
    Self {
      user: default_user(),
      groups: Vec::new(),
      database: default_database(),
      table: default_table(),
      column: default_column(),
      interval_seconds: None,
      stop_grace_ms: default_stop_grace_ms(),
      init_attempts: default_init_attempts(),
      init_retry_delay_ms: default_init_retry_delay_ms(),
    }
  }
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      bind_host: default_bind_host(),
      port: default_metrics_port(),
    }
  }
}

impl Default for AuthzConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_ms: default_timeout_ms(),
      cluster_name: default_cluster_name(),
    }
  }
}

// Default value functions for serde

fn default_name() -> String {
  "ranger-monitor".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_user() -> String {
  "test_user1".to_string()
}

fn default_database() -> String {
  "test_db1".to_string()
}

fn default_table() -> Option<String> {
  Some("test_table1".to_string())
}

fn default_column() -> Option<String> {
  Some("test_col1".to_string())
}

fn default_stop_grace_ms() -> u64 {
  5_000
}

fn default_init_attempts() -> u32 {
  3
}

fn default_init_retry_delay_ms() -> u64 {
  2_000
}

fn default_bind_host() -> String {
  "0.0.0.0".to_string()
}

fn default_metrics_port() -> u16 {
  DEFAULT_METRICS_PORT
}

fn default_base_url() -> String {
  "http://127.0.0.1:6080".to_string()
}

fn default_timeout_ms() -> u64 {
  5_000
}

fn default_cluster_name() -> String {
  DEFAULT_CLUSTER_NAME.to_string()
}
