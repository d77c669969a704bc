//! Error Taxonomy - Typed Failures for the Monitoring Core
//!
//! Each failure class has a fixed propagation policy:
//! - `InitError`: engine could not initialize; fatal to startup
//! - `AccessError`: one probe failed; logged, counted, loop continues
//! - `MetricsError` / `ExporterError`: observability setup failed; fatal,
//!   surfaced by the binary with context
//! - `MonitorError`: the monitor could not be brought up
//!
//! Remote admin-call failures have no variant here: the façade returns
//! the wrapped client's own error untouched.

use thiserror::Error;

/// Failure raised by the authorization engine while initializing.
#[derive(Debug, Error)]
pub enum InitError {
  /// The engine (or its sidecar) could not be reached.
  #[error("authorization engine unavailable: {0}")]
  Unavailable(String),
  /// The engine answered but refused to come up.
  #[error("authorization engine rejected initialization: {0}")]
  Rejected(String),
}

/// Failure of a single access check.
#[derive(Debug, Error)]
pub enum AccessError {
  /// Check attempted before a successful `initialize()`.
  #[error("authorization engine is not initialized")]
  NotInitialized,
  /// The synthetic request itself is malformed.
  #[error("invalid access request: {0}")]
  InvalidRequest(String),
  /// The request never reached the engine.
  #[error("transport failure: {0}")]
  Transport(String),
  /// The engine reported an evaluation failure.
  #[error("access evaluation failed: {0}")]
  Evaluation(String),
}

/// Registry-level failures.
#[derive(Debug, Error)]
pub enum MetricsError {
  /// A metric name was re-registered with a different kind, label set, or buckets.
  #[error("metric `{name}` already registered as {existing}, requested {requested}")]
  ShapeConflict {
    name: String,
    existing: String,
    requested: String,
  },
  /// Histogram buckets empty or not strictly ascending.
  #[error("histogram `{name}` needs a non-empty, strictly ascending bucket list")]
  InvalidBuckets { name: String },
  #[error("prometheus: {0}")]
  Prometheus(#[from] prometheus::Error),
  #[error("exposition output is not valid UTF-8")]
  Encoding(#[from] std::string::FromUtf8Error),
}

/// Failures starting the metrics HTTP endpoint.
#[derive(Debug, Error)]
pub enum ExporterError {
  /// Port already in use, permission denied, etc.
  #[error("failed to bind metrics endpoint on {addr}: {source}")]
  Bind {
    addr: String,
    #[source]
    source: std::io::Error,
  },
}

/// Top-level failures of the monitor lifecycle.
#[derive(Debug, Error)]
pub enum MonitorError {
  #[error("authorization engine failed to initialize after {attempts} attempt(s)")]
  Initialization {
    attempts: u32,
    #[source]
    source: InitError,
  },
}
