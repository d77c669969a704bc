//! Metrics and Monitoring Adapters
//!
//! The Prometheus-backed instrument registry, the fixed monitor
//! instrument set, and the axum 0.7 exporter serving `/metrics`,
//! `/live`, and `/ready`.

pub mod exporter;
pub mod health;
pub mod instruments;
pub mod registry;

pub use exporter::MetricsServer;
pub use instruments::MonitorMetrics;
pub use registry::{Counter, Gauge, Histogram, MetricsRegistry};
