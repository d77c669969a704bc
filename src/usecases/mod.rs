//! Use Cases Layer - Monitoring Workflows
//!
//! Orchestrates the ports and metrics adapters into the long-running
//! monitoring behavior.
//!
//! Use cases:
//! - `AccessProbe`: periodic synthetic access checks with start/stop lifecycle

pub mod access_probe;

pub use access_probe::{AccessProbe, MonitorState, ProbeSettings};
