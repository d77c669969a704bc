//! Domain Layer - Monitoring Value Types
//!
//! Pure types with no I/O: the synthetic access request, admin-client
//! payloads, call-outcome classification, and running probe statistics.

pub mod access;
pub mod admin;
pub mod outcome;
pub mod probe_stats;

pub use access::{AccessDecision, ProbeTarget, ResourceTuple};
pub use outcome::{ApiCallOutcome, Expectation};
pub use probe_stats::{ProbeRun, ProbeStats, ProbeStatsSnapshot};
