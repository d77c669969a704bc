//! Admin Client Adapters
//!
//! `InstrumentedAdminClient` is composed over any `AdminClient` and is
//! itself an `AdminClient`, so the engine's policy refresher can be
//! handed the façade wherever it expects the real client.

pub mod instrumented;

pub use instrumented::InstrumentedAdminClient;
