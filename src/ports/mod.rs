//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Interfaces the monitoring core needs from the authorization engine.
//! Adapters implement these traits; the façade both consumes and
//! implements `AdminClient`.
//!
//! Port categories:
//! - `AccessChecker`: engine initialization and access decisions
//! - `AdminClient`: the engine's remote administration API

pub mod access_checker;
pub mod admin_client;

pub use access_checker::AccessChecker;
pub use admin_client::AdminClient;
