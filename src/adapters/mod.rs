//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements or wraps the port traits defined in `crate::ports` with
//! concrete infrastructure (HTTP, Prometheus).
//!
//! Adapter categories:
//! - `admin`: instrumented façade over the engine's admin client
//! - `authz`: HTTP-backed access checker
//! - `metrics`: instrument registry, `/metrics` exporter, health checks

pub mod admin;
pub mod authz;
pub mod metrics;
