//! Authorization Engine Adapters
//!
//! Concrete `AccessChecker` implementations the probe can drive.

pub mod http_checker;

pub use http_checker::HttpAccessChecker;
