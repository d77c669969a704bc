//! Access Checker Port - Authorization Engine Decision Interface
//!
//! The probe loop depends only on this trait. The engine behind it
//! (policy evaluation, policy refresh, audit) is opaque.

use async_trait::async_trait;

use crate::domain::access::{AccessDecision, ResourceTuple};
use crate::error::{AccessError, InitError};

/// Trait for authorization engines the probe can exercise.
#[async_trait]
pub trait AccessChecker: Send + Sync + 'static {
  /// Bring the engine up. Must succeed before `check_access` is meaningful.
  async fn initialize(&self) -> Result<(), InitError>;

  /// Evaluate whether `user` (member of `groups`) may access `resource`.
  ///
  /// # Errors
  /// Any `AccessError` is a probe failure: counted and logged by the
  /// caller, never fatal to the loop.
  async fn check_access(
    &self,
    user: &str,
    groups: &[String],
    resource: &ResourceTuple,
  ) -> Result<AccessDecision, AccessError>;
}
