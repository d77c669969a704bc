//! Admin Client Port - Remote Administration API of the Engine
//!
//! Every operation the engine's policy-refresh machinery performs
//! against its admin server. Nullable results are `Option`s: the real
//! client returns `None` both for legitimate "nothing to report" and for
//! failures it swallowed internally (retry exhaustion, some 4xx,
//! post-retry connection errors).

use async_trait::async_trait;

use crate::domain::admin::{
  DirectoryEntry, GdsInfo, GrantRevokeRequest, GrantRevokeRoleRequest, Role,
  RoleSnapshot, ServicePolicies, ServiceTags, UserStore,
};

/// Remote administration client of the authorization engine.
///
/// The `*_if_updated` downloads return `None` when nothing changed since
/// `last_known_version`.
#[async_trait]
pub trait AdminClient: Send + Sync + 'static {
  async fn get_service_policies_if_updated(
    &self,
    last_known_version: i64,
    last_activation_time_ms: i64,
  ) -> anyhow::Result<Option<ServicePolicies>>;

  async fn get_service_tags_if_updated(
    &self,
    last_known_version: i64,
    last_activation_time_ms: i64,
  ) -> anyhow::Result<Option<ServiceTags>>;

  async fn get_roles_if_updated(
    &self,
    last_known_role_version: i64,
    last_activation_time_ms: i64,
  ) -> anyhow::Result<Option<RoleSnapshot>>;

  async fn get_user_store_if_updated(
    &self,
    last_known_user_store_version: i64,
    last_activation_time_ms: i64,
  ) -> anyhow::Result<Option<UserStore>>;

  async fn get_gds_info_if_updated(
    &self,
    last_known_version: i64,
    last_activation_time_ms: i64,
  ) -> anyhow::Result<Option<GdsInfo>>;

  async fn create_role(&self, request: &Role) -> anyhow::Result<Option<Role>>;

  async fn drop_role(&self, exec_user: &str, role_name: &str) -> anyhow::Result<()>;

  async fn get_user_roles(&self, exec_user: &str) -> anyhow::Result<Option<Vec<String>>>;

  async fn get_all_roles(&self, exec_user: &str) -> anyhow::Result<Option<Vec<String>>>;

  async fn get_role(&self, exec_user: &str, role_name: &str) -> anyhow::Result<Option<Role>>;

  async fn grant_role(&self, request: &GrantRevokeRoleRequest) -> anyhow::Result<()>;

  async fn revoke_role(&self, request: &GrantRevokeRoleRequest) -> anyhow::Result<()>;

  async fn grant_access(&self, request: &GrantRevokeRequest) -> anyhow::Result<()>;

  async fn revoke_access(&self, request: &GrantRevokeRequest) -> anyhow::Result<()>;

  async fn get_tag_types(&self, pattern: &str) -> anyhow::Result<Option<Vec<String>>>;

  async fn get_groups(&self) -> anyhow::Result<Option<Vec<DirectoryEntry>>>;

  async fn get_users_by_group(
    &self,
    group_name: &str,
  ) -> anyhow::Result<Option<Vec<DirectoryEntry>>>;

  async fn get_groups_for_user(
    &self,
    user_name: &str,
  ) -> anyhow::Result<Option<Vec<DirectoryEntry>>>;

  async fn get_user_info_by_email_address(
    &self,
    email_address: &str,
  ) -> anyhow::Result<Option<DirectoryEntry>>;

  async fn get_user_attributes_for_user_name(
    &self,
    user_name: &str,
  ) -> anyhow::Result<Option<std::collections::HashMap<String, String>>>;

  async fn get_users_without_groups(&self) -> anyhow::Result<Option<Vec<DirectoryEntry>>>;
}
