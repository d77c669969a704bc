//! Instrumented Admin Client - Observability Façade
//!
//! Stands in for the engine's real admin client and forwards every
//! operation to it. Around each call it logs, times, classifies the
//! outcome, and records metrics. It never changes what the caller gets
//! back: errors are returned as the same `anyhow::Error`, empty values
//! are returned as the same empty value.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::adapters::metrics::MonitorMetrics;
use crate::domain::admin::{
    Absence, DirectoryEntry, GdsInfo, GrantRevokeRequest, GrantRevokeRoleRequest,
    Role, RoleSnapshot, ServicePolicies, ServiceTags, UserStore,
};
use crate::domain::outcome::{ApiCallOutcome, Expectation};
use crate::domain::probe_stats::duration_ms;
use crate::ports::admin_client::AdminClient;

/// Admin client wrapper that observes every remote call.
pub struct InstrumentedAdminClient<C: AdminClient> {
    inner: C,
    metrics: Arc<MonitorMetrics>,
}

impl<C: AdminClient> InstrumentedAdminClient<C> {
    pub fn new(inner: C, metrics: Arc<MonitorMetrics>) -> Self {
        info!("Instrumented admin client created");
        Self { inner, metrics }
    }

    /// Run one delegated call under observation.
    ///
    /// `describe` renders the `RESPONSE` log suffix from a successful value.
    async fn observe<T, Fut, D>(
        &self,
        method: &'static str,
        params: String,
        expectation: Expectation,
        call: Fut,
        describe: D,
    ) -> anyhow::Result<T>
    where
        T: Absence,
        Fut: Future<Output = anyhow::Result<T>>,
        D: FnOnce(&T) -> String,
    {
        info!(api_method = method, params = %params, "CALL {method} {params}");

        let started = Instant::now();
        let result = call.await;
        let elapsed = started.elapsed();
        let ms = duration_ms(elapsed);

        let outcome = match &result {
            Err(_) => ApiCallOutcome::Failed,
            Ok(value) => expectation.classify(false, value.is_absent()),
        };

        match &result {
            Err(e) => {
                error!(
                    api_method = method,
                    params = %params,
                    duration_ms = ms,
                    error = %e,
                    "Admin API call failed"
                );
                info!(
                    api_method = method,
                    duration_ms = ms,
                    success = false,
                    "RESPONSE {method} duration={ms} success=false"
                );
            }
            Ok(value) => {
                let extra = describe(value);
                if outcome == ApiCallOutcome::AmbiguousEmpty {
                    warn!(
                        api_method = method,
                        params = %params,
                        duration_ms = ms,
                        "Admin API call returned an empty result; \
                         possible swallowed failure (retry exhaustion, 4xx, connection error)"
                    );
                }
                let success = outcome.is_success();
                info!(
                    api_method = method,
                    duration_ms = ms,
                    success,
                    extra = %extra,
                    "RESPONSE {method} duration={ms} success={success} {extra}"
                );
            }
        }

        self.metrics.record_api_call(method, outcome, elapsed);
        result
    }
}

fn has<T>(label: &str, value: &Option<T>) -> String {
    format!("{label}={}", value.is_some())
}

fn count<T>(label: &str, value: &Option<Vec<T>>) -> String {
    format!("{label}={}", value.as_ref().map_or(0, Vec::len))
}

fn nothing<T>(_: &T) -> String {
    String::new()
}

#[async_trait]
impl<C: AdminClient> AdminClient for InstrumentedAdminClient<C> {
    async fn get_service_policies_if_updated(
        &self,
        last_known_version: i64,
        last_activation_time_ms: i64,
    ) -> anyhow::Result<Option<ServicePolicies>> {
        self.observe(
            "getServicePoliciesIfUpdated",
            format!("version={last_known_version}"),
            Expectation::MayBeEmpty,
            self.inner
                .get_service_policies_if_updated(last_known_version, last_activation_time_ms),
            |r| has("hasPolicies", r),
        )
        .await
    }

    async fn get_service_tags_if_updated(
        &self,
        last_known_version: i64,
        last_activation_time_ms: i64,
    ) -> anyhow::Result<Option<ServiceTags>> {
        self.observe(
            "getServiceTagsIfUpdated",
            format!("version={last_known_version}"),
            Expectation::MayBeEmpty,
            self.inner
                .get_service_tags_if_updated(last_known_version, last_activation_time_ms),
            |r| has("hasTags", r),
        )
        .await
    }

    async fn get_roles_if_updated(
        &self,
        last_known_role_version: i64,
        last_activation_time_ms: i64,
    ) -> anyhow::Result<Option<RoleSnapshot>> {
        self.observe(
            "getRolesIfUpdated",
            format!("version={last_known_role_version}"),
            Expectation::MayBeEmpty,
            self.inner
                .get_roles_if_updated(last_known_role_version, last_activation_time_ms),
            |r| has("hasRoles", r),
        )
        .await
    }

    async fn get_user_store_if_updated(
        &self,
        last_known_user_store_version: i64,
        last_activation_time_ms: i64,
    ) -> anyhow::Result<Option<UserStore>> {
        self.observe(
            "getUserStoreIfUpdated",
            format!("version={last_known_user_store_version}"),
            Expectation::MayBeEmpty,
            self.inner.get_user_store_if_updated(
                last_known_user_store_version,
                last_activation_time_ms,
            ),
            |r| has("hasUserStore", r),
        )
        .await
    }

    async fn get_gds_info_if_updated(
        &self,
        last_known_version: i64,
        last_activation_time_ms: i64,
    ) -> anyhow::Result<Option<GdsInfo>> {
        self.observe(
            "getGdsInfoIfUpdated",
            format!("version={last_known_version}"),
            Expectation::MayBeEmpty,
            self.inner
                .get_gds_info_if_updated(last_known_version, last_activation_time_ms),
            |r| has("hasGdsInfo", r),
        )
        .await
    }

    async fn create_role(&self, request: &Role) -> anyhow::Result<Option<Role>> {
        self.observe(
            "createRole",
            format!("roleName={}", request.name),
            Expectation::Present,
            self.inner.create_role(request),
            |r| has("hasRole", r),
        )
        .await
    }

    async fn drop_role(&self, exec_user: &str, role_name: &str) -> anyhow::Result<()> {
        self.observe(
            "dropRole",
            format!("roleName={role_name}, execUser={exec_user}"),
            Expectation::MayBeEmpty,
            self.inner.drop_role(exec_user, role_name),
            nothing,
        )
        .await
    }

    async fn get_user_roles(&self, exec_user: &str) -> anyhow::Result<Option<Vec<String>>> {
        self.observe(
            "getUserRoles",
            format!("execUser={exec_user}"),
            Expectation::Present,
            self.inner.get_user_roles(exec_user),
            |r| count("rolesCount", r),
        )
        .await
    }

    async fn get_all_roles(&self, exec_user: &str) -> anyhow::Result<Option<Vec<String>>> {
        self.observe(
            "getAllRoles",
            format!("execUser={exec_user}"),
            Expectation::Present,
            self.inner.get_all_roles(exec_user),
            |r| count("rolesCount", r),
        )
        .await
    }

    async fn get_role(&self, exec_user: &str, role_name: &str) -> anyhow::Result<Option<Role>> {
        self.observe(
            "getRole",
            format!("roleName={role_name}, execUser={exec_user}"),
            Expectation::Present,
            self.inner.get_role(exec_user, role_name),
            |r| has("hasRole", r),
        )
        .await
    }

    async fn grant_role(&self, request: &GrantRevokeRoleRequest) -> anyhow::Result<()> {
        self.observe(
            "grantRole",
            format!("grantor={}, targetRoles={:?}", request.grantor, request.target_roles),
            Expectation::MayBeEmpty,
            self.inner.grant_role(request),
            nothing,
        )
        .await
    }

    async fn revoke_role(&self, request: &GrantRevokeRoleRequest) -> anyhow::Result<()> {
        self.observe(
            "revokeRole",
            format!("grantor={}, targetRoles={:?}", request.grantor, request.target_roles),
            Expectation::MayBeEmpty,
            self.inner.revoke_role(request),
            nothing,
        )
        .await
    }

    async fn grant_access(&self, request: &GrantRevokeRequest) -> anyhow::Result<()> {
        self.observe(
            "grantAccess",
            format!("grantor={}, accessTypes={:?}", request.grantor, request.access_types),
            Expectation::MayBeEmpty,
            self.inner.grant_access(request),
            nothing,
        )
        .await
    }

    async fn revoke_access(&self, request: &GrantRevokeRequest) -> anyhow::Result<()> {
        self.observe(
            "revokeAccess",
            format!("grantor={}, accessTypes={:?}", request.grantor, request.access_types),
            Expectation::MayBeEmpty,
            self.inner.revoke_access(request),
            nothing,
        )
        .await
    }

    async fn get_tag_types(&self, pattern: &str) -> anyhow::Result<Option<Vec<String>>> {
        self.observe(
            "getTagTypes",
            format!("pattern={pattern}"),
            Expectation::Present,
            self.inner.get_tag_types(pattern),
            |r| count("tagTypesCount", r),
        )
        .await
    }

    async fn get_groups(&self) -> anyhow::Result<Option<Vec<DirectoryEntry>>> {
        self.observe(
            "getGroups",
            String::new(),
            Expectation::Present,
            self.inner.get_groups(),
            |r| count("groupsCount", r),
        )
        .await
    }

    async fn get_users_by_group(
        &self,
        group_name: &str,
    ) -> anyhow::Result<Option<Vec<DirectoryEntry>>> {
        self.observe(
            "getUsersByGroup",
            format!("groupName={group_name}"),
            Expectation::Present,
            self.inner.get_users_by_group(group_name),
            |r| count("usersCount", r),
        )
        .await
    }

    async fn get_groups_for_user(
        &self,
        user_name: &str,
    ) -> anyhow::Result<Option<Vec<DirectoryEntry>>> {
        self.observe(
            "getGroupsForUser",
            format!("username={user_name}"),
            Expectation::Present,
            self.inner.get_groups_for_user(user_name),
            |r| count("groupsCount", r),
        )
        .await
    }

    async fn get_user_info_by_email_address(
        &self,
        email_address: &str,
    ) -> anyhow::Result<Option<DirectoryEntry>> {
        self.observe(
            "getUserInfoByEmailAddress",
            format!("emailAddress={email_address}"),
            Expectation::Present,
            self.inner.get_user_info_by_email_address(email_address),
            |r| has("hasUserInfo", r),
        )
        .await
    }

    async fn get_user_attributes_for_user_name(
        &self,
        user_name: &str,
    ) -> anyhow::Result<Option<HashMap<String, String>>> {
        self.observe(
            "getUserAttributesForUserName",
            format!("userName={user_name}"),
            Expectation::Present,
            self.inner.get_user_attributes_for_user_name(user_name),
            |r| format!("attributesCount={}", r.as_ref().map_or(0, HashMap::len)),
        )
        .await
    }

    async fn get_users_without_groups(&self) -> anyhow::Result<Option<Vec<DirectoryEntry>>> {
        // An empty answer is the healthy steady state here.
        self.observe(
            "getUsersWithoutGroups",
            String::new(),
            Expectation::MayBeEmpty,
            self.inner.get_users_without_groups(),
            |r| count("usersCount", r),
        )
        .await
    }
}
