//! Admin-client payload types.
//!
//! Mirrors the payloads the engine's remote administration API hands
//! back: versioned policy/tag/role/user-store/GDS snapshots, role
//! records, and grant/revoke requests. Fields beyond what monitoring
//! needs are kept as opaque JSON.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Loosely-typed user or group record as returned by the user-sync endpoints.
pub type DirectoryEntry = HashMap<String, Value>;

/// Policy snapshot for one service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePolicies {
    pub service_name: String,
    pub policy_version: Option<i64>,
    #[serde(default)]
    pub policies: Vec<Value>,
}

/// Tag snapshot for one service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTags {
    pub service_name: String,
    pub tag_version: Option<i64>,
    #[serde(default)]
    pub tags: Vec<Value>,
}

/// Role snapshot for one service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSnapshot {
    pub service_name: String,
    pub role_version: Option<i64>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// User/group membership snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStore {
    pub user_store_version: Option<i64>,
    #[serde(default)]
    pub user_groups: HashMap<String, Vec<String>>,
}

/// Governed data sharing (GDS) snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GdsInfo {
    pub service_name: String,
    pub gds_version: Option<i64>,
    #[serde(default)]
    pub datasets: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Grant or revoke privileges on a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRevokeRequest {
    pub grantor: String,
    #[serde(default)]
    pub resource: HashMap<String, String>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub access_types: Vec<String>,
}

/// Grant or revoke role membership.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRevokeRoleRequest {
    pub grantor: String,
    #[serde(default)]
    pub target_roles: Vec<String>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Whether a returned value counts as "nothing came back".
///
/// `None` and empty collections are absent. Snapshot payloads are never
/// absent once present, even when their inner lists are empty.
pub trait Absence {
    fn is_absent(&self) -> bool;
}

impl Absence for () {
    fn is_absent(&self) -> bool {
        false
    }
}

impl<T: Absence> Absence for Option<T> {
    fn is_absent(&self) -> bool {
        self.as_ref().is_none_or(Absence::is_absent)
    }
}

impl<T> Absence for Vec<T> {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V, S> Absence for HashMap<K, V, S> {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

macro_rules! never_absent {
    ($($ty:ty),+ $(,)?) => {
        $(impl Absence for $ty {
            fn is_absent(&self) -> bool {
                false
            }
        })+
    };
}

never_absent!(ServicePolicies, ServiceTags, RoleSnapshot, UserStore, GdsInfo, Role);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_absent() {
        let v: Option<Role> = None;
        assert!(v.is_absent());
    }

    #[test]
    fn test_empty_collection_is_absent() {
        assert!(Some(Vec::<String>::new()).is_absent());
        assert!(Some(HashMap::<String, String>::new()).is_absent());
        assert!(!Some(vec!["admin".to_string()]).is_absent());
    }

    #[test]
    fn test_snapshot_with_no_policies_is_present() {
        let snapshot = Some(ServicePolicies {
            service_name: "hive".to_string(),
            policy_version: Some(4),
            policies: vec![],
        });
        assert!(!snapshot.is_absent());
    }

    #[test]
    fn test_unit_never_absent() {
        assert!(!().is_absent());
    }
}
