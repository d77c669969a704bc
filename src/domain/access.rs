//! Synthetic access-check request types.
//!
//! The probe always asks the same question: may `user` run a `select`
//! query against `database[.table[.column]]`? Resource names are
//! normalized exactly once, at construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AccessError;

/// Access type requested by every probe.
pub const ACCESS_TYPE_SELECT: &str = "select";

/// Action name attached to every probe request.
pub const ACTION_QUERY: &str = "query";

/// Cluster name reported to the engine unless configured otherwise.
pub const DEFAULT_CLUSTER_NAME: &str = "api-service";

/// Outcome of a successful access evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessDecision {
    Allowed,
    Denied,
}

impl AccessDecision {
    pub fn from_allowed(allowed: bool) -> Self {
        if allowed { Self::Allowed } else { Self::Denied }
    }
}

impl std::fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allowed => write!(f, "ALLOWED"),
            Self::Denied => write!(f, "DENIED"),
        }
    }
}

/// Hierarchical resource being probed.
///
/// Database is mandatory; table and column narrow the resource when
/// present. All parts are trimmed and lower-cased, and blank optional
/// parts are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTuple {
    database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column: Option<String>,
}

impl ResourceTuple {
    /// Build a normalized resource.
    ///
    /// # Errors
    /// `AccessError::InvalidRequest` when the database is blank.
    pub fn new(
        database: &str,
        table: Option<&str>,
        column: Option<&str>,
    ) -> Result<Self, AccessError> {
        let database = normalize(Some(database)).ok_or_else(|| {
            AccessError::InvalidRequest("database cannot be null or empty".to_string())
        })?;

        Ok(Self {
            database,
            table: normalize(table),
            column: normalize(column),
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }
}

impl std::fmt::Display for ResourceTuple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.database)?;
        if let Some(table) = &self.table {
            write!(f, ".{table}")?;
            if let Some(column) = &self.column {
                write!(f, ".{column}")?;
            }
        } else if let Some(column) = &self.column {
            write!(f, ".*.{column}")?;
        }
        Ok(())
    }
}

fn normalize(part: Option<&str>) -> Option<String> {
    part.map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_lowercase)
}

/// Fixed identity and resource the probe checks on every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub user: String,
    pub groups: Vec<String>,
    pub resource: ResourceTuple,
}

/// Wire form of a single access request sent to the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest<'a> {
    pub user: &'a str,
    pub user_groups: &'a [String],
    pub resource: &'a ResourceTuple,
    pub access_type: &'static str,
    pub action: &'static str,
    pub cluster_name: &'a str,
    pub access_time: DateTime<Utc>,
}

impl<'a> AccessRequest<'a> {
    /// Build a `select`/`query` request stamped with the current time.
    pub fn select(
        user: &'a str,
        user_groups: &'a [String],
        resource: &'a ResourceTuple,
        cluster_name: &'a str,
    ) -> Self {
        Self {
            user,
            user_groups,
            resource,
            access_type: ACCESS_TYPE_SELECT,
            action: ACTION_QUERY,
            cluster_name,
            access_time: Utc::now(),
        }
    }
}
