//! HTTP Access Checker - Engine Sidecar Adapter
//!
//! Implements the `AccessChecker` port against an authorization engine
//! exposed over HTTP:
//! - `GET  {base_url}/status`    - 2xx once the engine loaded its policies
//! - `POST {base_url}/authorize` - JSON `AccessRequest` in, `{"allowed": bool}` out
//!
//! Retries are left to the probe cadence; one failed check is one
//! counted probe failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::config::AuthzConfig;
use crate::domain::access::{AccessDecision, AccessRequest, ResourceTuple};
use crate::error::{AccessError, InitError};
use crate::ports::access_checker::AccessChecker;

#[derive(Debug, Deserialize)]
struct AuthorizeResponse {
    allowed: bool,
}

/// `AccessChecker` backed by the engine's HTTP decision endpoint.
pub struct HttpAccessChecker {
    http: Client,
    base_url: String,
    cluster_name: String,
    initialized: AtomicBool,
}

impl HttpAccessChecker {
    /// Build the checker. No network traffic happens until `initialize()`.
    pub fn new(config: &AuthzConfig) -> Result<Self, InitError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| InitError::Rejected(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cluster_name: config.cluster_name.clone(),
            initialized: AtomicBool::new(false),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }
}

#[async_trait]
impl AccessChecker for HttpAccessChecker {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn initialize(&self) -> Result<(), InitError> {
        let url = format!("{}/status", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| InitError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InitError::Rejected(format!("status endpoint returned {status}: {body}")));
        }

        self.initialized.store(true, Ordering::Release);
        info!("Authorization engine initialized");
        Ok(())
    }

    async fn check_access(
        &self,
        user: &str,
        groups: &[String],
        resource: &ResourceTuple,
    ) -> Result<AccessDecision, AccessError> {
        if !self.is_initialized() {
            return Err(AccessError::NotInitialized);
        }

        let request = AccessRequest::select(user, groups, resource, &self.cluster_name);
        debug!(user, resource = %resource, "Sending access request");

        let response = self
            .http
            .post(format!("{}/authorize", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| AccessError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AccessError::Evaluation(format!("engine returned {status}: {body}")));
        }

        let decision: AuthorizeResponse = response
            .json()
            .await
            .map_err(|e| AccessError::Evaluation(format!("malformed decision: {e}")))?;

        Ok(AccessDecision::from_allowed(decision.allowed))
    }
}
