//! Metrics Exporter - Pull-based `/metrics` Endpoint
//!
//! Serves the registry in the Prometheus text exposition format via
//! axum 0.7, plus `/live` and `/ready`. Binding happens eagerly in
//! `start()` so a taken port fails process startup instead of leaving
//! the monitor running unobserved.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{FromRef, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use super::health;
use super::instruments::MonitorMetrics;
use super::registry::MetricsRegistry;
use crate::error::ExporterError;

/// How long `stop()` waits for in-flight scrapes to drain.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Clone)]
struct ExporterState {
    registry: Arc<MetricsRegistry>,
    metrics: Arc<MonitorMetrics>,
}

impl FromRef<ExporterState> for Arc<MonitorMetrics> {
    fn from_ref(state: &ExporterState) -> Self {
        Arc::clone(&state.metrics)
    }
}

struct RunningServer {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// HTTP server exposing the metrics registry.
pub struct MetricsServer {
    /// `host:port` to bind.
    bind_address: String,
    state: ExporterState,
    running: Mutex<Option<RunningServer>>,
}

impl MetricsServer {
    pub fn new(
        bind_address: impl Into<String>,
        registry: Arc<MetricsRegistry>,
        metrics: Arc<MonitorMetrics>,
    ) -> Self {
        Self {
            bind_address: bind_address.into(),
            state: ExporterState { registry, metrics },
            running: Mutex::new(None),
        }
    }

    /// Bind and start serving. Returns the bound address.
    ///
    /// A second call while running is a no-op that returns the existing
    /// address.
    ///
    /// # Errors
    /// `ExporterError::Bind` when the address cannot be bound.
    #[instrument(skip(self), fields(address = %self.bind_address))]
    pub async fn start(&self) -> Result<SocketAddr, ExporterError> {
        let mut running = self.running.lock().await;
        if let Some(server) = running.as_ref() {
            warn!(address = %server.local_addr, "Metrics server is already running");
            return Ok(server.local_addr);
        }

        let listener = tokio::net::TcpListener::bind(&self.bind_address)
            .await
            .map_err(|source| ExporterError::Bind {
                addr: self.bind_address.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ExporterError::Bind {
                addr: self.bind_address.clone(),
                source,
            })?;

        let app = Router::new()
            .route("/metrics", get(render_metrics))
            .route("/live", get(health::liveness))
            .route("/ready", get(health::readiness))
            .with_state(self.state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                error!(error = %e, "Metrics server terminated with error");
            }
        });

        info!(address = %local_addr, "Prometheus metrics server started");
        info!("Metrics available at: http://{local_addr}/metrics");

        *running = Some(RunningServer {
            local_addr,
            shutdown_tx,
            handle,
        });
        Ok(local_addr)
    }

    /// Stop serving. No-op when not running.
    pub async fn stop(&self) {
        let Some(server) = self.running.lock().await.take() else {
            return;
        };

        let _ = server.shutdown_tx.send(());
        let mut handle = server.handle;
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
            warn!("Metrics server did not drain in time, aborting");
            handle.abort();
            // Wait for the listener to be dropped before reporting stopped.
            let _ = handle.await;
        }
        info!(address = %server.local_addr, "Prometheus metrics server stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|s| s.local_addr)
    }
}

async fn render_metrics(State(state): State<ExporterState>) -> Response {
    match state.registry.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, state.registry.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
