use crate::config::{DashboardConfig, SitesConfig};
use crate::error::{DashboardError, Result};
use crate::events::EventBus;
use crate::monitor::MonitorHandle;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::handlers::{
    events_handler, health_handler, index_handler, mjpeg_stream_handler, select_site_handler,
    sites_handler, status_handler, stop_camera_handler,
};

/// Shared state for the Axum server
#[derive(Clone)]
pub struct DashboardState {
    pub(crate) monitor: MonitorHandle,
    pub(crate) sites: Arc<SitesConfig>,
    pub(crate) event_bus: Arc<EventBus>,
    pub(crate) frame_interval: Duration,
    /// Cancelled when the server stops; ends the SSE and MJPEG streams
    pub(crate) shutdown: CancellationToken,
}

impl DashboardState {
    pub fn new(
        monitor: MonitorHandle,
        sites: Arc<SitesConfig>,
        event_bus: Arc<EventBus>,
        stream_fps: u32,
    ) -> Self {
        Self {
            monitor,
            sites,
            event_bus,
            frame_interval: Duration::from_micros(1_000_000u64 / stream_fps.max(1) as u64),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

/// All dashboard routes
pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/status", get(status_handler))
        .route("/api/sites", get(sites_handler))
        .route("/api/site", post(select_site_handler))
        .route("/api/camera/stop", post(stop_camera_handler))
        .route("/api/events", get(events_handler))
        .route("/stream.mjpg", get(mjpeg_stream_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Operator dashboard served over HTTP
pub struct DashboardServer {
    config: DashboardConfig,
    state: DashboardState,
}

impl DashboardServer {
    pub fn new(config: DashboardConfig, state: DashboardState) -> Self {
        Self { config, state }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.config.ip, self.config.port)
    }

    /// Bind and serve until `cancel` fires
    pub async fn serve(self, cancel: CancellationToken) -> Result<()> {
        let addr = self.address();
        let app = router(self.state.with_shutdown(cancel.clone()));

        info!("Starting dashboard on {}", addr);

        let listener =
            tokio::net::TcpListener::bind(&addr)
                .await
                .map_err(|e| DashboardError::BindFailed {
                    address: addr.clone(),
                    source: e,
                })?;

        info!("Dashboard listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await
            .map_err(|e| DashboardError::ServeFailed {
                details: format!("Server error: {}", e),
            })?;

        info!("Dashboard stopped");
        Ok(())
    }
}
