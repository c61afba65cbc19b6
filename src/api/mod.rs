//! Local read-only REST API over the tracker.
//!
//! Provides HTTP endpoints for:
//! - Service info
//! - Tracked meetings and their processing status
//! - Poll scheduler state

pub mod error;
pub mod routes;

use crate::jobs::TrackerView;
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tracing::info;

pub struct ApiServer {
    port: u16,
    view: TrackerView,
}

impl ApiServer {
    pub fn new(port: u16, view: TrackerView) -> Self {
        Self { port, view }
    }

    /// Serve until `shutdown` is cancelled.
    pub async fn start(self, shutdown: CancellationToken) -> Result<()> {
        let app = router(self.view);

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /              - Service info");
        info!("  GET  /meetings      - List tracked meetings");
        info!("  GET  /meetings/:id  - Get a tracked meeting");
        info!("  GET  /scheduler     - Get poller status");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        Ok(())
    }
}

pub fn router(view: TrackerView) -> Router {
    Router::new()
        .route("/", get(status))
        .merge(routes::meetings::router(view))
        .layer(ServiceBuilder::new())
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "meetwatch",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}
