//! HTTP router and handlers

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, services::ServeDir,
    trace::TraceLayer,
};
use tracing::{debug, error};

use crate::availability::AvailabilityService;
use crate::config::Config;
use crate::snapshot::Snapshot;

/// Header naming the store that rejected a failed save
pub const FAILED_STORE_HEADER: &str = "x-failed-store";

/// Shared application state
pub struct AppState {
    /// Dual-write service
    pub service: AvailabilityService,
}

/// Create the router
pub fn create_router(state: Arc<AppState>, config: &Config) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/save-history", post(save_history_handler))
        .route("/api/latest-availability", get(latest_availability_handler));

    if config.static_files.enabled {
        router = router
            .nest_service("/output", ServeDir::new(&config.history.output_dir))
            .nest_service("/input", ServeDir::new(&config.static_files.input_dir))
            .fallback_service(ServeDir::new(&config.static_files.public_dir));
    }

    router
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CatchPanicLayer::new())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /save-history - write the snapshot to the history file, then the cache
async fn save_history_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Response {
    match state.service.submit(&Snapshot::new(body)).await {
        Ok(receipt) => {
            debug!(key = %receipt.key, "Snapshot saved");
            (StatusCode::OK, "Saved to both file and Redis").into_response()
        }
        // Already logged by the service.
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(FAILED_STORE_HEADER, e.store())],
            "Failed to save history",
        )
            .into_response(),
    }
}

/// GET /api/latest-availability - the cache's latest pointer
async fn latest_availability_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.service.latest().await {
        Ok(Some(snapshot)) => (StatusCode::OK, Json(snapshot.into_value())).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "No data found" })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Error getting data from cache");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to get data" })),
            )
                .into_response()
        }
    }
}

/// Health check handler
///
/// The process stays up without the cache, so a disconnected store reports
/// `degraded` with 503 rather than failing the check outright.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.service.cache_health().await;
    let connected = health.is_connected();

    let response = json!({
        "status": if connected { "OK" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "cache": if connected { "connected" } else { "disconnected" },
    });

    if connected {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
