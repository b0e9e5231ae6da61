//! HTTP control surface
//!
//! Exposes the daemon's three remote operations plus a health probe. The
//! transport serves calls concurrently; the registry's own locking keeps
//! registration safe. A shutdown call answers first and then cancels the
//! serve loop, which drains in-flight requests before the daemon tears
//! down.

use crate::daemon::Daemon;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use buildwatch_core::{Error, ProjectConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    daemon: Arc<Daemon>,
    shutdown: CancellationToken,
}

/// Body of `POST /api/v1/projects`
#[derive(Debug, Serialize, Deserialize)]
pub struct AddProjectRequest {
    /// Project directory; its trailing component becomes the project name
    pub working_dir: PathBuf,
    /// Script and debounce settings; a body missing `script` is rejected
    pub config: ProjectConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct AddProjectResponse {
    project: String,
}

/// Build the Axum router with all endpoints
pub fn build_router(daemon: Arc<Daemon>, shutdown: CancellationToken) -> Router {
    let state = AppState { daemon, shutdown };

    Router::new()
        .route("/api/v1/hello", get(hello_handler))
        .route("/api/v1/projects", post(add_project_handler))
        .route("/api/v1/shutdown", post(shutdown_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /api/v1/hello
async fn hello_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": state.daemon.hello() }))
}

/// POST /api/v1/projects
async fn add_project_handler(
    State(state): State<AppState>,
    Json(request): Json<AddProjectRequest>,
) -> Result<Json<AddProjectResponse>, ApiError> {
    tracing::info!(
        "Add project request: {} ({} commands)",
        request.working_dir.display(),
        request.config.script.len()
    );

    let project = state
        .daemon
        .add_project(&request.working_dir, request.config)?;
    Ok(Json(AddProjectResponse { project }))
}

/// POST /api/v1/shutdown
async fn shutdown_handler(State(state): State<AppState>) -> StatusCode {
    tracing::info!("Shutdown request");
    state.shutdown.cancel();
    StatusCode::OK
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let health = serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "projects": state.daemon.project_count(),
    });
    (StatusCode::OK, Json(health))
}

/// Error handling for API endpoints
#[derive(Debug)]
enum ApiError {
    InvalidRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(err) => {
                // Log the full error details for debugging
                tracing::error!("Internal server error: {err:?}");
                // Return a generic message to the client to avoid information disclosure
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotAProject(_) | Error::InvalidInput(_) | Error::Config(_) => {
                ApiError::InvalidRequest(err.to_string())
            }
            other => ApiError::Internal(other.into()),
        }
    }
}
