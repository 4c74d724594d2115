//! ---
//! volta_section: "05-networking-external-interfaces"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Batch, catalog and health HTTP routes."
//! volta_version: "v0.0.0-prealpha"
//! volta_owner: "tbd"
//! ---
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;
use volta_core::{BatchReport, BatchRequest, EngineError};
use volta_sim::SimError;

use crate::server::AppState;

pub(crate) fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/designs/:id/simulate", post(post_simulate))
        .route("/api/components", get(get_components))
        .route("/api/health", get(get_health))
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Always `"ok"` while the server answers.
    pub status: String,
    /// Number of streaming sessions currently registered.
    pub active_sessions: usize,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match &err {
            EngineError::DesignNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::MalformedRequest(_)
            | EngineError::Simulation(SimError::InvalidStepSize(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// An empty body means "use the defaults".
async fn post_simulate(
    State(state): State<Arc<AppState>>,
    Path(design_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<BatchReport>, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        BatchRequest::default()
    } else {
        serde_json::from_slice::<BatchRequest>(&body)
            .map_err(|err| EngineError::MalformedRequest(err.to_string()))?
    };

    let batch = state.batch.clone();
    let report = tokio::task::spawn_blocking(move || batch.run(design_id, request))
        .await
        .map_err(|err| {
            warn!(design = %design_id, error = %err, "batch task failed");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "batch run aborted")
        })??;
    Ok(Json(report))
}

async fn get_components() -> Response {
    Json(volta_sim::catalog()).into_response()
}

async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok".into(),
        active_sessions: state.registry.active_sessions(),
    })
}
