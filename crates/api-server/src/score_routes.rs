//! Scoring API Routes
//!
//! `GET /health` and `POST /score`.

use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{SecondsFormat, Utc};
use scoring_core::ScoreResponse;
use serde::Serialize;
use serde_json::Value;

use crate::request_id::RequestId;
use crate::{AppError, AppState};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ts: String,
}

pub fn score_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/score", post(score))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        ts: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    })
}

/// The body is taken as raw JSON so shape problems come back as our own
/// validation errors rather than extractor rejections.
async fn score(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(payload): Json<Value>,
) -> Result<Json<ScoreResponse>, AppError> {
    let response = state.orchestrator.handle(payload).await.map_err(|e| {
        tracing::warn!("Score request {} rejected: {}", request_id.0, e);
        e
    })?;
    tracing::debug!(
        "Score request {} served: grade {}",
        request_id.0,
        response.grade
    );
    Ok(Json(response))
}
