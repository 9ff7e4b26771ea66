//! Health check handlers

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub total_requests: u64,
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_secs(),
        total_requests: state.get_request_count(),
    })
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: ReadinessChecks,
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessChecks {
    /// Entity recognition is enabled
    pub ner_enabled: bool,
    /// NER model loaded
    pub ner_model: bool,
    /// The loaded model is pretrained rather than the lexicon fallback
    pub ner_pretrained: bool,
    /// Model identifier, if a recognizer is configured
    pub ner_model_name: Option<String>,
    pub entity_policy: String,
    pub webhook_configured: bool,
}

/// Readiness check
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Service not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let pipeline = &state.pipeline;
    let ready = state.is_ready();

    let response = ReadinessResponse {
        ready,
        checks: ReadinessChecks {
            ner_enabled: pipeline.recognizer_name().is_some(),
            ner_model: pipeline.recognizer_ready(),
            ner_pretrained: pipeline.recognizer_pretrained(),
            ner_model_name: pipeline.recognizer_name().map(str::to_string),
            entity_policy: format!("{:?}", pipeline.policy()).to_lowercase(),
            webhook_configured: state.dispatcher.has_sink(),
        },
    };

    if ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
