//! CVX API - HTTP upload surface for the résumé pipeline
//!
//! Accepts base64-encoded PDF/DOCX uploads, runs extraction on the blocking
//! pool, and optionally dispatches the record downstream.

pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::{
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use utoipa::OpenApi;

use crate::error::ApiError;
use crate::handlers::health;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Headroom for base64 expansion and the JSON envelope
const BODY_OVERHEAD: usize = 64 * 1024;

/// Give body-limit rejections the same JSON envelope as handler errors
async fn json_payload_too_large(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if response.status() != StatusCode::PAYLOAD_TOO_LARGE || is_json {
        return response;
    }

    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(ApiError::new(
            "PAYLOAD_TOO_LARGE",
            "Request body exceeds the upload limit",
        )),
    )
        .into_response()
}

pub fn create_router(state: Arc<AppState>) -> Router {
    // base64 inflates the document by 4/3
    let body_limit = state.config.server.max_upload_bytes / 3 * 4 + BODY_OVERHEAD;

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .nest("/api/v1", routes::api_routes())
        .layer(axum::extract::DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(middleware::map_response(json_payload_too_large))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Router over default configuration, for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    create_router(Arc::new(testing::state(cvx_core::AppConfig::default())))
}

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::*;
    use cvx_dispatch::Dispatcher;
    use cvx_extractor::Pipeline;

    /// State without network-backed dispatch
    pub fn state(config: cvx_core::AppConfig) -> AppState {
        let pipeline = Pipeline::from_config(&config.extraction);
        let mut dispatch = config.dispatch.clone();
        dispatch.webhook_url = None;
        let dispatcher = match Dispatcher::from_config(dispatch) {
            Ok(dispatcher) => dispatcher,
            Err(e) => panic!("invalid dispatch config in test: {e}"),
        };
        AppState::with_parts(config, pipeline, dispatcher)
    }

    pub fn router_with(state: AppState) -> Router {
        create_router(Arc::new(state))
    }
}
