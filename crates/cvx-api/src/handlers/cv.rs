//! Résumé upload handler

use std::path::Path;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use cvx_core::CandidateRecord;

use crate::error::AppError;
use crate::state::AppState;

/// Résumé upload request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessCvRequest {
    /// Original file name
    #[schema(example = "jane_smith_cv.pdf")]
    pub file_name: String,

    /// Declared type; taken from the file name's extension when absent
    #[schema(example = "pdf")]
    pub file_type: Option<String>,

    /// Base64 encoded file content
    pub content: String,

    /// Public link to the stored original, forwarded to the webhook
    #[schema(example = "https://storage.example.com/cv/jane_smith_cv.pdf")]
    pub cv_public_link: Option<String>,

    /// Send the record downstream after processing
    #[serde(default)]
    pub dispatch: bool,
}

/// Outcome of the optional downstream dispatch
#[derive(Debug, Serialize, ToSchema)]
pub struct DispatchSummary {
    pub webhook_sent: bool,
    /// Follow-up recipient, when the record has an email address
    pub followup_to: Option<String>,
    /// RFC 3339 send time of the follow-up email
    pub followup_at: Option<String>,
}

/// Résumé upload response
#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessCvResponse {
    #[schema(value_type = String, example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    pub file_name: String,
    #[schema(value_type = Object)]
    pub record: CandidateRecord,
    pub dispatch: Option<DispatchSummary>,
}

fn declared_type(req: &ProcessCvRequest) -> Result<String, AppError> {
    if let Some(file_type) = &req.file_type {
        return Ok(file_type.clone());
    }

    Path::new(&req.file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Cannot determine file type of '{}'; set file_type",
                req.file_name
            ))
        })
}

/// Process an uploaded résumé
#[utoipa::path(
    post,
    path = "/api/v1/cv",
    tag = "cv",
    request_body = ProcessCvRequest,
    responses(
        (status = 200, description = "Candidate record", body = ProcessCvResponse),
        (status = 400, description = "Invalid request", body = crate::error::ApiError),
        (status = 413, description = "Document too large", body = crate::error::ApiError),
        (status = 415, description = "Unsupported document type", body = crate::error::ApiError),
        (status = 422, description = "Document could not be read", body = crate::error::ApiError),
        (status = 503, description = "Entity model unavailable", body = crate::error::ApiError)
    )
)]
pub async fn process_cv(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessCvRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    if req.content.is_empty() {
        return Err(AppError::BadRequest("Content cannot be empty".to_string()));
    }

    let file_type = declared_type(&req)?;
    let bytes = STANDARD
        .decode(req.content.as_bytes())
        .map_err(|e| AppError::BadRequest(format!("Content is not valid base64: {e}")))?;

    let limit = state.config.server.max_upload_bytes;
    if bytes.len() > limit {
        return Err(AppError::PayloadTooLarge {
            size: bytes.len(),
            limit,
        });
    }

    let id = Uuid::new_v4();
    tracing::info!(%id, file_name = %req.file_name, %file_type, bytes = bytes.len(), "Processing upload");

    let pipeline = state.pipeline.clone();
    let record = tokio::task::spawn_blocking(move || pipeline.process_document(&bytes, &file_type))
        .await
        .map_err(|e| AppError::Internal(format!("Extraction task failed: {e}")))??;

    let dispatch = if req.dispatch && state.dispatcher.has_sink() {
        let link = req.cv_public_link.as_deref().unwrap_or_default();
        let report = state.dispatcher.dispatch(&record, link, Utc::now()).await?;
        Some(DispatchSummary {
            webhook_sent: report.webhook_sent,
            followup_to: report.followup.map(|email| email.to),
            followup_at: report.followup_at.map(|at| at.to_rfc3339()),
        })
    } else {
        if req.dispatch {
            tracing::warn!(%id, "Dispatch requested but no webhook is configured");
        }
        None
    };

    Ok((
        StatusCode::OK,
        Json(ProcessCvResponse {
            id,
            file_name: req.file_name,
            record,
            dispatch,
        }),
    ))
}
