//! OpenAPI document

use utoipa::OpenApi;

use crate::error::ApiError;
use crate::handlers::{cv, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CVX API",
        description = "Résumé extraction: upload a PDF or DOCX, get a candidate record"
    ),
    paths(health::health_check, health::readiness_check, cv::process_cv),
    components(schemas(
        ApiError,
        health::HealthResponse,
        health::ReadinessResponse,
        health::ReadinessChecks,
        cv::ProcessCvRequest,
        cv::ProcessCvResponse,
        cv::DispatchSummary
    )),
    tags(
        (name = "health", description = "Liveness and readiness checks"),
        (name = "cv", description = "Résumé processing")
    )
)]
pub struct ApiDoc;
