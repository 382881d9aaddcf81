//! `AppError` to HTTP response conversion.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::api::dto::ErrorResponse;
use crate::error::AppError;

impl IntoResponse for AppError {
    /// Status mapping:
    /// - NotFound → 404
    /// - Duplicate → 409
    /// - Validation, BadRequest → 400
    /// - UnprocessableContent → 422
    /// - JobFailed, Store, Configuration, Internal → 500
    /// - ConnectionPool → 503
    ///
    /// Source chains of server-side errors are logged, never returned.
    fn into_response(self) -> Response {
        let status = error_to_status_code(&self);

        let body = match &self {
            AppError::NotFound {
                entity,
                field,
                value,
            } => ErrorResponse::not_found_error(entity, field, value),
            AppError::Duplicate {
                entity,
                field,
                value,
            } => ErrorResponse::duplicate_error(entity, field, value),
            AppError::Validation { field, reason } => ErrorResponse::validation_error(field, reason),
            AppError::BadRequest { message } => ErrorResponse::new("BAD_REQUEST", message),
            AppError::UnprocessableContent { message } => {
                ErrorResponse::new("UNPROCESSABLE_CONTENT", message)
            }
            AppError::JobFailed { job, source } => {
                tracing::warn!(job = %job, error = %source, "Job failed");
                ErrorResponse::new("JOB_FAILED", format!("Job {job} failed")).with_details(json!({
                    "job": job,
                    "task_index": source.task_index,
                    "error": format!("{:#}", source.source),
                }))
            }
            AppError::Store { operation, source } => {
                tracing::error!(operation = %operation, error = ?source, "Job store error");
                ErrorResponse::new("STORE_ERROR", format!("Job store operation failed: {operation}"))
                    .with_details(json!({ "operation": operation }))
            }
            AppError::Configuration { key, source } => {
                tracing::error!(key = %key, error = ?source, "Configuration error");
                ErrorResponse::new("CONFIGURATION_ERROR", format!("Configuration error: {key}"))
                    .with_details(json!({ "key": key }))
            }
            AppError::ConnectionPool { source } => {
                tracing::error!(error = ?source, "Connection pool error");
                ErrorResponse::new("SERVICE_UNAVAILABLE", "Job store connection unavailable")
            }
            AppError::Internal { source } => {
                tracing::error!(error = ?source, "Internal error");
                ErrorResponse::new("INTERNAL_ERROR", "An internal error occurred")
            }
        };

        (status, Json(body)).into_response()
    }
}

pub fn error_to_status_code(error: &AppError) -> StatusCode {
    match error {
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        AppError::Duplicate { .. } => StatusCode::CONFLICT,
        AppError::Validation { .. } | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        AppError::UnprocessableContent { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::ConnectionPool { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AppError::JobFailed { .. }
        | AppError::Store { .. }
        | AppError::Configuration { .. }
        | AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
