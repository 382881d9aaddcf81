//! Job management handlers, mounted under `server.jobs_endpoint`.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::JOB_TAG;
use crate::api::dto::{ErrorResponse, JobResponse, SuccessResponse, parse_run_payloads};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn job_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_jobs))
        .routes(routes!(enable_job))
        .routes(routes!(disable_job))
        .routes(routes!(run_job))
}

/// List every job record in the shared store
#[utoipa::path(
    get,
    path = "/",
    tag = JOB_TAG,
    responses(
        (status = 200, description = "Stored job records ordered by name", body = Vec<JobResponse>),
        (status = 503, description = "Job store unavailable", body = ErrorResponse)
    )
)]
async fn list_jobs(State(state): State<AppState>) -> AppResult<Json<Vec<JobResponse>>> {
    let records = state.jobs.list_jobs().await?;
    Ok(Json(records.into_iter().map(JobResponse::from).collect()))
}

/// Enable a job across the whole pool
#[utoipa::path(
    get,
    path = "/enable/{job}",
    tag = JOB_TAG,
    params(("job" = String, Path, description = "Job name")),
    responses(
        (status = 200, description = "Job enabled", body = SuccessResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    )
)]
async fn enable_job(
    State(state): State<AppState>,
    Path(job): Path<String>,
) -> AppResult<Json<SuccessResponse>> {
    state.jobs.enable(&job).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Disable a job across the whole pool; a run in progress is not interrupted
#[utoipa::path(
    get,
    path = "/disable/{job}",
    tag = JOB_TAG,
    params(("job" = String, Path, description = "Job name")),
    responses(
        (status = 200, description = "Job disabled", body = SuccessResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    )
)]
async fn disable_job(
    State(state): State<AppState>,
    Path(job): Path<String>,
) -> AppResult<Json<SuccessResponse>> {
    state.jobs.disable(&job).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Claim and run a job now.
///
/// The body is optional: a JSON array replaces the stored tasks, any other
/// JSON value is run as a single task. A disabled or locked job is skipped
/// and still reported as a success.
#[utoipa::path(
    post,
    path = "/run/{job}",
    tag = JOB_TAG,
    params(("job" = String, Path, description = "Job name")),
    request_body(
        content = Vec<serde_json::Value>,
        content_type = "application/json",
        description = "Task payloads overriding the stored tasks"
    ),
    responses(
        (status = 200, description = "Job ran or was skipped", body = SuccessResponse),
        (status = 400, description = "Body is not valid JSON", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse),
        (status = 500, description = "A task failed", body = ErrorResponse)
    )
)]
async fn run_job(
    State(state): State<AppState>,
    Path(job): Path<String>,
    body: Bytes,
) -> AppResult<Json<SuccessResponse>> {
    let payloads = parse_run_payloads(&body).map_err(|e| AppError::BadRequest {
        message: format!("Invalid JSON body: {e}"),
    })?;

    let outcome = state.jobs.run_single(&job, payloads).await?;
    if let Some(error) = outcome.into_job_error() {
        return Err(error.into());
    }
    Ok(Json(SuccessResponse::ok()))
}
