//! Health check handler.

use std::collections::HashMap;
use std::time::Instant;

use axum::{Json, extract::State, http::StatusCode};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::HEALTH_TAG;
use crate::api::dto::{ComponentHealth, HealthResponse, HealthStatus};
use crate::state::AppState;

pub fn health_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(health_check))
}

/// Report job store reachability and how many registered jobs are armed
#[utoipa::path(
    get,
    path = "/health",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Job store unreachable", body = HealthResponse)
    )
)]
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let mut checks = HashMap::new();

    let start = Instant::now();
    let store = match state.jobs.list_jobs().await {
        Ok(records) => ComponentHealth::healthy(format!("{} job(s) stored", records.len())),
        Err(e) => {
            tracing::warn!(error = %e, "Job store health check failed");
            ComponentHealth::unhealthy(e.to_string())
        }
    };
    checks.insert(
        "job_store".to_string(),
        store.with_response_time(start.elapsed().as_millis() as u64),
    );

    let names = state.jobs.job_names();
    let armed = names.iter().filter(|name| state.jobs.is_armed(name)).count();
    checks.insert(
        "scheduler".to_string(),
        ComponentHealth::healthy(format!("{armed} of {} registered job(s) armed", names.len())),
    );

    let response = HealthResponse::from_checks(state.version.clone(), checks);
    let status = match response.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (status, Json(response))
}
