//! Router assembly.

use axum::{Json, Router, middleware, routing::get};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::api::doc::ApiDoc;
use crate::api::handlers;
use crate::api::middleware::{logging_middleware, request_id_middleware};
use crate::state::AppState;

pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Build the application router.
///
/// # Routes
/// - `{jobs_endpoint}/...` job listing, enable/disable and manual runs
/// - `/health`
/// - `/api-docs/openapi.json`
///
/// Layers run last-added first: request ID assignment, then logging.
pub fn create_router(state: AppState, jobs_endpoint: &str) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest(jobs_endpoint, handlers::jobs::job_routes())
        .merge(handlers::health::health_routes())
        .split_for_parts();

    router
        .route(OPENAPI_PATH, get(move || async move { Json(api) }))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
