use utoipa::OpenApi;

pub const HEALTH_TAG: &str = "Health";
pub const JOB_TAG: &str = "Jobs";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "fusion-jobs",
        description = "Job management API of a fusion-jobs process",
    ),
    components(schemas(crate::api::dto::ErrorResponse)),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = JOB_TAG, description = "Job listing, enable/disable and manual runs"),
    )
)]
pub struct ApiDoc;
