//! Request and response bodies.

mod error;
mod health;
mod job;

pub use error::ErrorResponse;
pub use health::{ComponentHealth, HealthResponse, HealthStatus};
pub use job::{JobResponse, SuccessResponse, parse_run_payloads};
