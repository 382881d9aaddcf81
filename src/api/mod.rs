//! HTTP surface: job management routes, health check and OpenAPI document.

mod doc;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use routes::create_router;
