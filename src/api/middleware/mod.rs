//! Request middleware and error responses.

mod error_handler;
mod request_trace;

pub use error_handler::error_to_status_code;
pub use request_trace::{REQUEST_ID_HEADER, RequestId, logging_middleware, request_id_middleware};
