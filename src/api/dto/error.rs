//! Error response body.

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use utoipa::ToSchema;

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "code": "NOT_FOUND",
    "message": "Job 'nightly-report' not found",
    "details": { "entity": "Job", "field": "name", "value": "nightly-report" }
}))]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<JsonValue>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found_error(entity: &str, field: &str, value: &str) -> Self {
        Self::new("NOT_FOUND", format!("{entity} '{value}' not found")).with_details(json!({
            "entity": entity,
            "field": field,
            "value": value,
        }))
    }

    pub fn duplicate_error(entity: &str, field: &str, value: &str) -> Self {
        Self::new("DUPLICATE", format!("{entity} '{value}' already exists")).with_details(json!({
            "entity": entity,
            "field": field,
            "value": value,
        }))
    }

    pub fn validation_error(field: &str, reason: &str) -> Self {
        Self::new("VALIDATION_ERROR", format!("Validation failed for {field}")).with_details(json!({
            "field": field,
            "reason": reason,
        }))
    }

    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }
}
