//! Job DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

use crate::jobs::JobRecord;

/// A job's shared run-state as stored in the job store.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "test-job",
    "groups": ["test-job"],
    "enabled": true,
    "locked": false,
    "next_run": "2026-01-01T12:00:05Z",
    "last_run": "2026-01-01T12:00:00Z",
    "time_to_run_ms": 12,
    "tasks": ["Tick", "Tock"]
}))]
pub struct JobResponse {
    pub name: String,
    pub groups: Vec<String>,
    pub enabled: bool,
    /// A process is currently running the job
    pub locked: bool,
    pub next_run: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
    /// Wall time of the last run in milliseconds
    pub time_to_run_ms: Option<i64>,
    #[schema(value_type = Option<Vec<Object>>)]
    pub tasks: Option<JsonValue>,
}

impl From<JobRecord> for JobResponse {
    fn from(record: JobRecord) -> Self {
        Self {
            name: record.name,
            groups: record.groups,
            enabled: record.enabled,
            locked: record.locked,
            next_run: record.next_run,
            last_run: record.last_run,
            time_to_run_ms: record.time_to_run_ms,
            tasks: record.tasks,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "success": true }))]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Turn a raw `run` request body into task payloads.
///
/// An empty body keeps the stored tasks, a JSON array replaces them, any
/// other JSON value becomes the single payload.
pub fn parse_run_payloads(body: &[u8]) -> Result<Option<Vec<JsonValue>>, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(match serde_json::from_slice::<JsonValue>(body)? {
        JsonValue::Array(items) => Some(items),
        other => Some(vec![other]),
    })
}
