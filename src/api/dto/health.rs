//! Health check DTOs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "healthy",
    "version": "0.1.0",
    "timestamp": "2026-01-01T12:00:00.000Z",
    "checks": {
        "job_store": {
            "status": "healthy",
            "message": "3 job(s) stored",
            "response_time_ms": 2
        },
        "scheduler": {
            "status": "healthy",
            "message": "2 of 3 registered job(s) armed",
            "response_time_ms": null
        }
    }
}))]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    /// RFC 3339 timestamp of the check
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: String,
    pub checks: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub message: Option<String>,
    pub response_time_ms: Option<u64>,
}

impl ComponentHealth {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            message: Some(message.into()),
            response_time_ms: None,
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            response_time_ms: None,
        }
    }

    pub fn with_response_time(mut self, millis: u64) -> Self {
        self.response_time_ms = Some(millis);
        self
    }
}

impl HealthResponse {
    /// Overall status is the worst status among the component checks.
    pub fn from_checks(version: String, checks: HashMap<String, ComponentHealth>) -> Self {
        let status = checks
            .values()
            .map(|c| c.status)
            .fold(HealthStatus::Healthy, |worst, s| match (worst, s) {
                (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
                (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
                _ => HealthStatus::Healthy,
            });

        Self {
            status,
            version,
            timestamp: chrono::Utc::now().to_rfc3339(),
            checks,
        }
    }
}
