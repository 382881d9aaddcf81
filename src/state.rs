//! Shared state handed to every request handler.

use std::sync::Arc;

use crate::jobs::JobQueue;

/// Cloning is cheap: the queue is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobQueue>,
    /// Reported by the health check
    pub version: String,
}

impl AppState {
    pub fn new(jobs: Arc<JobQueue>, version: impl Into<String>) -> Self {
        Self {
            jobs,
            version: version.into(),
        }
    }
}
