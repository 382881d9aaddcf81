use thiserror::Error;

use crate::store::StoreError;

/// Coordination errors raised by the scheduling and locking machinery.
///
/// None of these are produced by a job's own behavior; those surface as
/// [`TaskError`] inside a run outcome once the lock has been released.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid schedule '{spec}': {reason}")]
    ScheduleParse { spec: String, reason: String },

    #[error("Job already loaded: {0}")]
    DuplicateJob(String),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("No behavior registered under '{0}'")]
    BehaviorNotFound(String),

    #[error("Job {0} is a single job and cannot be scheduled")]
    NotSchedulable(String),

    #[error("Job store error: {0}")]
    Store(#[from] StoreError),
}

impl SchedulerError {
    pub fn schedule_parse(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ScheduleParse {
            spec: spec.into(),
            reason: reason.into(),
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Failure reported by a job behavior for one of its task payloads.
#[derive(Debug, Error)]
#[error("Job {job} failed on task {task_index}: {source}")]
pub struct TaskError {
    pub job: String,
    pub task_index: usize,
    #[source]
    pub source: anyhow::Error,
}
