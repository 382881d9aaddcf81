use thiserror::Error;

use crate::config::error::ConfigError;
use crate::jobs::{SchedulerError, TaskError};
use crate::store::StoreError;

/// Application-wide error type.
///
/// Scheduler coordination errors and job failures are folded in here so the
/// HTTP layer and the CLI report them uniformly.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found error with entity, field, and value information
    #[error("Resource not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    /// Duplicate registration of a named resource
    #[error("Duplicate entry: {entity}.{field} = '{value}' already exists")]
    Duplicate {
        entity: String,
        field: String,
        value: String,
    },

    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Unprocessable content: {message}")]
    UnprocessableContent { message: String },

    /// A job ran and one of its tasks failed
    #[error("Job {job} failed")]
    JobFailed {
        job: String,
        #[source]
        source: TaskError,
    },

    /// Job store operation error
    #[error("Job store operation failed: {operation}")]
    Store {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Connection pool error
    #[error("Connection pool error")]
    ConnectionPool {
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Connection(_) => AppError::ConnectionPool {
                source: anyhow::Error::from(error),
            },
            other => AppError::Store {
                operation: "job store".to_string(),
                source: anyhow::Error::from(other),
            },
        }
    }
}

impl From<SchedulerError> for AppError {
    fn from(error: SchedulerError) -> Self {
        match error {
            SchedulerError::UnknownJob(name) => AppError::NotFound {
                entity: "Job".to_string(),
                field: "name".to_string(),
                value: name,
            },
            SchedulerError::DuplicateJob(name) => AppError::Duplicate {
                entity: "Job".to_string(),
                field: "name".to_string(),
                value: name,
            },
            SchedulerError::ScheduleParse { spec, reason } => AppError::Validation {
                field: "schedule".to_string(),
                reason: format!("'{spec}': {reason}"),
            },
            SchedulerError::NotSchedulable(name) => AppError::UnprocessableContent {
                message: format!("Job {name} is a single job and cannot be scheduled"),
            },
            SchedulerError::Store(e) => AppError::from(e),
            err @ SchedulerError::BehaviorNotFound(_) => AppError::Internal {
                source: anyhow::Error::from(err),
            },
        }
    }
}

impl From<TaskError> for AppError {
    fn from(error: TaskError) -> Self {
        AppError::JobFailed {
            job: error.job.clone(),
            source: error,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        let key = match &error {
            ConfigError::ValidationError { field, .. } => field.clone(),
            ConfigError::InvalidJob { name, .. } => format!("jobs.definitions.{name}"),
            _ => "config".to_string(),
        };
        AppError::Configuration {
            key,
            source: anyhow::Error::from(error),
        }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;
