//! Error types for the logger

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rotation error: {message}")]
    Rotation { message: String },
}

impl LoggerError {
    pub fn rotation(message: impl Into<String>) -> Self {
        Self::Rotation {
            message: message.into(),
        }
    }
}
