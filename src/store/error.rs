//! Job store error types.

use thiserror::Error;

/// Errors raised by a [`JobStore`](crate::store::JobStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Store connection failed: {0}")]
    Connection(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store lock poisoned: {0}")]
    Poisoned(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
