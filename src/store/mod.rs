//! Shared job store with interchangeable backends.
//!
//! - Memory store (single process, tests and local development)
//! - PostgreSQL store (shared across a pool of processes)
//!
//! ```toml
//! [jobs]
//! store = "postgres"  # or "memory"
//! ```

mod error;
mod memory;
mod postgres;
mod traits;

use std::sync::Arc;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryJobStore;
pub use postgres::PostgresJobStore;
pub use traits::JobStore;

use crate::config::settings::StoreBackend;
use crate::db::AsyncDbPool;

/// Build the configured store backend.
///
/// The postgres backend needs a pool; callers create it only when
/// [`StoreBackend::Postgres`] is selected.
pub fn create_store(backend: StoreBackend, pool: Option<AsyncDbPool>) -> StoreResult<Arc<dyn JobStore>> {
    match (backend, pool) {
        (StoreBackend::Memory, _) => {
            tracing::info!("Using in-memory job store");
            Ok(Arc::new(MemoryJobStore::new()))
        }
        (StoreBackend::Postgres, Some(pool)) => {
            tracing::info!("Using PostgreSQL job store");
            Ok(Arc::new(PostgresJobStore::new(pool)))
        }
        (StoreBackend::Postgres, None) => Err(StoreError::Connection(
            "postgres store selected without a database pool".to_string(),
        )),
    }
}
