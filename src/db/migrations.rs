//! Embedded schema migrations.
//!
//! The migration harness needs a synchronous connection, so every helper
//! opens a plain `PgConnection` on a blocking thread.

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::error::{AppError, AppResult};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Names of migrations not yet applied.
pub async fn pending_migrations(database_url: &str) -> AppResult<Vec<String>> {
    with_connection(database_url, "check pending migrations", |conn| {
        let pending = conn.pending_migrations(MIGRATIONS)?;
        Ok(pending.iter().map(|m| m.name().to_string()).collect())
    })
    .await
}

/// Apply every pending migration, returning the applied versions.
pub async fn run_pending_migrations(database_url: &str) -> AppResult<Vec<String>> {
    with_connection(database_url, "run pending migrations", |conn| {
        let applied = conn.run_pending_migrations(MIGRATIONS)?;
        Ok(applied.iter().map(|v| v.to_string()).collect())
    })
    .await
}

/// Revert the last `steps` migrations, newest first.
pub async fn revert_migrations(database_url: &str, steps: u32) -> AppResult<Vec<String>> {
    with_connection(database_url, "revert migrations", move |conn| {
        let applied = conn.applied_migrations()?.len();
        let mut reverted = Vec::new();
        for _ in 0..applied.min(steps as usize) {
            reverted.push(conn.revert_last_migration(MIGRATIONS)?.to_string());
        }
        Ok(reverted)
    })
    .await
}

type HarnessResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

async fn with_connection<T, F>(database_url: &str, operation: &'static str, f: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> HarnessResult<T> + Send + 'static,
{
    let database_url = database_url.to_string();
    let store_error = move |source: anyhow::Error| AppError::Store {
        operation: operation.to_string(),
        source,
    };

    tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&database_url).map_err(|e| AppError::ConnectionPool {
            source: anyhow::Error::from(e),
        })?;
        f(&mut conn).map_err(|e| store_error(anyhow::anyhow!(e)))
    })
    .await
    .map_err(|e| AppError::Internal {
        source: anyhow::Error::from(e),
    })?
}
