//! Schema management for the postgres job store.

use crate::config::Settings;
use crate::db::{pending_migrations, revert_migrations, run_pending_migrations};
use crate::error::{AppError, AppResult};

pub struct MigrateCommandHandler {
    config: Settings,
}

impl MigrateCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Apply pending migrations, list them (`dry_run`) or revert the last
    /// `rollback` of them.
    ///
    /// Runs against `database.url` whatever store the jobs are configured
    /// with, so the schema can be prepared before switching backends.
    pub async fn execute(&self, dry_run: bool, rollback: Option<u32>) -> AppResult<()> {
        if rollback == Some(0) {
            return Err(AppError::Validation {
                field: "rollback_steps".to_string(),
                reason: "Number of rollback steps must be greater than 0".to_string(),
            });
        }
        self.config.database.validate()?;
        let url = &self.config.database.url;

        if dry_run {
            let pending = pending_migrations(url).await?;
            if pending.is_empty() {
                println!("✓ No pending migrations - job store schema is up to date");
            } else {
                println!("Found {} pending migration(s):", pending.len());
                for name in &pending {
                    println!("  - {name}");
                }
                println!("\nRun without --dry-run to apply them");
            }
            return Ok(());
        }

        if let Some(steps) = rollback {
            println!("Rolling back {steps} migration(s)...");
            let reverted = revert_migrations(url, steps).await?;
            if reverted.len() < steps as usize {
                tracing::warn!(
                    requested = steps,
                    reverted = reverted.len(),
                    "Fewer migrations applied than requested for rollback"
                );
            }
            println!("✓ Rolled back {} migration(s)", reverted.len());
            for version in &reverted {
                println!("  - {version}");
            }
            return Ok(());
        }

        let applied = run_pending_migrations(url).await?;
        if applied.is_empty() {
            println!("✓ No migrations to apply - job store schema is up to date");
        } else {
            println!("✓ Applied {} migration(s):", applied.len());
            for version in &applied {
                println!("  - {version}");
            }
        }
        Ok(())
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}
