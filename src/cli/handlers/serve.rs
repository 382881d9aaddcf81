use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::jobs::{Schedule, builtin_behaviors};
use crate::server::Server;

pub struct ServeCommandHandler {
    config: Settings,
}

impl ServeCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    pub async fn execute(self, dry_run: bool) -> AppResult<()> {
        if dry_run {
            return self.validate_only();
        }
        Server::new(self.config)
            .run()
            .await
            .map_err(|source| AppError::Internal { source })
    }

    /// Check the settings and every job definition without touching the
    /// store or binding a socket.
    pub fn validate_only(&self) -> AppResult<()> {
        self.config.validate()?;
        println!("✓ Configuration is valid");
        println!("✓ Server would bind to: {}", self.config.server.address());
        println!("✓ Job routes mounted at: {}", self.config.server.jobs_endpoint);
        println!("✓ Job store: {:?}", self.config.jobs.store);

        let behaviors = builtin_behaviors()?;
        let now = chrono::Utc::now();

        for definition in &self.config.jobs.definitions {
            if !behaviors.contains(&definition.method) {
                return Err(AppError::Validation {
                    field: format!("jobs.definitions.{}.method", definition.name),
                    reason: format!(
                        "unknown method '{}', expected one of: {}",
                        definition.method,
                        behaviors.names().join(", ")
                    ),
                });
            }

            let next_run = match &definition.schedule {
                Some(spec) if !definition.single => Schedule::parse(spec)?
                    .next_after(now)
                    .map_or_else(|| "never".to_string(), |at| at.to_rfc3339()),
                _ => "manual only".to_string(),
            };
            println!(
                "✓ Job '{}' ({}) next run: {}",
                definition.name, definition.method, next_run
            );
        }

        println!("Dry run completed successfully");
        Ok(())
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}
