//! Configuration validation
//!
//! Every section gets a `validate` method; [`Settings::validate`] runs them in
//! order and returns the first failure.

use std::collections::HashSet;

use validator::Validate;

use crate::config::error::ConfigError;
use crate::config::settings::{
    DatabaseConfig, FileSettings, JobsConfig, LoggerSettings, ServerConfig, Settings, StoreBackend,
};
use crate::jobs::Schedule;

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

const VALID_DATABASE_SCHEMES: &[&str] = &["postgres://", "postgresql://"];

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::validation(
                "server.port",
                "Port must be between 1 and 65535. Please specify a valid port number.",
            ));
        }

        if !self.jobs_endpoint.starts_with('/') || self.jobs_endpoint.len() < 2 {
            return Err(ConfigError::validation(
                "server.jobs_endpoint",
                format!(
                    "Jobs endpoint '{}' must start with '/' and name a path segment.",
                    self.jobs_endpoint
                ),
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    /// Only called when the postgres store is selected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::validation(
                "database.url",
                "Database URL is required by the postgres job store.",
            ));
        }

        if !VALID_DATABASE_SCHEMES
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
        {
            return Err(ConfigError::validation(
                "database.url",
                "Invalid database URL format. Expected format: postgres://[user:password@]host[:port]/database",
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections",
                "Max connections must be greater than 0.",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::validation(
                "database.min_connections",
                format!(
                    "Min connections ({}) cannot exceed max connections ({}).",
                    self.min_connections, self.max_connections
                ),
            ));
        }

        Ok(())
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.file.format",
                format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            ));
        }

        if self.enabled && (self.max_size == 0 || self.max_files == 0) {
            return Err(ConfigError::validation(
                "logger.file",
                "max_size and max_files must be greater than 0 when file logging is enabled.",
            ));
        }

        Ok(())
    }
}

impl LoggerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.level",
                format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        self.file.validate()
    }
}

impl JobsConfig {
    /// Check the concurrency default and every job definition.
    ///
    /// Schedules are parsed here so a typo fails at startup rather than when
    /// the job is registered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_concurrency == 0 {
            return Err(ConfigError::validation(
                "jobs.default_concurrency",
                "Default concurrency must be at least 1.",
            ));
        }

        let mut seen = HashSet::new();
        for def in &self.definitions {
            if let Err(errors) = def.validate() {
                return Err(ConfigError::invalid_job(&def.name, errors.to_string()));
            }
            if !seen.insert(def.name.as_str()) {
                return Err(ConfigError::invalid_job(&def.name, "duplicate job name"));
            }

            match (&def.schedule, def.single) {
                (Some(spec), _) => {
                    Schedule::parse(spec)
                        .map_err(|e| ConfigError::invalid_job(&def.name, e.to_string()))?;
                }
                (None, false) => {
                    return Err(ConfigError::invalid_job(
                        &def.name,
                        "a schedule is required unless the job is marked single",
                    ));
                }
                (None, true) => {}
            }
        }

        Ok(())
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        if self.jobs.store == StoreBackend::Postgres {
            self.database.validate()?;
        }
        self.logger.validate()?;
        self.jobs.validate()?;
        Ok(())
    }
}
