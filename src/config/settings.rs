//! Configuration settings structures
//!
//! Every section deserializes with defaults, so a partial TOML file (or none
//! but environment variables) still yields a complete [`Settings`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

use crate::config::error::ConfigError;
use crate::jobs::{BehaviorRef, JobDefinition, ScheduleSpec};
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "fusion-jobs".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_jobs_endpoint() -> String {
    "/jobs".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/fusion-jobs.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_max_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_max_files() -> usize {
    5
}

fn default_concurrency() -> usize {
    1
}

// ============================================================================
// Application Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// Axum HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Path prefix of the job management routes
    #[serde(default = "default_jobs_endpoint")]
    pub jobs_endpoint: String,
}

impl ServerConfig {
    /// Get the full server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            jobs_endpoint: default_jobs_endpoint(),
        }
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

/// PostgreSQL connection pool configuration, used by the `postgres` job store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,

    /// Whether to run pending migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout: default_connection_timeout(),
            auto_migrate: false,
        }
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            colored: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_path")]
    pub path: String,

    #[serde(default = "default_true")]
    pub append: bool,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Maximum file size in bytes before rotation
    #[serde(default = "default_max_size")]
    pub max_size: u64,

    /// Maximum number of rotated files to keep
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: true,
            format: default_log_format(),
            max_size: default_max_size(),
            max_files: default_max_files(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub console: ConsoleSettings,

    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Convert the file representation into the runtime [`LoggerConfig`]
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let format = self
            .file
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::validation("logger.file.format".to_string(), e.to_string()))?;

        let file = FileConfig {
            enabled: self.file.enabled,
            path: PathBuf::from(self.file.path),
            append: self.file.append,
            format,
            max_size: self.file.max_size,
            max_files: self.file.max_files,
        };
        let console = ConsoleConfig::new(self.console.enabled, self.console.colored);

        LoggerConfig::new(console, file, self.level)
            .map_err(|e| ConfigError::validation("logger".to_string(), format!("{e:#}")))
    }
}

// ============================================================================
// Jobs Configuration
// ============================================================================

/// Job store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

/// A job declared in configuration. Its behavior is looked up by `method`
/// in the behavior registry when the job runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct JobDefinitionSettings {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[serde(default)]
    pub group: Vec<String>,

    #[serde(default)]
    pub schedule: Option<ScheduleSpec>,

    #[serde(default)]
    pub tasks: Option<Vec<JsonValue>>,

    #[serde(default)]
    pub single: bool,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Dotted behavior name, e.g. `log.payload`
    #[validate(length(min = 1))]
    pub method: String,

    #[serde(default)]
    #[validate(range(min = 1))]
    pub concurrency: Option<usize>,
}

impl JobDefinitionSettings {
    pub fn to_definition(&self) -> JobDefinition {
        JobDefinition {
            name: self.name.clone(),
            group: self.group.clone(),
            schedule: self.schedule.clone(),
            tasks: self.tasks.clone(),
            single: self.single,
            enabled: self.enabled,
            behavior: BehaviorRef::Named(self.method.clone()),
            concurrency: self.concurrency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Whether this process registers and arms the configured jobs. When
    /// false the job routes still mount but know no jobs (404 on every name).
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub store: StoreBackend,

    /// Task concurrency for jobs that do not set their own
    #[serde(default = "default_concurrency")]
    pub default_concurrency: usize,

    #[serde(default)]
    pub definitions: Vec<JobDefinitionSettings>,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            store: StoreBackend::default(),
            default_concurrency: default_concurrency(),
            definitions: Vec::new(),
        }
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logger: LoggerSettings,

    #[serde(default)]
    pub jobs: JobsConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn arb_server_config() -> impl Strategy<Value = ServerConfig> {
        (
            prop_oneof![
                Just("127.0.0.1".to_string()),
                Just("0.0.0.0".to_string()),
                Just("localhost".to_string()),
            ],
            1u16..=65535u16,
            "/[a-z]{1,10}",
        )
            .prop_map(|(host, port, jobs_endpoint)| ServerConfig {
                host,
                port,
                jobs_endpoint,
            })
    }

    fn arb_job_definition() -> impl Strategy<Value = JobDefinitionSettings> {
        (
            "[a-z][a-z0-9-]{0,15}",
            prop::collection::vec("[a-z]{1,8}", 0..3),
            prop_oneof![
                Just(Some(ScheduleSpec::text("every 5 seconds"))),
                Just(Some(ScheduleSpec::cron("0 3 * * *", false))),
                Just(None),
            ],
            any::<bool>(),
            prop::option::of(1usize..8),
        )
            .prop_map(|(name, group, schedule, enabled, concurrency)| JobDefinitionSettings {
                single: schedule.is_none(),
                name,
                group,
                schedule,
                tasks: None,
                enabled,
                method: "log.payload".to_string(),
                concurrency,
            })
    }

    fn arb_settings() -> impl Strategy<Value = Settings> {
        (
            arb_server_config(),
            prop_oneof![Just(StoreBackend::Memory), Just(StoreBackend::Postgres)],
            1usize..16,
            prop::collection::vec(arb_job_definition(), 0..4),
        )
            .prop_map(|(server, store, default_concurrency, definitions)| Settings {
                server,
                jobs: JobsConfig {
                    enabled: true,
                    store,
                    default_concurrency,
                    definitions,
                },
                ..Default::default()
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Settings written as TOML read back unchanged.
        #[test]
        fn prop_settings_round_trip_serialization(settings in arb_settings()) {
            let toml_str = toml::to_string(&settings).unwrap();
            let deserialized: Settings = toml::from_str(&toml_str).unwrap();
            prop_assert_eq!(settings, deserialized);
        }
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.address(), "127.0.0.1:3000");
        assert_eq!(config.jobs_endpoint, "/jobs");
    }

    #[test]
    fn test_jobs_config_defaults() {
        let config = JobsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.default_concurrency, 1);
        assert!(config.definitions.is_empty());
    }

    #[test]
    fn test_deserialize_job_definitions() {
        let toml_str = r#"
            [jobs]
            store = "postgres"

            [[jobs.definitions]]
            name = "test-job"
            schedule = "every 5 seconds"
            tasks = ["Tick", "Tock"]
            method = "log.payload"

            [[jobs.definitions]]
            name = "nightly-report"
            group = ["reports"]
            schedule = { cron = "0 30 2 * * *", seconds = true }
            tasks = [{ time = 1 }]
            method = "http.webhook"
            concurrency = 2

            [[jobs.definitions]]
            name = "manual"
            single = true
            enabled = false
            method = "log.payload"
        "#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        let defs = &settings.jobs.definitions;

        assert_eq!(settings.jobs.store, StoreBackend::Postgres);
        assert_eq!(defs.len(), 3);
        assert_eq!(defs[0].schedule, Some(ScheduleSpec::text("every 5 seconds")));
        assert_eq!(defs[0].tasks, Some(vec![json!("Tick"), json!("Tock")]));
        assert!(defs[0].enabled);
        assert_eq!(defs[1].schedule, Some(ScheduleSpec::cron("0 30 2 * * *", true)));
        assert_eq!(defs[1].tasks, Some(vec![json!({"time": 1})]));
        assert!(defs[2].single);
        assert!(!defs[2].enabled);
        assert!(defs[2].schedule.is_none());
    }

    #[test]
    fn test_to_definition_uses_named_behavior() {
        let settings = JobDefinitionSettings {
            name: "report".to_string(),
            group: vec!["nightly".to_string()],
            schedule: Some(ScheduleSpec::text("every 1 hour")),
            tasks: None,
            single: false,
            enabled: true,
            method: "reports.send".to_string(),
            concurrency: Some(3),
        };
        let def = settings.to_definition();
        assert!(matches!(def.behavior, BehaviorRef::Named(ref m) if m == "reports.send"));
        assert_eq!(def.groups(), vec!["nightly"]);
        assert_eq!(def.concurrency, Some(3));
    }

    #[test]
    fn test_logger_settings_into_logger_config() {
        let mut settings = LoggerSettings::default();
        settings.file.format = "compact".to_string();
        let config = settings.into_logger_config().unwrap();
        assert_eq!(config.file.format, LogFormat::Compact);
        assert_eq!(config.file.max_files, 5);

        let mut bad = LoggerSettings::default();
        bad.file.format = "xml".to_string();
        assert!(bad.into_logger_config().is_err());
    }
}
