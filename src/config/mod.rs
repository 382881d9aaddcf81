//! Configuration management
//!
//! Layered loading, lowest priority first:
//! 1. `default.toml`
//! 2. `{environment}.toml`
//! 3. `local.toml` (not committed to version control)
//! 4. `FUSION_JOBS_*` environment variables
//!
//! Command-line flags are applied on top by the CLI layer.

pub mod environment;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use environment::Environment;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use settings::{
    DatabaseConfig, JobDefinitionSettings, JobsConfig, LoggerSettings, ServerConfig, Settings,
    StoreBackend,
};
