//! Layered configuration loading
//!
//! Sources, lowest priority first:
//! 1. `default.toml` (required)
//! 2. `{environment}.toml`
//! 3. `local.toml`
//! 4. `FUSION_JOBS_*` environment variables

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

const CONFIG_DIR_ENV: &str = "FUSION_JOBS_CONFIG_DIR";
const CONFIG_FILE_ENV: &str = "FUSION_JOBS_CONFIG_FILE";
const DEFAULT_CONFIG_DIR: &str = "config";

/// `FUSION_JOBS_SERVER__PORT` maps to `server.port`
const ENV_PREFIX: &str = "FUSION_JOBS";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    /// When set, layered loading is skipped and only this file is read
    config_file: Option<PathBuf>,
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Build a loader from `FUSION_JOBS_CONFIG_DIR`, `FUSION_JOBS_CONFIG_FILE`
    /// and `FUSION_JOBS_APP_ENV`.
    ///
    /// # Errors
    ///
    /// Fails when both the directory and the file variables are set.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from);
        let config_file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);

        if config_dir.is_some() && config_file.is_some() {
            return Err(ConfigError::mutual_exclusivity(format!(
                "{CONFIG_DIR_ENV} and {CONFIG_FILE_ENV} cannot both be set. \
                 Use {CONFIG_DIR_ENV} for layered configuration or \
                 {CONFIG_FILE_ENV} for a single configuration file."
            )));
        }

        Ok(Self {
            config_dir: config_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
            config_file,
            environment: AppEnvironment::from_env(),
        })
    }

    /// Read a single file instead of the layered directory
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn with_environment(mut self, environment: AppEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> AppEnvironment {
        self.environment
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Load, deserialize and validate the settings.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let settings: Settings = self.build_config()?.try_deserialize().map_err(|e| {
            ConfigError::ParseError(format!("Failed to deserialize configuration: {}", e))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    fn build_config(&self) -> Result<Config, ConfigError> {
        let builder = match &self.config_file {
            Some(file) => add_file_source(Config::builder(), file, true)?,
            None => self.build_layered_config(Config::builder())?,
        };

        add_env_source(builder).build().map_err(ConfigError::from)
    }

    fn build_layered_config(
        &self,
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let builder = add_file_source(builder, &self.config_dir.join("default.toml"), true)?;
        let builder = add_file_source(
            builder,
            &self.config_dir.join(self.environment.config_file_name()),
            false,
        )?;
        add_file_source(builder, &self.config_dir.join("local.toml"), false)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: None,
            environment: AppEnvironment::default(),
        })
    }
}

fn add_file_source(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
    required: bool,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if required && !path.exists() {
        return Err(ConfigError::file_not_found(format!(
            "Required configuration file not found: {}",
            path.display()
        )));
    }

    Ok(builder.add_source(File::from(path).format(FileFormat::Toml).required(required)))
}

fn add_env_source(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator(ENV_SEPARATOR)
            .ignore_empty(true)
            .try_parsing(true),
    )
}
