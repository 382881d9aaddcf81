//! Applies command-line overrides on top of file and environment configuration.
//!
//! Precedence, highest first: command flags, global flags, environment
//! variables, `local.toml`, `{env}.toml`, `default.toml`.

use std::path::Path;

use super::parser::{Cli, Commands};
use crate::config::{ConfigError, ConfigLoader, Settings};

pub struct ConfigurationMerger {
    base_config: Settings,
}

impl ConfigurationMerger {
    pub fn new(base_config: Settings) -> Self {
        Self { base_config }
    }

    /// Load the base configuration the way the command line asks for it.
    ///
    /// `--config` replaces the layered directory with a single file; `--env`
    /// replaces `FUSION_JOBS_APP_ENV`.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        Self::load(cli.config.as_deref(), cli.env.map(Into::into))
    }

    pub fn load(
        config_path: Option<&Path>,
        environment: Option<crate::config::Environment>,
    ) -> Result<Self, ConfigError> {
        let mut loader = ConfigLoader::new()?;
        if let Some(path) = config_path {
            if !path.is_file() {
                return Err(ConfigError::file_not_found(path.display().to_string()));
            }
            loader = loader.with_config_file(path);
        }
        if let Some(environment) = environment {
            loader = loader.with_environment(environment);
        }

        Ok(Self::new(loader.load()?))
    }

    /// Returns a validated copy of the base configuration with CLI overrides applied.
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }

        if let Some(Commands::Serve {
            host,
            port,
            log_level,
            ..
        }) = &cli.command
        {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
            // An explicit level beats --verbose/--quiet
            if let Some(level) = log_level {
                config.logger.level = level.as_str().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn base_config(&self) -> &Settings {
        &self.base_config
    }
}
