//! Command-line interface: argument parsing, configuration overrides and
//! subcommand handlers.

pub mod config_merger;
pub mod executor;
pub mod handlers;
pub mod parser;
pub mod validation;

pub use config_merger::ConfigurationMerger;
pub use executor::execute_command;
pub use parser::{Cli, Commands, Environment, LogLevel};

use anyhow::Context;

use crate::config::Settings;
use crate::logger::init_logger;

/// Load file and environment configuration, then apply the command-line overrides.
pub fn load_and_merge_config(cli: &Cli) -> anyhow::Result<Settings> {
    let merger = ConfigurationMerger::from_cli(cli).context("failed to load configuration")?;
    merger
        .merge_cli_args(cli)
        .context("invalid configuration after applying command-line arguments")
}

pub fn init_logger_from_settings(settings: &Settings) -> anyhow::Result<()> {
    let logger_config = settings
        .logger
        .clone()
        .into_logger_config()
        .context("invalid logger configuration")?;
    init_logger(logger_config).context("failed to initialize logger")
}
