//! Command-line definition

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Distributed cron and interval job scheduler
#[derive(Parser, Debug)]
#[command(name = "fusion-jobs")]
#[command(version = crate::pkg_version(), long_version = crate::clap_long_version())]
#[command(about = "Distributed cron and interval job scheduler")]
#[command(long_about = "
fusion-jobs runs scheduled jobs across a pool of processes. Every process
arms timers for the configured jobs; a shared job store decides which process
runs each occurrence, so a job never runs twice at the same time.

EXAMPLES:
    # Start the scheduler and HTTP API with the default configuration
    fusion-jobs serve

    # Bind to all interfaces on port 8080
    fusion-jobs serve --host 0.0.0.0 --port 8080

    # Use a single configuration file
    fusion-jobs --config /etc/fusion-jobs/production.toml serve

    # Check configuration and job definitions without starting
    fusion-jobs serve --dry-run

    # Apply, preview or roll back job store migrations
    fusion-jobs migrate
    fusion-jobs migrate --dry-run
    fusion-jobs migrate --rollback 1
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Read this TOML file instead of the layered `config/` directory
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Environment overlay to load (`config/{env}.toml`)
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Log errors only
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the scheduler and the HTTP API (default)
    Serve {
        /// Address to bind to, e.g. 127.0.0.1 or 0.0.0.0
        #[arg(long, value_name = "ADDRESS", value_parser = super::validation::validate_host_address)]
        host: Option<String>,

        /// Port to listen on (1-65535)
        #[arg(short, long, value_name = "PORT", value_parser = super::validation::validate_port)]
        port: Option<u16>,

        /// Log level, overriding the config file and --verbose/--quiet
        #[arg(long, value_enum)]
        log_level: Option<LogLevel>,

        /// Validate configuration and job definitions, then exit
        #[arg(long)]
        dry_run: bool,
    },
    /// Manage the job store schema (postgres store only)
    Migrate {
        /// List pending migrations without applying them
        #[arg(long, conflicts_with = "rollback")]
        dry_run: bool,

        /// Revert the last N migrations (1-100)
        #[arg(long, value_name = "STEPS", value_parser = super::validation::validate_rollback_steps)]
        rollback: Option<u32>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    #[value(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand() {
        let cli = Cli::try_parse_from(["fusion-jobs"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
        assert!(cli.env.is_none());
    }

    #[test]
    fn test_serve_arguments() {
        let cli = Cli::try_parse_from([
            "fusion-jobs",
            "--env",
            "prod",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--log-level",
            "warning",
        ])
        .unwrap();

        assert_eq!(cli.env, Some(Environment::Production));
        match cli.command {
            Some(Commands::Serve {
                host,
                port,
                log_level,
                dry_run,
            }) => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(8080));
                assert_eq!(log_level, Some(LogLevel::Warn));
                assert!(!dry_run);
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn test_migrate_dry_run_conflicts_with_rollback() {
        let err = Cli::try_parse_from(["fusion-jobs", "migrate", "--dry-run", "--rollback", "2"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);

        let cli = Cli::try_parse_from(["fusion-jobs", "migrate", "--rollback", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Migrate {
                dry_run: false,
                rollback: Some(2)
            })
        ));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let err = Cli::try_parse_from(["fusion-jobs", "--verbose", "--quiet"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["fusion-jobs", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
