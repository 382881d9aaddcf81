//! Logger setup
//!
//! A `tracing-subscriber` registry with:
//! - Console output with color control
//! - File output in Full, Compact or JSON format
//! - Size-based file rotation

pub mod config;
pub mod error;
pub(crate) mod writer;

#[cfg(test)]
mod tests;

pub use config::*;
pub use error::LoggerError;

use std::io::IsTerminal;

use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use writer::RotatingFileWriter;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize the global subscriber with the given configuration.
///
/// `RUST_LOG` takes precedence over `config.level` when set.
pub fn init_logger(config: LoggerConfig) -> anyhow::Result<()> {
    config.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // The file layer goes first so console ANSI settings never leak into
    // span fields written to the file.
    let file_layer = file_layer(&config.file)?;
    let console_layer = config.console.enabled.then(|| {
        let use_ansi = config.console.colored && std::io::stdout().is_terminal();
        fmt::layer()
            .with_ansi(use_ansi)
            .with_target(true)
            .with_level(true)
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(filter)
        .try_init()?;

    Ok(())
}

fn file_layer(config: &FileConfig) -> anyhow::Result<Option<BoxedLayer>> {
    if !config.enabled {
        return Ok(None);
    }
    let writer = RotatingFileWriter::new(config)?;

    let layer = match config.format {
        LogFormat::Full => fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .compact()
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_ansi(false)
            .json()
            .with_writer(writer)
            .boxed(),
    };
    Ok(Some(layer))
}
