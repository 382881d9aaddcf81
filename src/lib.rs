//! fusion-jobs
//!
//! Distributed cron and interval job scheduler. Each process arms timers for
//! the configured jobs and a shared job store arbitrates which process runs
//! every occurrence.

use shadow_rs::shadow;
shadow!(build);

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod logger;
pub mod schema;
pub mod server;
pub mod state;
pub mod store;

pub use state::AppState;

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
