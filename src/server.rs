//! Process lifecycle: job store, scheduler and HTTP server.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;

use crate::api::create_router;
use crate::config::{JobsConfig, Settings, StoreBackend};
use crate::db::{establish_async_connection_pool, run_pending_migrations};
use crate::jobs::{JobQueue, builtin_behaviors};
use crate::state::AppState;
use crate::store::create_store;

pub struct Server {
    settings: Settings,
}

impl Server {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Connect the job store, register the configured jobs and serve HTTP
    /// until SIGINT or SIGTERM. On the way out timers are stopped and claimed
    /// runs are awaited so their locks are released.
    pub async fn run(self) -> anyhow::Result<()> {
        let settings = &self.settings;

        tracing::info!(
            app_name = %settings.application.name,
            app_version = %settings.application.version,
            "Application starting"
        );
        tracing::info!(
            host = %settings.server.host,
            port = settings.server.port,
            jobs_endpoint = %settings.server.jobs_endpoint,
            "Server configuration loaded"
        );
        tracing::info!(
            store = ?settings.jobs.store,
            scheduling_enabled = settings.jobs.enabled,
            default_concurrency = settings.jobs.default_concurrency,
            definitions = settings.jobs.definitions.len(),
            "Job configuration loaded"
        );

        let queue = Arc::new(self.build_queue().await?);
        register_jobs(&queue, &settings.jobs).await?;

        let state = AppState::new(Arc::clone(&queue), settings.application.version.clone());
        let app = create_router(state, &settings.server.jobs_endpoint);

        let address = settings.server.address();
        let listener = TcpListener::bind(&address).await?;
        tracing::info!(address = %address, "Server listening");

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        queue.shutdown().await;
        tracing::info!("Server shutdown complete");
        served.map_err(Into::into)
    }

    async fn build_queue(&self) -> anyhow::Result<JobQueue> {
        let jobs = &self.settings.jobs;
        let database = &self.settings.database;

        let pool = match jobs.store {
            StoreBackend::Memory => None,
            StoreBackend::Postgres => {
                if database.auto_migrate {
                    let applied = run_pending_migrations(&database.url).await?;
                    tracing::info!(count = applied.len(), "Applied pending migrations");
                }
                tracing::info!(
                    max_connections = database.max_connections,
                    min_connections = database.min_connections,
                    connection_timeout = database.connection_timeout,
                    "Connecting to job store"
                );
                Some(establish_async_connection_pool(database).await?)
            }
        };

        let store = create_store(jobs.store, pool)?;
        Ok(JobQueue::new(store, builtin_behaviors()?, jobs.default_concurrency))
    }
}

/// Add every configured definition, or none when `jobs.enabled` is false.
/// Returns how many were registered.
async fn register_jobs(queue: &JobQueue, jobs: &JobsConfig) -> anyhow::Result<usize> {
    if !jobs.enabled {
        tracing::warn!("Job scheduling disabled, no jobs registered in this process");
        return Ok(0);
    }
    for definition in &jobs.definitions {
        let info = queue.add_job(definition.to_definition()).await?;
        tracing::debug!(job = %info.name, next_run = ?info.next_run, "Job registered");
    }
    Ok(jobs.definitions.len())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
