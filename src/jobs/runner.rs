use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value as JsonValue;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};
use uuid::Uuid;

use crate::jobs::behavior::{JobBehavior, TaskContext};
use crate::jobs::error::TaskError;

/// Runs a behavior once per task payload with bounded concurrency.
#[derive(Debug, Clone, Copy)]
pub struct TaskRunner {
    concurrency: usize,
}

impl TaskRunner {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every payload and return the first failure, if any.
    ///
    /// After a failure no further payloads are started, but invocations
    /// already in flight are awaited before returning.
    pub async fn run(
        &self,
        job: &str,
        run_id: Uuid,
        behavior: Arc<dyn JobBehavior>,
        payloads: Vec<JsonValue>,
    ) -> Option<TaskError> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let failed = Arc::new(AtomicBool::new(false));
        let mut set: JoinSet<Option<TaskError>> = JoinSet::new();
        let mut indices: HashMap<task::Id, usize> = HashMap::new();
        let mut first_error: Option<TaskError> = None;

        for (task_index, payload) in payloads.into_iter().enumerate() {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            if failed.load(Ordering::SeqCst) {
                break;
            }

            let behavior = Arc::clone(&behavior);
            let failed = Arc::clone(&failed);
            let ctx = TaskContext {
                run_id,
                job_name: job.to_string(),
                task_index,
            };

            let handle = set.spawn(async move {
                // A panic surfaces here as a JoinError while the permit is
                // still held, so it stops new payloads like an error does
                let invocation = ctx.clone();
                let result = match tokio::spawn(async move {
                    behavior.execute(invocation, payload).await
                })
                .await
                {
                    Ok(result) => result,
                    Err(join_err) => Err(anyhow::anyhow!("task panicked: {join_err}")),
                };
                let error = result.err().map(|source| {
                    failed.store(true, Ordering::SeqCst);
                    TaskError {
                        job: ctx.job_name,
                        task_index: ctx.task_index,
                        source,
                    }
                });
                drop(permit);
                error
            });
            indices.insert(handle.id(), task_index);

            // Collect finished tasks eagerly so an early error wins.
            while let Some(done) = set.try_join_next() {
                record(&mut first_error, done, job, &indices);
            }
        }

        while let Some(done) = set.join_next().await {
            record(&mut first_error, done, job, &indices);
        }

        first_error
    }
}

fn record(
    first_error: &mut Option<TaskError>,
    done: Result<Option<TaskError>, JoinError>,
    job: &str,
    indices: &HashMap<task::Id, usize>,
) {
    let error = match done {
        Ok(error) => error,
        Err(join_err) => {
            let task_index = indices.get(&join_err.id()).copied().unwrap_or_default();
            Some(TaskError {
                job: job.to_string(),
                task_index,
                source: anyhow::anyhow!("task did not complete: {join_err}"),
            })
        }
    };
    if first_error.is_none() {
        *first_error = error;
    }
}
