//! Claim, run and release protocol against the shared job store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value as JsonValue;
use tokio::time::Instant;
use uuid::Uuid;

use crate::jobs::behavior::BehaviorRegistry;
use crate::jobs::error::{SchedulerError, SchedulerResult, TaskError};
use crate::jobs::models::{JobChanges, JobDefinition, JobPredicate, JobRecord};
use crate::jobs::runner::TaskRunner;
use crate::store::JobStore;

/// Why a run was not started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    Locked,
}

/// Result of one claim-and-run pass.
///
/// Coordination failures are returned as `Err(SchedulerError)` instead; a
/// job error only exists once a claim has been taken and released.
#[derive(Debug)]
pub enum RunOutcome {
    Skipped(SkipReason),
    Completed { time_to_run: Duration },
    Failed { time_to_run: Duration, error: TaskError },
}

impl RunOutcome {
    pub fn ran(&self) -> bool {
        !matches!(self, RunOutcome::Skipped(_))
    }

    pub fn job_error(&self) -> Option<&TaskError> {
        match self {
            RunOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn into_job_error(self) -> Option<TaskError> {
        match self {
            RunOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// What started the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Manual,
    /// Timer fire. The timer has already persisted the next `next_run`.
    Scheduled,
}

pub struct ExecutionCoordinator {
    store: Arc<dyn JobStore>,
    behaviors: Arc<BehaviorRegistry>,
    default_concurrency: usize,
}

impl ExecutionCoordinator {
    pub fn new(
        store: Arc<dyn JobStore>,
        behaviors: Arc<BehaviorRegistry>,
        default_concurrency: usize,
    ) -> Self {
        Self {
            store,
            behaviors,
            default_concurrency: default_concurrency.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn behaviors(&self) -> &BehaviorRegistry {
        &self.behaviors
    }

    /// Claim the job pool-wide, run its tasks and release the claim.
    ///
    /// `payloads` overrides the stored task list when non-empty.
    pub async fn claim_and_run(
        &self,
        job: &JobDefinition,
        payloads: Option<Vec<JsonValue>>,
        trigger: Trigger,
    ) -> SchedulerResult<RunOutcome> {
        let behavior = self.behaviors.resolve(&job.behavior)?;

        let record = self
            .store
            .find_one(&job.name)
            .await?
            .ok_or_else(|| SchedulerError::UnknownJob(job.name.clone()))?;

        if !record.enabled {
            tracing::info!(job = %job.name, "Job disabled, skipping");
            return Ok(RunOutcome::Skipped(SkipReason::Disabled));
        }

        let matched = self
            .store
            .conditional_update(&job.name, JobPredicate::claimable(), JobChanges::claim())
            .await?;

        if matched == 0 {
            tracing::info!(job = %job.name, matched, ?trigger, "Job locked, skipping");
            return Ok(RunOutcome::Skipped(SkipReason::Locked));
        }

        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let payloads = resolve_payloads(payloads, &record);
        let runner = TaskRunner::new(job.concurrency.unwrap_or(self.default_concurrency));

        tracing::debug!(
            job = %job.name,
            %run_id,
            tasks = payloads.len(),
            concurrency = runner.concurrency(),
            "Job claimed, running tasks"
        );

        let error = runner.run(&job.name, run_id, behavior, payloads).await;
        let time_to_run = started.elapsed();

        let released = self
            .store
            .update(&job.name, JobChanges::release(Utc::now(), time_to_run))
            .await;
        if let Err(e) = released {
            tracing::error!(job = %job.name, error = %e, "Failed to release job lock");
            return Err(e.into());
        }

        let elapsed_ms = time_to_run.as_millis() as u64;
        match error {
            Some(error) => {
                tracing::warn!(job = %job.name, elapsed_ms, error = %error, "Job failed");
                Ok(RunOutcome::Failed { time_to_run, error })
            }
            None => {
                tracing::info!(job = %job.name, elapsed_ms, "Job completed");
                Ok(RunOutcome::Completed { time_to_run })
            }
        }
    }
}

/// Explicit payloads, else the stored task list, else a single null payload.
fn resolve_payloads(explicit: Option<Vec<JsonValue>>, record: &JobRecord) -> Vec<JsonValue> {
    if let Some(payloads) = explicit.filter(|p| !p.is_empty()) {
        return payloads;
    }
    match &record.tasks {
        Some(JsonValue::Array(tasks)) if !tasks.is_empty() => tasks.clone(),
        Some(JsonValue::Array(_)) | Some(JsonValue::Null) | None => vec![JsonValue::Null],
        Some(other) => vec![other.clone()],
    }
}
