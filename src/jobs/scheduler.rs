//! Per-job re-arming timers.
//!
//! Each armed job gets one timer task. On every occurrence it persists the
//! following `next_run` itself, in order, and only then hands the run to the
//! coordinator on a tracked task so shutdown can wait for claimed runs.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::jobs::coordinator::{ExecutionCoordinator, Trigger};
use crate::jobs::models::{JobChanges, JobDefinition};
use crate::jobs::schedule::Schedule;

/// Handle to an armed timer. Dropping it disarms the timer.
#[derive(Debug)]
pub struct TimerHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    pub fn is_armed(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Disarm and wait for the timer task to exit, including a `next_run`
    /// write it may have in flight.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::error!(error = %e, "Timer task ended abnormally");
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Arms timers that hand each occurrence to the [`ExecutionCoordinator`].
#[derive(Clone)]
pub struct Scheduler {
    coordinator: Arc<ExecutionCoordinator>,
    runs: TaskTracker,
}

impl Scheduler {
    pub fn new(coordinator: Arc<ExecutionCoordinator>) -> Self {
        Self {
            coordinator,
            runs: TaskTracker::new(),
        }
    }

    /// Start a timer firing first at `first_run`, then at every following
    /// occurrence of `schedule`. One-shot schedules fire once.
    pub fn arm(
        &self,
        definition: Arc<JobDefinition>,
        schedule: Schedule,
        first_run: DateTime<Utc>,
    ) -> TimerHandle {
        let token = CancellationToken::new();
        tracing::debug!(job = %definition.name, next_run = %first_run, "Timer armed");

        let task = tokio::spawn(timer_loop(
            Arc::clone(&self.coordinator),
            self.runs.clone(),
            definition,
            schedule,
            first_run,
            token.clone(),
        ));

        TimerHandle {
            token,
            task: Some(task),
        }
    }

    /// Scheduled runs started and not yet finished.
    pub fn runs_in_flight(&self) -> usize {
        self.runs.len()
    }

    /// Wait for every scheduled run already started. Timers must be stopped
    /// first or new runs keep arriving.
    pub async fn drain(&self) {
        self.runs.close();
        self.runs.wait().await;
    }
}

async fn timer_loop(
    coordinator: Arc<ExecutionCoordinator>,
    runs: TaskTracker,
    definition: Arc<JobDefinition>,
    schedule: Schedule,
    mut next: DateTime<Utc>,
    token: CancellationToken,
) {
    let name = definition.name.as_str();
    loop {
        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        // Never compute from before the occurrence just reached, or an early
        // wake-up would yield the same instant again.
        let candidate = if schedule.is_recurring() {
            schedule.next_after(Utc::now().max(next))
        } else {
            None
        };

        // Written here, not in the run, so writes for one job never reorder.
        // The deadline above is absolute, so a slow write does not shift it.
        if let Err(e) = coordinator
            .store()
            .update(name, JobChanges::next_run(candidate))
            .await
        {
            tracing::error!(job = %name, error = %e, "Failed to persist next run");
        }

        runs.spawn(fire(Arc::clone(&coordinator), Arc::clone(&definition)));

        match candidate {
            Some(candidate) => next = candidate,
            None => {
                tracing::debug!(job = %name, "No further occurrences, timer finished");
                break;
            }
        }
    }
}

async fn fire(coordinator: Arc<ExecutionCoordinator>, definition: Arc<JobDefinition>) {
    if let Err(e) = coordinator
        .claim_and_run(&definition, None, Trigger::Scheduled)
        .await
    {
        tracing::error!(job = %definition.name, error = %e, "Scheduled run aborted");
    }
}
