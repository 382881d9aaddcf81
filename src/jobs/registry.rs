use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::jobs::error::{SchedulerError, SchedulerResult};
use crate::jobs::models::JobDefinition;
use crate::jobs::schedule::Schedule;
use crate::jobs::scheduler::TimerHandle;

/// A job as known to this process.
#[derive(Debug)]
pub struct RegisteredJob {
    pub definition: Arc<JobDefinition>,
    pub schedule: Option<Schedule>,
    pub timer: Option<TimerHandle>,
}

/// Per-process mapping from job name to its definition and live timer.
///
/// Never consulted for lock ownership; that lives in the shared store only.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: DashMap<String, RegisteredJob>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Fails without side effects if the name is taken.
    pub fn insert(
        &self,
        definition: Arc<JobDefinition>,
        schedule: Option<Schedule>,
    ) -> SchedulerResult<()> {
        match self.jobs.entry(definition.name.clone()) {
            Entry::Occupied(entry) => Err(SchedulerError::DuplicateJob(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(RegisteredJob {
                    definition,
                    schedule,
                    timer: None,
                });
                Ok(())
            }
        }
    }

    pub fn remove(&self, name: &str) -> Option<RegisteredJob> {
        self.jobs.remove(name).map(|(_, job)| job)
    }

    pub fn get(&self, name: &str) -> Option<Arc<JobDefinition>> {
        self.jobs.get(name).map(|job| Arc::clone(&job.definition))
    }

    pub fn schedule(&self, name: &str) -> Option<Schedule> {
        self.jobs.get(name).and_then(|job| job.schedule.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    pub fn is_armed(&self, name: &str) -> bool {
        self.jobs
            .get(name)
            .and_then(|job| job.timer.as_ref().map(TimerHandle::is_armed))
            .unwrap_or(false)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.jobs.iter().map(|job| job.key().clone()).collect();
        names.sort_unstable();
        names
    }

    pub fn set_schedule(&self, name: &str, schedule: Schedule) -> SchedulerResult<()> {
        let mut job = self
            .jobs
            .get_mut(name)
            .ok_or_else(|| SchedulerError::UnknownJob(name.to_string()))?;
        job.schedule = Some(schedule);
        Ok(())
    }

    /// Install a new timer; the previous one, if any, is disarmed.
    pub fn replace_timer(&self, name: &str, timer: TimerHandle) -> SchedulerResult<()> {
        let mut job = self
            .jobs
            .get_mut(name)
            .ok_or_else(|| SchedulerError::UnknownJob(name.to_string()))?;
        job.timer = Some(timer);
        Ok(())
    }

    /// Detach the job's timer, leaving it to the caller to stop.
    pub fn take_timer(&self, name: &str) -> Option<TimerHandle> {
        self.jobs.get_mut(name).and_then(|mut job| job.timer.take())
    }

    /// Detach every timer.
    pub fn take_all_timers(&self) -> Vec<TimerHandle> {
        self.jobs
            .iter_mut()
            .filter_map(|mut job| job.timer.take())
            .collect()
    }
}
