//! Process-level entry point tying registry, timers and the shared store together.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::jobs::behavior::BehaviorRegistry;
use crate::jobs::coordinator::{ExecutionCoordinator, RunOutcome, Trigger};
use crate::jobs::error::{SchedulerError, SchedulerResult};
use crate::jobs::models::{JobChanges, JobDefinition, JobFilter, JobRecord};
use crate::jobs::registry::JobRegistry;
use crate::jobs::schedule::{Schedule, ScheduleSpec};
use crate::jobs::scheduler::Scheduler;
use crate::store::JobStore;

/// Schedule metadata returned when a job is added or rescheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleInfo {
    pub name: String,
    pub next_run: Option<DateTime<Utc>>,
    pub recurring: bool,
}

/// Job scheduler for one process of the pool.
pub struct JobQueue {
    registry: JobRegistry,
    coordinator: Arc<ExecutionCoordinator>,
    scheduler: Scheduler,
}

impl JobQueue {
    pub fn new(
        store: Arc<dyn JobStore>,
        behaviors: BehaviorRegistry,
        default_concurrency: usize,
    ) -> Self {
        let coordinator = Arc::new(ExecutionCoordinator::new(
            store,
            Arc::new(behaviors),
            default_concurrency,
        ));
        Self {
            registry: JobRegistry::new(),
            scheduler: Scheduler::new(Arc::clone(&coordinator)),
            coordinator,
        }
    }

    fn store(&self) -> &Arc<dyn JobStore> {
        self.coordinator.store()
    }

    pub fn behaviors(&self) -> &BehaviorRegistry {
        self.coordinator.behaviors()
    }

    /// Register a job, persist its record and arm its timer.
    ///
    /// Single jobs are stored with a null `next_run` and never armed. On any
    /// error the job is left unregistered.
    pub async fn add_job(&self, definition: JobDefinition) -> SchedulerResult<ScheduleInfo> {
        let schedule = if definition.single {
            None
        } else {
            let spec = definition.schedule.as_ref().ok_or_else(|| {
                SchedulerError::schedule_parse(&definition.name, "missing schedule for non-single job")
            })?;
            Some(Schedule::parse(spec)?)
        };
        let next_run = schedule.as_ref().and_then(|s| s.next_after(Utc::now()));
        let recurring = schedule.as_ref().is_some_and(Schedule::is_recurring);

        let definition = Arc::new(definition);
        self.registry
            .insert(Arc::clone(&definition), schedule.clone())?;

        if let Err(e) = self.store().upsert(definition.to_new_record(next_run)).await {
            self.registry.remove(&definition.name);
            tracing::error!(job = %definition.name, error = %e, "Failed to store job");
            return Err(e.into());
        }

        tracing::info!(
            job = %definition.name,
            groups = ?definition.groups(),
            next_run = ?next_run,
            single = definition.single,
            "Job added"
        );

        if let (Some(schedule), Some(first_run)) = (schedule, next_run) {
            let timer = self
                .scheduler
                .arm(Arc::clone(&definition), schedule, first_run);
            self.registry.replace_timer(&definition.name, timer)?;
        }

        Ok(ScheduleInfo {
            name: definition.name.clone(),
            next_run,
            recurring,
        })
    }

    pub fn get(&self, name: &str) -> Option<Arc<JobDefinition>> {
        self.registry.get(name)
    }

    pub fn job_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn is_armed(&self, name: &str) -> bool {
        self.registry.is_armed(name)
    }

    pub async fn enable(&self, name: &str) -> SchedulerResult<()> {
        self.set_enabled(name, true).await
    }

    pub async fn disable(&self, name: &str) -> SchedulerResult<()> {
        self.set_enabled(name, false).await
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> SchedulerResult<()> {
        if !self.registry.contains(name) {
            return Err(SchedulerError::UnknownJob(name.to_string()));
        }
        let matched = self.store().update(name, JobChanges::enabled(enabled)).await?;
        if matched == 0 {
            return Err(SchedulerError::UnknownJob(name.to_string()));
        }
        tracing::info!(job = %name, enabled, "Job enablement changed");
        Ok(())
    }

    /// Enable every stored job tagged `tag`. Returns the matched count.
    pub async fn enable_group(&self, tag: &str) -> SchedulerResult<u64> {
        self.set_group_enabled(tag, true).await
    }

    /// Disable every stored job tagged `tag`. Returns the matched count.
    pub async fn disable_group(&self, tag: &str) -> SchedulerResult<u64> {
        self.set_group_enabled(tag, false).await
    }

    async fn set_group_enabled(&self, tag: &str, enabled: bool) -> SchedulerResult<u64> {
        let matched = self
            .store()
            .update_many(tag, JobChanges::enabled(enabled))
            .await?;
        tracing::info!(group = %tag, enabled, matched, "Group enablement changed");
        Ok(matched)
    }

    /// Replace a job's schedule and re-arm it.
    ///
    /// An unparseable spec leaves the current timer untouched. If the new
    /// `next_run` cannot be persisted the previous schedule is re-armed.
    pub async fn reschedule(&self, name: &str, spec: &ScheduleSpec) -> SchedulerResult<ScheduleInfo> {
        let definition = self
            .registry
            .get(name)
            .ok_or_else(|| SchedulerError::UnknownJob(name.to_string()))?;
        if definition.single {
            return Err(SchedulerError::NotSchedulable(name.to_string()));
        }

        let schedule = Schedule::parse(spec)?;
        let previous = self.registry.schedule(name);
        // The old timer may be writing its own next_run; let it land first
        if let Some(timer) = self.registry.take_timer(name) {
            timer.stop().await;
        }

        let next_run = schedule.next_after(Utc::now());
        if let Err(e) = self.store().update(name, JobChanges::next_run(next_run)).await {
            tracing::error!(job = %name, error = %e, "Failed to persist new schedule, keeping previous");
            if let Some(previous) = previous {
                self.arm(&definition, previous)?;
            }
            return Err(e.into());
        }

        let recurring = schedule.is_recurring();
        self.registry.set_schedule(name, schedule.clone())?;
        self.arm(&definition, schedule)?;

        tracing::info!(job = %name, schedule = %spec, next_run = ?next_run, "Job rescheduled");
        Ok(ScheduleInfo {
            name: name.to_string(),
            next_run,
            recurring,
        })
    }

    fn arm(&self, definition: &Arc<JobDefinition>, schedule: Schedule) -> SchedulerResult<()> {
        if let Some(first_run) = schedule.next_after(Utc::now()) {
            let timer = self.scheduler.arm(Arc::clone(definition), schedule, first_run);
            self.registry.replace_timer(&definition.name, timer)?;
        }
        Ok(())
    }

    /// Cancel the job's pending timer. The store record is not touched.
    pub fn dequeue(&self, name: &str) -> bool {
        let disarmed = self
            .registry
            .take_timer(name)
            .is_some_and(|timer| timer.is_armed());
        if disarmed {
            tracing::info!(job = %name, "Job dequeued");
        }
        disarmed
    }

    /// Claim and run a job now, recurring or single.
    ///
    /// `payloads` replaces the stored task list when non-empty.
    pub async fn run_single(
        &self,
        name: &str,
        payloads: Option<Vec<JsonValue>>,
    ) -> SchedulerResult<RunOutcome> {
        let definition = self
            .registry
            .get(name)
            .ok_or_else(|| SchedulerError::UnknownJob(name.to_string()))?;
        self.coordinator
            .claim_and_run(&definition, payloads, Trigger::Manual)
            .await
    }

    /// Every record in the shared store, ordered by name.
    pub async fn list_jobs(&self) -> SchedulerResult<Vec<JobRecord>> {
        Ok(self.store().find_many(JobFilter::All).await?)
    }

    pub async fn find_group(&self, tag: &str) -> SchedulerResult<Vec<JobRecord>> {
        Ok(self.store().find_many(JobFilter::Group(tag.to_string())).await?)
    }

    pub async fn find_job(&self, name: &str) -> SchedulerResult<Option<JobRecord>> {
        Ok(self.store().find_one(name).await?)
    }

    /// Stop every timer, then wait for scheduled runs already claimed to
    /// finish and release their lock.
    pub async fn shutdown(&self) {
        let timers = self.registry.take_all_timers();
        let disarmed = timers.iter().filter(|timer| timer.is_armed()).count();
        for timer in timers {
            timer.stop().await;
        }
        tracing::info!(
            disarmed,
            in_flight = self.scheduler.runs_in_flight(),
            "Job timers stopped, waiting for running jobs"
        );
        self.scheduler.drain().await;
        tracing::info!("Job queue shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::behavior::{BehaviorRef, behavior_fn};
    use crate::store::{MemoryJobStore, StoreError, StoreResult};
    use crate::jobs::models::{JobPredicate, NewJobRecord};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    fn noop() -> BehaviorRef {
        BehaviorRef::from(behavior_fn(|_ctx, _payload| async { Ok(()) }))
    }

    fn queue(store: Arc<dyn JobStore>) -> JobQueue {
        JobQueue::new(store, BehaviorRegistry::new(), 1)
    }

    fn every_minute(name: &str) -> JobDefinition {
        JobDefinition::new(name, noop()).with_schedule(ScheduleSpec::text("every 1 minute"))
    }

    #[tokio::test]
    async fn test_add_job_persists_and_arms() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = queue(store.clone());

        let info = queue.add_job(every_minute("report")).await.unwrap();

        assert!(info.recurring);
        assert!(info.next_run.unwrap() > Utc::now());
        assert!(queue.is_armed("report"));
        let rec = store.find_one("report").await.unwrap().unwrap();
        assert_eq!(rec.next_run, info.next_run);
        assert_eq!(rec.groups, vec!["report"]);
        assert!(!rec.locked);
    }

    #[tokio::test]
    async fn test_duplicate_add_leaves_first_untouched() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = queue(store.clone());
        queue
            .add_job(every_minute("dup").with_tasks(vec![json!(1)]))
            .await
            .unwrap();

        let err = queue
            .add_job(every_minute("dup").with_tasks(vec![json!(2)]))
            .await
            .unwrap_err();

        assert!(matches!(err, SchedulerError::DuplicateJob(_)));
        assert_eq!(err.to_string(), "Job already loaded: dup");
        let rec = store.find_one("dup").await.unwrap().unwrap();
        assert_eq!(rec.tasks, Some(json!([1])));
    }

    #[tokio::test]
    async fn test_invalid_schedule_is_not_registered() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = queue(store.clone());

        let def = JobDefinition::new("bad", noop()).with_schedule(ScheduleSpec::text("whenever"));
        assert!(matches!(
            queue.add_job(def).await,
            Err(SchedulerError::ScheduleParse { .. })
        ));
        assert!(queue.get("bad").is_none());
        assert!(store.find_one("bad").await.unwrap().is_none());

        let unscheduled = JobDefinition::new("none", noop());
        assert!(queue.add_job(unscheduled).await.is_err());
    }

    #[tokio::test]
    async fn test_single_job_is_stored_but_not_armed() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = queue(store.clone());

        let info = queue
            .add_job(JobDefinition::new("manual", noop()).single())
            .await
            .unwrap();

        assert_eq!(info.next_run, None);
        assert!(!queue.is_armed("manual"));
        assert_eq!(store.find_one("manual").await.unwrap().unwrap().next_run, None);
        assert!(matches!(
            queue
                .reschedule("manual", &ScheduleSpec::text("every 5 seconds"))
                .await,
            Err(SchedulerError::NotSchedulable(_))
        ));
    }

    #[tokio::test]
    async fn test_enable_disable() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = queue(store.clone());
        queue.add_job(every_minute("toggle")).await.unwrap();

        queue.disable("toggle").await.unwrap();
        queue.disable("toggle").await.unwrap();
        assert!(!store.find_one("toggle").await.unwrap().unwrap().enabled);
        assert!(queue.is_armed("toggle"));

        queue.enable("toggle").await.unwrap();
        assert!(store.find_one("toggle").await.unwrap().unwrap().enabled);

        assert!(matches!(
            queue.enable("nope").await,
            Err(SchedulerError::UnknownJob(_))
        ));
    }

    #[tokio::test]
    async fn test_group_enable_disable() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = queue(store.clone());
        queue
            .add_job(every_minute("a").with_group(["nightly"]))
            .await
            .unwrap();
        queue
            .add_job(every_minute("b").with_group(["nightly", "b"]))
            .await
            .unwrap();
        queue.add_job(every_minute("c")).await.unwrap();

        assert_eq!(queue.disable_group("nightly").await.unwrap(), 2);
        let nightly = queue.find_group("nightly").await.unwrap();
        assert_eq!(nightly.len(), 2);
        assert!(nightly.iter().all(|r| !r.enabled));
        assert!(store.find_one("c").await.unwrap().unwrap().enabled);

        assert_eq!(queue.enable_group("nightly").await.unwrap(), 2);
        assert!(queue.find_group("nightly").await.unwrap().iter().all(|r| r.enabled));

        assert_eq!(queue.disable_group("nothing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_single_on_disabled_job_runs_nothing() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = queue(store.clone());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let def = JobDefinition::new(
            "quiet",
            behavior_fn(move |_ctx, _payload| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        )
        .single();
        queue.add_job(def).await.unwrap();
        queue.disable("quiet").await.unwrap();

        let outcome = queue.run_single("quiet", Some(vec![json!(1)])).await.unwrap();
        assert!(!outcome.ran());
        assert!(outcome.job_error().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_single_with_explicit_payloads() {
        let store = Arc::new(MemoryJobStore::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut behaviors = BehaviorRegistry::new();
        behaviors.namespace("reports").register_fn("collect", move |_ctx, payload| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(payload);
                Ok(())
            }
        });
        let queue = JobQueue::new(store, behaviors, 1);
        queue
            .add_job(
                JobDefinition::new("collect", BehaviorRef::Named("reports.collect".into()))
                    .with_tasks(vec![json!("stored")])
                    .single(),
            )
            .await
            .unwrap();

        queue
            .run_single("collect", Some(vec![json!("a"), json!("b")]))
            .await
            .unwrap();
        queue.run_single("collect", None).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![json!("a"), json!("b"), json!("stored")]
        );
        assert!(matches!(
            queue.run_single("ghost", None).await,
            Err(SchedulerError::UnknownJob(_))
        ));
    }

    #[tokio::test]
    async fn test_reschedule_with_bad_spec_keeps_timer() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = queue(store.clone());
        queue.add_job(every_minute("keep")).await.unwrap();

        let err = queue
            .reschedule("keep", &ScheduleSpec::text("every blue moon"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::ScheduleParse { .. }));
        assert!(queue.is_armed("keep"));

        let info = queue
            .reschedule("keep", &ScheduleSpec::cron("0 0 * * *", false))
            .await
            .unwrap();
        assert!(queue.is_armed("keep"));
        assert_eq!(
            store.find_one("keep").await.unwrap().unwrap().next_run,
            info.next_run
        );
    }

    #[tokio::test]
    async fn test_dequeue_only_disarms() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = queue(store.clone());
        queue.add_job(every_minute("gone")).await.unwrap();
        let before = store.find_one("gone").await.unwrap().unwrap();

        assert!(queue.dequeue("gone"));
        assert!(!queue.is_armed("gone"));
        assert!(!queue.dequeue("gone"));
        assert_eq!(store.find_one("gone").await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_recurring_job_runs_every_task() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = queue(store.clone());
        let last = Arc::new(Mutex::new(JsonValue::Null));
        let sink = Arc::clone(&last);
        let def = JobDefinition::new(
            "ticks",
            behavior_fn(move |_ctx, payload| {
                let sink = Arc::clone(&sink);
                async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    *sink.lock().unwrap() = payload;
                    Ok(())
                }
            }),
        )
        .with_schedule(ScheduleSpec::text("every 1 second"))
        .with_tasks(vec![json!({"time": 1}), json!({"time": 2})]);
        queue.add_job(def).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1400)).await;
        // A fire may be mid-run right at the deadline.
        let mut rec = store.find_one("ticks").await.unwrap().unwrap();
        for _ in 0..10 {
            if !rec.locked {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            rec = store.find_one("ticks").await.unwrap().unwrap();
        }

        assert_eq!(*last.lock().unwrap(), json!({"time": 2}));
        assert!(!rec.locked);
        assert!(rec.time_to_run_ms.unwrap() > 0);
        queue.shutdown().await;
        assert!(!queue.is_armed("ticks"));
    }

    /// Store whose single-record updates can be made to fail.
    struct FlakyStore {
        inner: MemoryJobStore,
        fail_updates: AtomicBool,
    }

    #[async_trait]
    impl JobStore for FlakyStore {
        async fn upsert(&self, record: NewJobRecord) -> StoreResult<()> {
            self.inner.upsert(record).await
        }

        async fn conditional_update(
            &self,
            name: &str,
            predicate: JobPredicate,
            changes: JobChanges,
        ) -> StoreResult<u64> {
            self.inner.conditional_update(name, predicate, changes).await
        }

        async fn update(&self, name: &str, changes: JobChanges) -> StoreResult<u64> {
            if self.fail_updates.load(Ordering::SeqCst) {
                return Err(StoreError::Connection("connection reset".to_string()));
            }
            self.inner.update(name, changes).await
        }

        async fn update_many(&self, group: &str, changes: JobChanges) -> StoreResult<u64> {
            self.inner.update_many(group, changes).await
        }

        async fn find_one(&self, name: &str) -> StoreResult<Option<JobRecord>> {
            self.inner.find_one(name).await
        }

        async fn find_many(&self, filter: JobFilter) -> StoreResult<Vec<JobRecord>> {
            self.inner.find_many(filter).await
        }
    }

    #[tokio::test]
    async fn test_reschedule_store_failure_rearms_previous() {
        let store = Arc::new(FlakyStore {
            inner: MemoryJobStore::new(),
            fail_updates: AtomicBool::new(false),
        });
        let queue = queue(store.clone());
        queue.add_job(every_minute("flaky")).await.unwrap();

        store.fail_updates.store(true, Ordering::SeqCst);
        let err = queue
            .reschedule("flaky", &ScheduleSpec::text("every 2 hours"))
            .await
            .unwrap_err();

        assert!(matches!(err, SchedulerError::Store(_)));
        assert!(queue.is_armed("flaky"));
        assert_eq!(
            queue.registry.schedule("flaky").unwrap().expression(),
            Schedule::parse(&ScheduleSpec::text("every 1 minute"))
                .unwrap()
                .expression()
        );
    }

    #[tokio::test]
    async fn test_restart_adopts_stored_run_state() {
        let store = Arc::new(MemoryJobStore::new());
        let first = queue(store.clone());
        first.add_job(every_minute("survivor")).await.unwrap();
        first.disable("survivor").await.unwrap();
        first.shutdown().await;

        let second = queue(store.clone());
        second
            .add_job(every_minute("survivor").with_group(["reports"]))
            .await
            .unwrap();

        let rec = store.find_one("survivor").await.unwrap().unwrap();
        assert!(!rec.enabled);
        assert_eq!(rec.groups, vec!["reports"]);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_claimed_run_to_release() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = queue(store.clone());
        let def = JobDefinition::new(
            "long",
            behavior_fn(|_ctx, _payload| async {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                Ok(())
            }),
        )
        .with_schedule(ScheduleSpec::text("every 1 second"));
        queue.add_job(def).await.unwrap();

        let mut locked = false;
        for _ in 0..60 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if store.find_one("long").await.unwrap().unwrap().locked {
                locked = true;
                break;
            }
        }
        assert!(locked, "job never claimed");

        queue.shutdown().await;

        let rec = store.find_one("long").await.unwrap().unwrap();
        assert!(!rec.locked);
        assert!(rec.last_run.is_some());
        assert!(!queue.is_armed("long"));
    }

    /// Store whose first `next_run` write stalls.
    struct SlowNextRunStore {
        inner: MemoryJobStore,
        stalled: AtomicBool,
    }

    #[async_trait]
    impl JobStore for SlowNextRunStore {
        async fn upsert(&self, record: NewJobRecord) -> StoreResult<()> {
            self.inner.upsert(record).await
        }

        async fn conditional_update(
            &self,
            name: &str,
            predicate: JobPredicate,
            changes: JobChanges,
        ) -> StoreResult<u64> {
            self.inner.conditional_update(name, predicate, changes).await
        }

        async fn update(&self, name: &str, changes: JobChanges) -> StoreResult<u64> {
            if changes.next_run.is_some() && !self.stalled.swap(true, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(600)).await;
            }
            self.inner.update(name, changes).await
        }

        async fn update_many(&self, group: &str, changes: JobChanges) -> StoreResult<u64> {
            self.inner.update_many(group, changes).await
        }

        async fn find_one(&self, name: &str) -> StoreResult<Option<JobRecord>> {
            self.inner.find_one(name).await
        }

        async fn find_many(&self, filter: JobFilter) -> StoreResult<Vec<JobRecord>> {
            self.inner.find_many(filter).await
        }
    }

    #[tokio::test]
    async fn test_reschedule_wins_over_in_flight_fire() {
        let store = Arc::new(SlowNextRunStore {
            inner: MemoryJobStore::new(),
            stalled: AtomicBool::new(false),
        });
        let queue = queue(store.clone());
        queue
            .add_job(JobDefinition::new("moving", noop()).with_schedule(ScheduleSpec::text("every 1 second")))
            .await
            .unwrap();

        // Lands while the first fire is still writing its next_run
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let info = queue
            .reschedule("moving", &ScheduleSpec::text("every 2 hours"))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(700)).await;
        let rec = store.find_one("moving").await.unwrap().unwrap();
        assert_eq!(rec.next_run, info.next_run);
        assert!(rec.next_run.unwrap() > Utc::now());
        queue.shutdown().await;
    }
}
