use std::time::Duration;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::jobs::behavior::BehaviorRef;
use crate::jobs::schedule::ScheduleSpec;
use crate::schema::jobs;

// ============================================================================
// Stored job record
// ============================================================================

/// Shared run-state of a job, one row per job name across the whole pool.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JobRecord {
    pub name: String,
    pub groups: Vec<String>,
    pub enabled: bool,
    pub locked: bool,
    pub next_run: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
    pub time_to_run_ms: Option<i64>,
    pub tasks: Option<JsonValue>,
}

impl JobRecord {
    pub fn in_group(&self, tag: &str) -> bool {
        self.groups.iter().any(|g| g == tag)
    }
}

/// Record written when a job is registered.
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = jobs)]
pub struct NewJobRecord {
    pub name: String,
    pub groups: Vec<String>,
    pub enabled: bool,
    pub locked: bool,
    pub next_run: Option<DateTime<Utc>>,
    pub tasks: Option<JsonValue>,
}

impl NewJobRecord {
    pub fn into_record(self) -> JobRecord {
        JobRecord {
            name: self.name,
            groups: self.groups,
            enabled: self.enabled,
            locked: self.locked,
            next_run: self.next_run,
            last_run: None,
            time_to_run_ms: None,
            tasks: self.tasks,
        }
    }
}

/// Partial update of a stored record. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = jobs)]
pub struct JobChanges {
    pub enabled: Option<bool>,
    pub locked: Option<bool>,
    pub next_run: Option<Option<DateTime<Utc>>>,
    pub last_run: Option<Option<DateTime<Utc>>>,
    pub time_to_run_ms: Option<Option<i64>>,
}

impl JobChanges {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Default::default()
        }
    }

    pub fn next_run(next_run: Option<DateTime<Utc>>) -> Self {
        Self {
            next_run: Some(next_run),
            ..Default::default()
        }
    }

    /// Take the lock. `next_run` is owned by the timer and left alone.
    pub fn claim() -> Self {
        Self {
            locked: Some(true),
            ..Default::default()
        }
    }

    /// Release the lock and record timing of the finished run.
    pub fn release(finished_at: DateTime<Utc>, elapsed: Duration) -> Self {
        let elapsed_ms = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);
        Self {
            locked: Some(false),
            last_run: Some(Some(finished_at)),
            time_to_run_ms: Some(Some(elapsed_ms)),
            ..Default::default()
        }
    }

    pub fn apply(&self, record: &mut JobRecord) {
        if let Some(enabled) = self.enabled {
            record.enabled = enabled;
        }
        if let Some(locked) = self.locked {
            record.locked = locked;
        }
        if let Some(next_run) = self.next_run {
            record.next_run = next_run;
        }
        if let Some(last_run) = self.last_run {
            record.last_run = last_run;
        }
        if let Some(time_to_run_ms) = self.time_to_run_ms {
            record.time_to_run_ms = time_to_run_ms;
        }
    }
}

/// Field predicate for conditional updates. `None` matches any value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobPredicate {
    pub enabled: Option<bool>,
    pub locked: Option<bool>,
}

impl JobPredicate {
    /// Enabled and not currently locked anywhere in the pool.
    pub fn claimable() -> Self {
        Self {
            enabled: Some(true),
            locked: Some(false),
        }
    }

    pub fn matches(&self, record: &JobRecord) -> bool {
        self.enabled.is_none_or(|e| e == record.enabled)
            && self.locked.is_none_or(|l| l == record.locked)
    }
}

/// Selection for multi-record queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFilter {
    All,
    Names(Vec<String>),
    Group(String),
}

impl JobFilter {
    pub fn matches(&self, record: &JobRecord) -> bool {
        match self {
            JobFilter::All => true,
            JobFilter::Names(names) => names.iter().any(|n| n == &record.name),
            JobFilter::Group(tag) => record.in_group(tag),
        }
    }
}

// ============================================================================
// In-process job definition
// ============================================================================

/// Full definition of a job as registered by one process.
///
/// Only the scheduling metadata derived from this reaches the store; the
/// behavior stays in-process.
#[derive(Debug, Clone)]
pub struct JobDefinition {
    pub name: String,
    pub group: Vec<String>,
    pub schedule: Option<ScheduleSpec>,
    pub tasks: Option<Vec<JsonValue>>,
    pub single: bool,
    pub enabled: bool,
    pub behavior: BehaviorRef,
    pub concurrency: Option<usize>,
}

impl JobDefinition {
    pub fn new(name: impl Into<String>, behavior: impl Into<BehaviorRef>) -> Self {
        Self {
            name: name.into(),
            group: Vec::new(),
            schedule: None,
            tasks: None,
            single: false,
            enabled: true,
            behavior: behavior.into(),
            concurrency: None,
        }
    }

    pub fn with_schedule(mut self, schedule: ScheduleSpec) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn with_tasks(mut self, tasks: Vec<JsonValue>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn with_group<I, S>(mut self, group: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group = group.into_iter().map(Into::into).collect();
        self
    }

    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Effective group tags: the configured ones, or the job name alone.
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = Vec::with_capacity(self.group.len().max(1));
        for tag in &self.group {
            if !tag.is_empty() && !groups.contains(tag) {
                groups.push(tag.clone());
            }
        }
        if groups.is_empty() {
            groups.push(self.name.clone());
        }
        groups
    }

    pub fn to_new_record(&self, next_run: Option<DateTime<Utc>>) -> NewJobRecord {
        NewJobRecord {
            name: self.name.clone(),
            groups: self.groups(),
            enabled: self.enabled,
            locked: false,
            next_run,
            tasks: self.tasks.clone().map(JsonValue::Array),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::behavior::behavior_fn;
    use serde_json::json;

    fn record() -> JobRecord {
        JobRecord {
            name: "report".to_string(),
            groups: vec!["report".to_string(), "nightly".to_string()],
            enabled: true,
            locked: false,
            next_run: None,
            last_run: None,
            time_to_run_ms: None,
            tasks: None,
        }
    }

    #[test]
    fn test_groups_default_to_name() {
        let def = JobDefinition::new("cleanup", behavior_fn(|_, _| async { Ok(()) }));
        assert_eq!(def.groups(), vec!["cleanup"]);

        let def = def.with_group(["a", "b", "a", ""]);
        assert_eq!(def.groups(), vec!["a", "b"]);
    }

    #[test]
    fn test_new_record_wraps_tasks_in_array() {
        let def = JobDefinition::new("report", BehaviorRef::Named("report.run".into()))
            .with_tasks(vec![json!({"time": 1}), json!({"time": 2})])
            .with_enabled(false);
        let rec = def.to_new_record(None);

        assert!(!rec.enabled);
        assert!(!rec.locked);
        assert_eq!(rec.tasks, Some(json!([{"time": 1}, {"time": 2}])));
    }

    #[test]
    fn test_claimable_predicate() {
        let mut rec = record();
        assert!(JobPredicate::claimable().matches(&rec));

        rec.locked = true;
        assert!(!JobPredicate::claimable().matches(&rec));
        assert!(JobPredicate::default().matches(&rec));

        rec.locked = false;
        rec.enabled = false;
        assert!(!JobPredicate::claimable().matches(&rec));
    }

    #[test]
    fn test_release_changes_apply() {
        let mut rec = record();
        rec.locked = true;
        let now = Utc::now();

        JobChanges::release(now, Duration::from_millis(42)).apply(&mut rec);

        assert!(!rec.locked);
        assert_eq!(rec.last_run, Some(now));
        assert_eq!(rec.time_to_run_ms, Some(42));
        assert!(rec.enabled);
    }

    #[test]
    fn test_next_run_can_be_cleared() {
        let mut rec = record();
        rec.next_run = Some(Utc::now());
        JobChanges::next_run(None).apply(&mut rec);
        assert_eq!(rec.next_run, None);
    }

    #[test]
    fn test_filter_matches() {
        let rec = record();
        assert!(JobFilter::All.matches(&rec));
        assert!(JobFilter::Group("nightly".into()).matches(&rec));
        assert!(!JobFilter::Group("weekly".into()).matches(&rec));
        assert!(JobFilter::Names(vec!["x".into(), "report".into()]).matches(&rec));
    }
}
