//! In-process job store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::jobs::models::{JobChanges, JobFilter, JobPredicate, JobRecord, NewJobRecord};
use crate::store::{JobStore, StoreError, StoreResult};

/// Job store backed by a mutex-guarded map.
///
/// Several schedulers sharing one `Arc<MemoryJobStore>` behave like a pool of
/// processes sharing a database.
#[derive(Default)]
pub struct MemoryJobStore {
    records: Mutex<BTreeMap<String, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> StoreResult<MutexGuard<'_, BTreeMap<String, JobRecord>>> {
        self.records
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn upsert(&self, record: NewJobRecord) -> StoreResult<()> {
        let mut records = self.records()?;
        match records.get_mut(&record.name) {
            Some(existing) => {
                existing.groups = record.groups;
                existing.tasks = record.tasks;
                existing.next_run = record.next_run;
            }
            None => {
                records.insert(record.name.clone(), record.into_record());
            }
        }
        Ok(())
    }

    async fn conditional_update(
        &self,
        name: &str,
        predicate: JobPredicate,
        changes: JobChanges,
    ) -> StoreResult<u64> {
        let mut records = self.records()?;
        match records.get_mut(name) {
            Some(record) if predicate.matches(record) => {
                changes.apply(record);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn update(&self, name: &str, changes: JobChanges) -> StoreResult<u64> {
        self.conditional_update(name, JobPredicate::default(), changes)
            .await
    }

    async fn update_many(&self, group: &str, changes: JobChanges) -> StoreResult<u64> {
        let mut records = self.records()?;
        let mut matched = 0;
        for record in records.values_mut().filter(|r| r.in_group(group)) {
            changes.apply(record);
            matched += 1;
        }
        Ok(matched)
    }

    async fn find_one(&self, name: &str) -> StoreResult<Option<JobRecord>> {
        Ok(self.records()?.get(name).cloned())
    }

    async fn find_many(&self, filter: JobFilter) -> StoreResult<Vec<JobRecord>> {
        Ok(self
            .records()?
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn new_record(name: &str, groups: &[&str]) -> NewJobRecord {
        NewJobRecord {
            name: name.to_string(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            enabled: true,
            locked: false,
            next_run: None,
            tasks: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_refreshes_metadata_only() {
        let store = MemoryJobStore::new();
        store.upsert(new_record("report", &["report"])).await.unwrap();
        store
            .update("report", JobChanges::enabled(false))
            .await
            .unwrap();
        store
            .update("report", JobChanges::release(Utc::now(), Duration::from_millis(5)))
            .await
            .unwrap();

        let next = Utc::now() + ChronoDuration::minutes(1);
        let mut again = new_record("report", &["report", "nightly"]);
        again.next_run = Some(next);
        again.tasks = Some(json!([1, 2]));
        store.upsert(again).await.unwrap();

        let rec = store.find_one("report").await.unwrap().unwrap();
        assert_eq!(rec.groups, vec!["report", "nightly"]);
        assert_eq!(rec.next_run, Some(next));
        assert_eq!(rec.tasks, Some(json!([1, 2])));
        assert!(!rec.enabled, "enabled flag survives re-registration");
        assert_eq!(rec.time_to_run_ms, Some(5));
    }

    #[tokio::test]
    async fn test_conditional_update_matches_once() {
        let store = MemoryJobStore::new();
        store.upsert(new_record("a", &["a"])).await.unwrap();

        let first = store
            .conditional_update("a", JobPredicate::claimable(), JobChanges::claim())
            .await
            .unwrap();
        let second = store
            .conditional_update("a", JobPredicate::claimable(), JobChanges::claim())
            .await
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 0);
        assert!(store.find_one("a").await.unwrap().unwrap().locked);
    }

    #[tokio::test]
    async fn test_concurrent_claims_have_single_winner() {
        let store = Arc::new(MemoryJobStore::new());
        store.upsert(new_record("race", &["race"])).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .conditional_update("race", JobPredicate::claimable(), JobChanges::claim())
                    .await
                    .unwrap()
            }));
        }

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_missing_record_matches_nothing() {
        let store = MemoryJobStore::new();
        assert_eq!(
            store.update("ghost", JobChanges::enabled(true)).await.unwrap(),
            0
        );
        assert!(store.find_one("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_many_by_group() {
        let store = MemoryJobStore::new();
        store.upsert(new_record("a", &["nightly"])).await.unwrap();
        store.upsert(new_record("b", &["nightly", "b"])).await.unwrap();
        store.upsert(new_record("c", &["c"])).await.unwrap();

        let matched = store
            .update_many("nightly", JobChanges::enabled(false))
            .await
            .unwrap();
        assert_eq!(matched, 2);

        let disabled = store
            .find_many(JobFilter::All)
            .await
            .unwrap()
            .into_iter()
            .filter(|r| !r.enabled)
            .map(|r| r.name)
            .collect::<Vec<_>>();
        assert_eq!(disabled, vec!["a", "b"]);
    }
}
