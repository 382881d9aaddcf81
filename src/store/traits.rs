//! JobStore trait definition.

use async_trait::async_trait;

use crate::jobs::models::{JobChanges, JobFilter, JobPredicate, JobRecord, NewJobRecord};
use crate::store::StoreResult;

/// Shared persistence for job run-state.
///
/// Every process in the pool talks to the same store. The only coordination
/// primitive is [`JobStore::conditional_update`], which must be atomic with
/// respect to concurrent callers on the same record.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert the record, or refresh `groups`, `tasks` and `next_run` of an
    /// existing one. Run-state (`enabled`, `locked`, `last_run`,
    /// `time_to_run_ms`) of an existing record is left untouched.
    async fn upsert(&self, record: NewJobRecord) -> StoreResult<()>;

    /// Apply `changes` only if the record named `name` satisfies `predicate`.
    ///
    /// Returns the number of records matched, 0 or 1.
    async fn conditional_update(
        &self,
        name: &str,
        predicate: JobPredicate,
        changes: JobChanges,
    ) -> StoreResult<u64>;

    /// Apply `changes` unconditionally to the record named `name`.
    async fn update(&self, name: &str, changes: JobChanges) -> StoreResult<u64>;

    /// Apply `changes` to every record carrying the `group` tag.
    async fn update_many(&self, group: &str, changes: JobChanges) -> StoreResult<u64>;

    async fn find_one(&self, name: &str) -> StoreResult<Option<JobRecord>>;

    /// Records matching `filter`, ordered by name.
    async fn find_many(&self, filter: JobFilter) -> StoreResult<Vec<JobRecord>>;
}
