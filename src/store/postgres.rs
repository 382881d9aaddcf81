//! PostgreSQL job store shared by every process in the pool.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::db::AsyncDbPool;
use crate::jobs::models::{JobChanges, JobFilter, JobPredicate, JobRecord, NewJobRecord};
use crate::schema::jobs;
use crate::store::{JobStore, StoreError, StoreResult};

#[derive(Clone)]
pub struct PostgresJobStore {
    pool: AsyncDbPool,
}

impl PostgresJobStore {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> StoreResult<PooledConnection<'_, AsyncPgConnection>> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

/// Values a boolean column may hold for the predicate to match.
fn allowed(value: Option<bool>) -> Vec<bool> {
    match value {
        Some(v) => vec![v],
        None => vec![true, false],
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn upsert(&self, record: NewJobRecord) -> StoreResult<()> {
        let mut conn = self.conn().await?;

        diesel::insert_into(jobs::table)
            .values(&record)
            .on_conflict(jobs::name)
            .do_update()
            .set((
                jobs::groups.eq(excluded(jobs::groups)),
                jobs::tasks.eq(excluded(jobs::tasks)),
                jobs::next_run.eq(excluded(jobs::next_run)),
                jobs::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    async fn conditional_update(
        &self,
        name: &str,
        predicate: JobPredicate,
        changes: JobChanges,
    ) -> StoreResult<u64> {
        let mut conn = self.conn().await?;

        let target = jobs::table
            .filter(jobs::name.eq(name))
            .filter(jobs::enabled.eq_any(allowed(predicate.enabled)))
            .filter(jobs::locked.eq_any(allowed(predicate.locked)));

        let matched = diesel::update(target)
            .set((&changes, jobs::updated_at.eq(Utc::now())))
            .execute(&mut conn)
            .await?;

        Ok(matched as u64)
    }

    async fn update(&self, name: &str, changes: JobChanges) -> StoreResult<u64> {
        let mut conn = self.conn().await?;

        let matched = diesel::update(jobs::table.find(name))
            .set((&changes, jobs::updated_at.eq(Utc::now())))
            .execute(&mut conn)
            .await?;

        Ok(matched as u64)
    }

    async fn update_many(&self, group: &str, changes: JobChanges) -> StoreResult<u64> {
        let mut conn = self.conn().await?;

        let matched = diesel::update(jobs::table.filter(jobs::groups.contains(vec![group.to_string()])))
            .set((&changes, jobs::updated_at.eq(Utc::now())))
            .execute(&mut conn)
            .await?;

        Ok(matched as u64)
    }

    async fn find_one(&self, name: &str) -> StoreResult<Option<JobRecord>> {
        let mut conn = self.conn().await?;

        let record = jobs::table
            .find(name)
            .select(JobRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(record)
    }

    async fn find_many(&self, filter: JobFilter) -> StoreResult<Vec<JobRecord>> {
        let mut conn = self.conn().await?;

        let records = match filter {
            JobFilter::All => {
                jobs::table
                    .select(JobRecord::as_select())
                    .order(jobs::name.asc())
                    .load(&mut conn)
                    .await?
            }
            JobFilter::Names(names) => {
                jobs::table
                    .filter(jobs::name.eq_any(names))
                    .select(JobRecord::as_select())
                    .order(jobs::name.asc())
                    .load(&mut conn)
                    .await?
            }
            JobFilter::Group(tag) => {
                jobs::table
                    .filter(jobs::groups.contains(vec![tag]))
                    .select(JobRecord::as_select())
                    .order(jobs::name.asc())
                    .load(&mut conn)
                    .await?
            }
        };

        Ok(records)
    }
}
