//! The `TaskStore` trait -- the persistence contract the workflow layer
//! depends on -- and its PostgreSQL implementation.
//!
//! The trait is object-safe so the web server can hold an
//! `Arc<dyn TaskStore>` and tests can swap in an in-memory store.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::models::{Task, TaskDraft};
use crate::queries::tasks as db;

/// Durable collection of [`Task`] records.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Every task, in insertion order.
    async fn find_all(&self) -> Result<Vec<Task>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Task>>;

    /// Tasks due exactly on `date`.
    async fn find_by_due_date(&self, date: NaiveDate) -> Result<Vec<Task>>;

    /// Tasks due within `start..=end`.
    async fn find_by_due_date_range(&self, start: NaiveDate, end: NaiveDate)
    -> Result<Vec<Task>>;

    /// Every task ordered by due date ascending; undated tasks last.
    async fn find_all_ordered_by_due_date(&self) -> Result<Vec<Task>>;

    /// Upsert by id presence: `None` inserts, `Some(id)` replaces (or
    /// creates) the row with that id.
    async fn save(&self, draft: &TaskDraft) -> Result<Task>;

    /// Insert all drafts atomically. On error nothing is persisted.
    async fn insert_all(&self, drafts: &[TaskDraft]) -> Result<Vec<Task>>;

    /// Delete by id. Returns whether a row existed.
    async fn delete_by_id(&self, id: i64) -> Result<bool>;
}

// Compile-time assertion: TaskStore must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn TaskStore) {}
};

/// [`TaskStore`] backed by the `tasks` table.
#[derive(Debug, Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn find_all(&self) -> Result<Vec<Task>> {
        db::list_tasks(&self.pool).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Task>> {
        db::get_task(&self.pool, id).await
    }

    async fn find_by_due_date(&self, date: NaiveDate) -> Result<Vec<Task>> {
        db::list_tasks_due_on(&self.pool, date).await
    }

    async fn find_by_due_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Task>> {
        db::list_tasks_due_between(&self.pool, start, end).await
    }

    async fn find_all_ordered_by_due_date(&self) -> Result<Vec<Task>> {
        db::list_tasks_by_due_date(&self.pool).await
    }

    async fn save(&self, draft: &TaskDraft) -> Result<Task> {
        match draft.id {
            Some(id) => db::upsert_task(&self.pool, id, draft).await,
            None => db::insert_task(&self.pool, draft).await,
        }
    }

    async fn insert_all(&self, drafts: &[TaskDraft]) -> Result<Vec<Task>> {
        db::insert_tasks(&self.pool, drafts).await
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool> {
        db::delete_task(&self.pool, id).await
    }
}
