//! Database query functions for the `tasks` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{Task, TaskDraft};

/// List every task, oldest first.
pub async fn list_tasks(pool: &PgPool) -> Result<Vec<Task>> {
    let tasks = sqlx::query_as::<_, Task>("SELECT * FROM tasks ORDER BY id ASC")
        .fetch_all(pool)
        .await
        .context("failed to list tasks")?;

    Ok(tasks)
}

/// Fetch a single task by ID.
pub async fn get_task(pool: &PgPool, id: i64) -> Result<Option<Task>> {
    let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch task")?;

    Ok(task)
}

/// Tasks due exactly on `date`.
pub async fn list_tasks_due_on(pool: &PgPool, date: NaiveDate) -> Result<Vec<Task>> {
    let tasks =
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE due_date = $1 ORDER BY id ASC")
            .bind(date)
            .fetch_all(pool)
            .await
            .context("failed to list tasks due on date")?;

    Ok(tasks)
}

/// Tasks whose due date falls within `start..=end`.
pub async fn list_tasks_due_between(
    pool: &PgPool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Task>> {
    let tasks = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE due_date BETWEEN $1 AND $2 \
         ORDER BY due_date ASC, id ASC",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
    .context("failed to list tasks in date range")?;

    Ok(tasks)
}

/// Every task ordered by due date, earliest first. Tasks without a due
/// date come last.
pub async fn list_tasks_by_due_date(pool: &PgPool) -> Result<Vec<Task>> {
    let tasks = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks ORDER BY due_date ASC NULLS LAST, id ASC",
    )
    .fetch_all(pool)
    .await
    .context("failed to list tasks by due date")?;

    Ok(tasks)
}

/// Insert a new task row. Any `id` on the draft is ignored.
pub async fn insert_task(pool: &PgPool, draft: &TaskDraft) -> Result<Task> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let task = insert_task_tx(&mut tx, draft).await?;
    tx.commit().await.context("failed to commit transaction")?;
    Ok(task)
}

async fn insert_task_tx(tx: &mut Transaction<'_, Postgres>, draft: &TaskDraft) -> Result<Task> {
    let task = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (title, description, due_date) \
         VALUES ($1, $2, $3) \
         RETURNING *",
    )
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.due_date)
    .fetch_one(&mut **tx)
    .await
    .with_context(|| format!("failed to insert task {:?}", draft.title))?;

    Ok(task)
}

/// Insert or replace the task with the given `id`.
///
/// When the row is new the identity sequence is moved past `id` so later
/// generated ids do not collide with it.
pub async fn upsert_task(pool: &PgPool, id: i64, draft: &TaskDraft) -> Result<Task> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let task = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (id, title, description, due_date) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (id) DO UPDATE \
         SET title = EXCLUDED.title, \
             description = EXCLUDED.description, \
             due_date = EXCLUDED.due_date, \
             updated_at = now() \
         RETURNING *",
    )
    .bind(id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.due_date)
    .fetch_one(&mut *tx)
    .await
    .with_context(|| format!("failed to upsert task {id}"))?;

    sqlx::query(
        "SELECT setval(pg_get_serial_sequence('tasks', 'id'), \
                       GREATEST((SELECT MAX(id) FROM tasks), 1))",
    )
    .execute(&mut *tx)
    .await
    .context("failed to advance task id sequence")?;

    tx.commit().await.context("failed to commit transaction")?;
    Ok(task)
}

/// Insert every draft inside one transaction.
///
/// Either all rows are committed or none are: if any insert fails the
/// transaction is rolled back when it is dropped.
pub async fn insert_tasks(pool: &PgPool, drafts: &[TaskDraft]) -> Result<Vec<Task>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let mut inserted = Vec::with_capacity(drafts.len());
    for draft in drafts {
        inserted.push(insert_task_tx(&mut tx, draft).await?);
    }

    tx.commit().await.context("failed to commit transaction")?;
    Ok(inserted)
}

/// Delete a task. Returns `true` if a row was removed.
pub async fn delete_task(pool: &PgPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete task")?;

    Ok(result.rows_affected() > 0)
}
