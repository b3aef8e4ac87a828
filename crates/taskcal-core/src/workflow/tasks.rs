//! Task CRUD and the calendar view.

use anyhow::Context;
use chrono::{NaiveDate, Weekday};
use tracing::info;

use taskcal_db::TaskStore;
use taskcal_db::models::{Task, TaskDraft};

use super::{Redirect, WorkflowError};
use crate::calendar::{MonthRef, Week, build_calendar, group_by_due_date};

/// Everything the month calendar page shows.
#[derive(Debug, Clone)]
pub struct CalendarView {
    pub month: MonthRef,
    pub weeks: Vec<Week>,
    pub prev: MonthRef,
    pub next: MonthRef,
    pub week_start: Weekday,
}

/// Pick the month to display. Both `year` and `month` must be given to
/// override today's month.
pub fn resolve_month(
    year: Option<i32>,
    month: Option<u32>,
    today: NaiveDate,
) -> Result<MonthRef, WorkflowError> {
    match (year, month) {
        (Some(year), Some(month)) => {
            MonthRef::new(year, month).ok_or(WorkflowError::InvalidMonth { year, month })
        }
        _ => Ok(MonthRef::containing(today)),
    }
}

/// Assemble the calendar for the requested month.
pub async fn calendar_view(
    store: &dyn TaskStore,
    year: Option<i32>,
    month: Option<u32>,
    today: NaiveDate,
    week_start: Weekday,
) -> Result<CalendarView, WorkflowError> {
    let month = resolve_month(year, month, today)?;

    let tasks = store
        .find_by_due_date_range(month.first_day(), month.last_day())
        .await
        .with_context(|| format!("failed to load tasks for {month}"))?;
    let by_date = group_by_due_date(tasks);

    Ok(CalendarView {
        month,
        weeks: build_calendar(month.first_day(), &by_date, week_start),
        prev: month.prev(),
        next: month.next(),
        week_start,
    })
}

pub async fn list_tasks(store: &dyn TaskStore) -> Result<Vec<Task>, WorkflowError> {
    Ok(store.find_all().await?)
}

pub async fn upcoming_tasks(store: &dyn TaskStore) -> Result<Vec<Task>, WorkflowError> {
    Ok(store.find_all_ordered_by_due_date().await?)
}

pub async fn tasks_due_on(
    store: &dyn TaskStore,
    date: NaiveDate,
) -> Result<Vec<Task>, WorkflowError> {
    Ok(store.find_by_due_date(date).await?)
}

pub async fn find_task(store: &dyn TaskStore, id: i64) -> Result<Option<Task>, WorkflowError> {
    Ok(store.find_by_id(id).await?)
}

/// Insert or update a task submitted from a form.
///
/// - No id: insert.
/// - Known id: replace; a missing due date keeps the stored one.
/// - Unknown id: nothing is written and the user goes back to the calendar.
pub async fn save_task(
    store: &dyn TaskStore,
    mut draft: TaskDraft,
) -> Result<Redirect, WorkflowError> {
    draft.title = draft.title.trim().to_string();
    if draft.title.is_empty() {
        return Err(WorkflowError::BlankTitle);
    }

    if let Some(id) = draft.id {
        let Some(existing) = store.find_by_id(id).await? else {
            info!(task_id = id, "save for unknown task ignored");
            return Ok(Redirect::Calendar);
        };
        if draft.due_date.is_none() {
            draft.due_date = existing.due_date;
        }
    }

    let saved = store.save(&draft).await?;
    info!(task_id = saved.id, updated = draft.id.is_some(), "task saved");
    Ok(Redirect::for_due_date(saved.due_date))
}

/// Delete a task if it exists and send the user to the date it was due on.
pub async fn delete_task(store: &dyn TaskStore, id: i64) -> Result<Redirect, WorkflowError> {
    let Some(task) = store.find_by_id(id).await? else {
        info!(task_id = id, "delete for unknown task ignored");
        return Ok(Redirect::Calendar);
    };

    store.delete_by_id(id).await?;
    info!(task_id = id, "task deleted");
    Ok(Redirect::for_due_date(task.due_date))
}
