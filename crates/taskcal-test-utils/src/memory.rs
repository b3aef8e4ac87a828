use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use taskcal_db::TaskStore;
use taskcal_db::models::{Task, TaskDraft};

#[derive(Default)]
struct Inner {
    tasks: Vec<Task>,
    next_id: i64,
}

/// In-memory [`TaskStore`] with the same ordering and validation rules as
/// the Postgres one.
#[derive(Default)]
pub struct MemoryTaskStore {
    inner: Mutex<Inner>,
    fail_writes: AtomicBool,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `drafts`, ids assigned from 1.
    pub fn with_tasks(drafts: &[TaskDraft]) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock().expect("store lock");
            for draft in drafts {
                insert_locked(&mut inner, draft);
            }
        }
        store
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all rows in id order.
    pub fn tasks(&self) -> Vec<Task> {
        let mut tasks = self.inner.lock().expect("store lock").tasks.clone();
        tasks.sort_by_key(|t| t.id);
        tasks
    }

    fn check_writable(&self, draft: &TaskDraft) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("simulated write failure");
        }
        if draft.title.trim().is_empty() {
            bail!("task title must not be blank");
        }
        Ok(())
    }
}

fn insert_locked(inner: &mut Inner, draft: &TaskDraft) -> Task {
    let id = match draft.id {
        Some(id) => id,
        None => inner.next_id + 1,
    };
    inner.next_id = inner.next_id.max(id);

    let now = Utc::now();
    let task = Task {
        id,
        title: draft.title.clone(),
        description: draft.description.clone(),
        due_date: draft.due_date,
        created_at: now,
        updated_at: now,
    };
    inner.tasks.push(task.clone());
    task
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn find_all(&self) -> Result<Vec<Task>> {
        Ok(self.tasks())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Task>> {
        Ok(self.tasks().into_iter().find(|t| t.id == id))
    }

    async fn find_by_due_date(&self, date: NaiveDate) -> Result<Vec<Task>> {
        Ok(self
            .tasks()
            .into_iter()
            .filter(|t| t.due_date == Some(date))
            .collect())
    }

    async fn find_by_due_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks()
            .into_iter()
            .filter(|t| t.due_date.is_some_and(|d| start <= d && d <= end))
            .collect();
        tasks.sort_by_key(|t| (t.due_date, t.id));
        Ok(tasks)
    }

    async fn find_all_ordered_by_due_date(&self) -> Result<Vec<Task>> {
        let mut tasks = self.tasks();
        tasks.sort_by_key(|t| (t.due_date.is_none(), t.due_date, t.id));
        Ok(tasks)
    }

    async fn save(&self, draft: &TaskDraft) -> Result<Task> {
        self.check_writable(draft)?;
        let mut inner = self.inner.lock().expect("store lock");

        if let Some(existing) = draft
            .id
            .and_then(|id| inner.tasks.iter_mut().find(|t| t.id == id))
        {
            existing.title = draft.title.clone();
            existing.description = draft.description.clone();
            existing.due_date = draft.due_date;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }
        Ok(insert_locked(&mut inner, draft))
    }

    async fn insert_all(&self, drafts: &[TaskDraft]) -> Result<Vec<Task>> {
        for draft in drafts {
            self.check_writable(draft)?;
        }
        let mut inner = self.inner.lock().expect("store lock");
        Ok(drafts
            .iter()
            .map(|d| insert_locked(&mut inner, &TaskDraft { id: None, ..d.clone() }))
            .collect())
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("simulated write failure");
        }
        let mut inner = self.inner.lock().expect("store lock");
        let before = inner.tasks.len();
        inner.tasks.retain(|t| t.id != id);
        Ok(inner.tasks.len() != before)
    }
}
