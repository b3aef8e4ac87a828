//! Workflow layer: sequences user actions against the task store and the
//! plan generator.
//!
//! Functions here return where the user should land next ([`Redirect`]) or
//! the data a view needs. They never render anything.

pub mod ai_plan;
pub mod tasks;

use chrono::NaiveDate;
use thiserror::Error;

pub use ai_plan::{
    ConfirmError, PlanOutcome, PlanReview, confirm_plan, drafts_from_form, drafts_from_json,
    generate_plan,
};
pub use tasks::{
    CalendarView, calendar_view, delete_task, find_task, list_tasks, resolve_month, save_task,
    tasks_due_on, upcoming_tasks,
};

/// Errors surfaced by workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid month {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("task title must not be blank")]
    BlankTitle,

    #[error(transparent)]
    Confirm(#[from] ConfirmError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Where to send the user after a mutating action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    /// The month calendar for the current month.
    Calendar,
    /// The task list for one date.
    Date(NaiveDate),
    /// The AI plan input form.
    AiPlanForm,
}

impl Redirect {
    /// Date view when a date is known, calendar otherwise.
    pub fn for_due_date(due_date: Option<NaiveDate>) -> Self {
        due_date.map_or(Self::Calendar, Self::Date)
    }

    pub fn location(&self) -> String {
        match self {
            Self::Calendar => "/tasks/calendar".to_string(),
            Self::Date(date) => format!("/tasks/date/{date}"),
            Self::AiPlanForm => "/tasks/ai-plan".to_string(),
        }
    }
}
