//! Plan response parser.
//!
//! Turns the model's raw text into [`DraftTask`]s. Parsing is
//! all-or-nothing: a single bad element rejects the whole response, so a
//! caller either has a complete draft list to review or nothing.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use taskcal_db::models::TaskDraft;

/// A task proposed by the planner, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftTask {
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
}

impl From<DraftTask> for TaskDraft {
    fn from(draft: DraftTask) -> Self {
        let description = Some(draft.description).filter(|d| !d.trim().is_empty());
        Self {
            id: None,
            title: draft.title,
            description,
            due_date: draft.due_date,
        }
    }
}

/// One element of the model's JSON array.
#[derive(Debug, Deserialize)]
struct PlanItem {
    title: String,
    description: String,
    #[serde(rename = "daysFromNow")]
    days_from_now: i64,
}

/// Errors that can occur while parsing a plan response.
#[derive(Debug, Error)]
pub enum PlanParseError {
    #[error("plan response is empty")]
    Empty,

    #[error("plan response is not a valid task array: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("plan response contains no tasks")]
    NoTasks,

    #[error("task {title:?} is due {days} days from {today}, which is out of range")]
    DateOutOfRange {
        title: String,
        days: i64,
        today: NaiveDate,
    },
}

/// Remove Markdown code-fence markers (```` ```json ```` and ```` ``` ````)
/// and surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Parse the model's raw text into drafts due relative to `today`.
pub fn parse_plan_response(raw: &str, today: NaiveDate) -> Result<Vec<DraftTask>, PlanParseError> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(PlanParseError::Empty);
    }

    let items: Vec<PlanItem> = serde_json::from_str(&cleaned)?;
    if items.is_empty() {
        return Err(PlanParseError::NoTasks);
    }

    items
        .into_iter()
        .map(|item| {
            let due = offset_date(today, item.days_from_now).ok_or_else(|| {
                PlanParseError::DateOutOfRange {
                    title: item.title.clone(),
                    days: item.days_from_now,
                    today,
                }
            })?;
            Ok(DraftTask {
                title: item.title,
                description: item.description,
                due_date: Some(due),
            })
        })
        .collect()
}

/// [`parse_plan_response`] collapsed to the "empty means failure" contract.
pub fn parse_drafts_or_empty(raw: &str, today: NaiveDate) -> Vec<DraftTask> {
    parse_plan_response(raw, today).unwrap_or_default()
}

fn offset_date(today: NaiveDate, days: i64) -> Option<NaiveDate> {
    if days >= 0 {
        today.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        today.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}
