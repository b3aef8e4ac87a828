//! Two-phase AI planning: generate drafts for review, then commit the
//! confirmed list.

use std::collections::HashMap;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{error, info, warn};

use taskcal_db::TaskStore;
use taskcal_db::models::TaskDraft;

use super::WorkflowError;
use crate::plan::{DraftTask, PlanGenerator, PlanRequest, parse_plan_response};

pub const NO_RESPONSE_MESSAGE: &str = "Could not get a response from the AI. Please try again.";
pub const NO_TASKS_MESSAGE: &str = "Failed to generate tasks. Please try a different goal.";
pub const BLANK_GOAL_MESSAGE: &str = "Please describe your goal.";
pub const BAD_NUMBERS_MESSAGE: &str = "Weekly frequency and deadline must both be at least 1.";
pub const NOT_A_NUMBER_MESSAGE: &str = "Weekly frequency and deadline must be whole numbers.";

/// Drafts ready for the user to review.
#[derive(Debug, Clone)]
pub struct PlanReview {
    pub goal: String,
    pub drafts: Vec<DraftTask>,
    /// `drafts` as a JSON array, for round-tripping through the review page.
    pub drafts_json: String,
}

impl PlanReview {
    pub fn new(
        goal: impl Into<String>,
        drafts: Vec<DraftTask>,
    ) -> Result<Self, serde_json::Error> {
        let drafts_json = serde_json::to_string(&drafts)?;
        Ok(Self {
            goal: goal.into(),
            drafts,
            drafts_json,
        })
    }
}

/// Result of phase one.
#[derive(Debug, Clone)]
pub enum PlanOutcome {
    Review(PlanReview),
    /// Re-show the form with `error`, keeping the user's goal.
    Rejected { goal: String, error: String },
}

impl PlanOutcome {
    fn rejected(request: &PlanRequest, error: &str) -> Self {
        Self::Rejected {
            goal: request.goal.clone(),
            error: error.to_string(),
        }
    }
}

/// Phase one: ask the generator for a plan and parse it into drafts.
/// Nothing is persisted.
pub async fn generate_plan(
    generator: &dyn PlanGenerator,
    request: &PlanRequest,
    today: NaiveDate,
) -> PlanOutcome {
    if request.goal.trim().is_empty() {
        return PlanOutcome::rejected(request, BLANK_GOAL_MESSAGE);
    }
    if request.weekly_frequency < 1 || request.deadline_weeks < 1 {
        return PlanOutcome::rejected(request, BAD_NUMBERS_MESSAGE);
    }

    let raw = match generator.generate_plan(request).await {
        Ok(raw) => raw,
        Err(e) => {
            error!("plan generation failed: {e}");
            return PlanOutcome::rejected(request, NO_RESPONSE_MESSAGE);
        }
    };

    let drafts = match parse_plan_response(&raw, today) {
        Ok(drafts) => drafts,
        Err(e) => {
            warn!(response_len = raw.len(), "plan response rejected: {e}");
            return PlanOutcome::rejected(request, NO_TASKS_MESSAGE);
        }
    };

    match PlanReview::new(request.goal.clone(), drafts) {
        Ok(review) => {
            info!(drafts = review.drafts.len(), "plan ready for review");
            PlanOutcome::Review(review)
        }
        Err(e) => {
            error!("failed to encode drafts: {e}");
            PlanOutcome::rejected(request, NO_TASKS_MESSAGE)
        }
    }
}

// ---------------------------------------------------------------------------
// Phase two: reconstruct and commit
// ---------------------------------------------------------------------------

/// Why a confirmed draft list could not be reconstructed.
#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("task {index} has no title")]
    MissingTitle { index: usize },

    #[error("task {index} has an invalid due date {value:?}")]
    InvalidDueDate { index: usize, value: String },

    #[error("confirmed tasks are not a valid JSON array: {0}")]
    Json(#[from] serde_json::Error),
}

fn field<'a>(fields: &'a HashMap<String, String>, index: usize, name: &str) -> Option<&'a str> {
    fields
        .get(&format!("tasks[{index}].{name}"))
        .map(String::as_str)
}

fn parse_due_date(index: usize, value: Option<&str>) -> Result<Option<NaiveDate>, ConfirmError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(|_| ConfirmError::InvalidDueDate {
                index,
                value: v.to_string(),
            }),
    }
}

/// Rebuild drafts from `tasks[N].title` / `tasks[N].description` /
/// `tasks[N].dueDate` form fields.
///
/// Indices are read from 0 upward and reading stops at the first index with
/// none of its fields, so a gap ends the list. An index carrying
/// `tasks[N].remove` is dropped without validation; the rest keep their
/// submitted order.
pub fn drafts_from_form(fields: &HashMap<String, String>) -> Result<Vec<DraftTask>, ConfirmError> {
    let mut drafts = Vec::new();

    for index in 0.. {
        let title = field(fields, index, "title");
        let description = field(fields, index, "description");
        let due_date = field(fields, index, "dueDate");
        let removed = field(fields, index, "remove").is_some();
        if title.is_none() && description.is_none() && due_date.is_none() && !removed {
            break;
        }
        if removed {
            continue;
        }

        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfirmError::MissingTitle { index })?;

        drafts.push(DraftTask {
            title: title.to_string(),
            description: description.unwrap_or_default().trim().to_string(),
            due_date: parse_due_date(index, due_date)?,
        });
    }

    Ok(drafts)
}

/// Decode a JSON array of drafts, rejecting blank titles.
pub fn drafts_from_json(text: &str) -> Result<Vec<DraftTask>, ConfirmError> {
    let drafts: Vec<DraftTask> = serde_json::from_str(text)?;
    for (index, draft) in drafts.iter().enumerate() {
        if draft.title.trim().is_empty() {
            return Err(ConfirmError::MissingTitle { index });
        }
    }
    Ok(drafts)
}

/// Phase two: persist every confirmed draft or none of them.
pub async fn confirm_plan(
    store: &dyn TaskStore,
    drafts: Vec<DraftTask>,
) -> Result<usize, WorkflowError> {
    if drafts.is_empty() {
        info!("empty plan confirmed, nothing to save");
        return Ok(0);
    }

    let drafts: Vec<TaskDraft> = drafts.into_iter().map(TaskDraft::from).collect();
    let saved = store.insert_all(&drafts).await?;
    info!(saved = saved.len(), "plan committed");
    Ok(saved.len())
}
