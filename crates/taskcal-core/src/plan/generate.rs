//! Plan generation: task-count sizing and prompt construction.
//!
//! Pure logic (no I/O). The prompt asks the model for a bare JSON array of
//! `{title, description, daysFromNow}` objects which
//! [`super::parser::parse_plan_response`] turns into drafts.

use serde::{Deserialize, Serialize};

/// Fewest tasks a plan asks for.
pub const MIN_TASKS: i32 = 5;

/// Most tasks a plan asks for.
pub const MAX_TASKS: i32 = 20;

/// Default sessions per week on the plan form.
pub const DEFAULT_WEEKLY_FREQUENCY: i32 = 3;

/// Default plan length in weeks on the plan form.
pub const DEFAULT_DEADLINE_WEEKS: i32 = 4;

/// What the user asked the planner for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    /// Free-text goal, e.g. "run a half marathon".
    pub goal: String,
    /// How many sessions per week the user intends to work on it.
    pub weekly_frequency: i32,
    /// Weeks until the goal should be reached.
    pub deadline_weeks: i32,
}

impl PlanRequest {
    pub fn new(goal: impl Into<String>, weekly_frequency: i32, deadline_weeks: i32) -> Self {
        Self {
            goal: goal.into(),
            weekly_frequency,
            deadline_weeks,
        }
    }

    pub fn target_task_count(&self) -> i32 {
        target_task_count(self.weekly_frequency, self.deadline_weeks)
    }

    /// Offset in days the final task should land on.
    pub fn deadline_days(&self) -> i32 {
        self.deadline_weeks.saturating_mul(7)
    }
}

/// `weekly_frequency * deadline_weeks`, clamped to
/// [`MIN_TASKS`]..=[`MAX_TASKS`].
pub fn target_task_count(weekly_frequency: i32, deadline_weeks: i32) -> i32 {
    weekly_frequency
        .saturating_mul(deadline_weeks)
        .clamp(MIN_TASKS, MAX_TASKS)
}

/// Output-format contract appended to every prompt.
const OUTPUT_FORMAT: &str = r#"## Output Format

Respond with a JSON array and nothing else: no introduction, no closing
remarks, no Markdown headings. Each element must have exactly these keys:

[
  {"title": "Task name", "description": "What to do and how", "daysFromNow": 7},
  {"title": "Task name 2", "description": "What to do and how", "daysFromNow": 14}
]

- `title`: short imperative task name (string).
- `description`: one or two sentences of concrete instructions (string).
- `daysFromNow`: whole number of days from today until the task is due (integer).
"#;

/// Build the prompt sent to the text-generation service.
pub fn build_plan_prompt(request: &PlanRequest) -> String {
    let total = request.target_task_count();
    let mut prompt = String::with_capacity(1024);

    prompt.push_str(&format!("User goal: {}\n\n", request.goal.trim()));
    prompt.push_str("Constraints:\n");
    prompt.push_str(&format!(
        "- The user will work on this {} times per week\n",
        request.weekly_frequency
    ));
    prompt.push_str(&format!(
        "- The deadline is {} weeks from today\n",
        request.deadline_weeks
    ));
    prompt.push_str(&format!("- Generate about {total} tasks in total\n\n"));

    prompt.push_str(
        "Break the goal into concrete, actionable tasks that build on each other step by step.\n",
    );
    prompt.push_str(&format!(
        "Space the tasks to match a pace of {} sessions per week.\n\n",
        request.weekly_frequency
    ));

    prompt.push_str(OUTPUT_FORMAT);
    prompt.push('\n');
    prompt.push_str(&format!(
        "The final task should be due about {} days from now ({} weeks).\n",
        request.deadline_days(),
        request.deadline_weeks
    ));

    prompt
}
