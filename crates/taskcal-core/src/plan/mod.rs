//! AI plan generation: prompt construction, the provider client, and the
//! response parser.

pub mod client;
pub mod generate;
pub mod parser;

pub use client::{GeminiClient, GeminiConfig, PlanClientError, PlanGenerator};
pub use generate::{
    DEFAULT_DEADLINE_WEEKS, DEFAULT_WEEKLY_FREQUENCY, PlanRequest, build_plan_prompt,
    target_task_count,
};
pub use parser::{DraftTask, PlanParseError, parse_drafts_or_empty, parse_plan_response};
