//! Core logic for taskcal: the month calendar grid, AI plan generation and
//! parsing, and the workflow layer that sequences user actions against a
//! [`taskcal_db::TaskStore`].

pub mod calendar;
pub mod plan;
pub mod workflow;
