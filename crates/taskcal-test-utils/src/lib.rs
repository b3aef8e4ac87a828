//! Test doubles and database fixtures shared by the taskcal test suites.
//!
//! - [`MemoryTaskStore`] and [`ScriptedPlanGenerator`] stand in for the
//!   Postgres store and the Gemini client in workflow and HTTP tests.
//! - [`create_test_db`] hands out a fresh, migrated database per test.

mod memory;
mod pg;
mod scripted;

pub use memory::MemoryTaskStore;
pub use pg::{TestDb, create_test_db, drop_test_db, pg_url};
pub use scripted::ScriptedPlanGenerator;
