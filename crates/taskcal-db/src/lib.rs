//! Persistence layer for taskcal: PostgreSQL pool, migrations, task
//! queries, and the [`store::TaskStore`] seam the rest of the workspace
//! programs against.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
pub mod store;

pub use store::{PgTaskStore, TaskStore};
