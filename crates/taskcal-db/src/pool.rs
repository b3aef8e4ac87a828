use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use tracing::info;

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/taskcal-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// SQLSTATE `invalid_catalog_name`: the database does not exist.
const MISSING_DATABASE: &str = "3D000";

async fn open(options: PgConnectOptions) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

fn is_missing_database(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == MISSING_DATABASE)
}

/// Connect to an existing, already migrated task database.
pub async fn connect(config: &DbConfig) -> Result<PgPool> {
    open(config.connect_options()?)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))
}

/// Connect to the task database, creating it first if the server reports
/// it missing, then apply pending migrations.
pub async fn prepare_database(config: &DbConfig) -> Result<PgPool> {
    let options = config.connect_options()?;
    let pool = match open(options.clone()).await {
        Ok(pool) => pool,
        Err(e) if is_missing_database(&e) => {
            create_database(config).await?;
            open(options).await.with_context(|| {
                format!("failed to connect to new database at {}", config.database_url)
            })?
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("failed to connect to database at {}", config.database_url)
            });
        }
    };

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Apply pending embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;
    info!("migrations applied");
    Ok(())
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Issue `CREATE DATABASE` from the maintenance database. A database that
/// appeared in the meantime is not an error.
async fn create_database(config: &DbConfig) -> Result<()> {
    let name = config.database_name()?;
    let mut conn = PgConnection::connect_with(&config.maintenance_options()?)
        .await
        .context("failed to connect to the postgres maintenance database")?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&name)
            .fetch_one(&mut conn)
            .await
            .context("failed to query pg_database")?;

    if !exists {
        // CREATE DATABASE takes no bind parameters.
        let stmt = format!("CREATE DATABASE {}", quote_identifier(&name));
        conn.execute(stmt.as_str())
            .await
            .with_context(|| format!("failed to create database {name}"))?;
        info!(db = %name, "database created");
    }

    conn.close().await.context("failed to close maintenance connection")?;
    Ok(())
}

/// Number of rows in the `tasks` table. Printed by `taskcal db-init`.
pub async fn task_count(pool: &PgPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
        .fetch_one(pool)
        .await
        .context("failed to count tasks")?;
    Ok(count)
}
