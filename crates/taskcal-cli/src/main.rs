mod calendar_cmd;
mod config;
mod serve_cmd;
#[cfg(test)]
mod test_util;
mod views;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use taskcal_core::plan::GeminiClient;
use taskcal_db::{PgTaskStore, pool};

use config::TaskcalConfig;

#[derive(Parser)]
#[command(name = "taskcal", about = "Personal task calendar with AI-assisted plans")]
struct Cli {
    /// Database URL (overrides TASKCAL_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a taskcal config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/taskcal")]
        db_url: String,
        /// Gemini API key to store in the config file
        #[arg(long)]
        api_key: Option<String>,
        /// First day of the calendar week
        #[arg(long, default_value = "sunday")]
        week_start: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database if needed and apply migrations
    DbInit,
    /// Run the web UI
    Serve {
        /// Address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Print a month calendar
    Calendar {
        /// Year to show (requires --month)
        #[arg(long, requires = "month")]
        year: Option<i32>,
        /// Month to show, 1-12 (requires --year)
        #[arg(long, requires = "year")]
        month: Option<u32>,
    },
    /// Print all tasks ordered by due date
    Upcoming,
}

/// Execute `taskcal init`: write the config file.
fn cmd_init(db_url: &str, api_key: Option<String>, week_start: &str, force: bool) -> Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    // Reject a bad day name before writing anything.
    config::parse_week_start(week_start)?;

    let has_key = api_key.is_some();
    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        gemini: config::GeminiSection {
            api_key,
            ..config::GeminiSection::default()
        },
        calendar: config::CalendarSection {
            week_start: Some(week_start.to_lowercase()),
        },
    };
    config::save_config_to(&path, &cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  calendar.week_start = {}", week_start.to_lowercase());
    if !has_key {
        println!("  gemini.api_key not set; AI plans need it (or {}).", config::API_KEY_VAR);
    }
    println!();
    println!("Next: run `taskcal db-init` to create and migrate the database.");

    Ok(())
}

/// Execute `taskcal db-init`: create the database and run migrations.
async fn cmd_db_init(resolved: &TaskcalConfig) -> Result<()> {
    println!("Initializing taskcal database...");

    let db_pool = pool::prepare_database(&resolved.db_config).await?;

    let count = pool::task_count(&db_pool).await?;
    println!("Database ready. tasks: {count} rows");

    db_pool.close().await;
    println!("taskcal db-init complete.");
    Ok(())
}

async fn cmd_serve(resolved: TaskcalConfig, bind: &str, port: u16) -> Result<()> {
    let db_pool = pool::prepare_database(&resolved.db_config).await?;

    if resolved.gemini.api_key.is_none() {
        warn!(
            "no Gemini API key configured; set {} to enable AI plans",
            config::API_KEY_VAR
        );
    }
    info!(model = %resolved.gemini.model, week_start = %resolved.week_start, "starting web UI");

    let generator =
        GeminiClient::new(resolved.gemini).context("failed to create plan generator")?;
    let state = serve_cmd::AppState::new(
        Arc::new(PgTaskStore::new(db_pool.clone())),
        Arc::new(generator),
        resolved.week_start,
    );

    let result = serve_cmd::run_serve(state, bind, port).await;
    db_pool.close().await;
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            api_key,
            week_start,
            force,
        } => {
            cmd_init(&db_url, api_key, &week_start, force)?;
        }
        Commands::DbInit => {
            let resolved = TaskcalConfig::resolve(cli.database_url.as_deref())?;
            cmd_db_init(&resolved).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved = TaskcalConfig::resolve(cli.database_url.as_deref())?;
            cmd_serve(resolved, &bind, port).await?;
        }
        Commands::Calendar { year, month } => {
            let resolved = TaskcalConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::connect(&resolved.db_config).await?;
            let store = PgTaskStore::new(db_pool.clone());
            let result =
                calendar_cmd::run_calendar(&store, year, month, resolved.week_start).await;
            db_pool.close().await;
            result?;
        }
        Commands::Upcoming => {
            let resolved = TaskcalConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::connect(&resolved.db_config).await?;
            let store = PgTaskStore::new(db_pool.clone());
            let result = calendar_cmd::run_upcoming(&store).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
