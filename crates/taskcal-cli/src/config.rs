//! Configuration file management for taskcal.
//!
//! A TOML file at `~/.config/taskcal/config.toml` plus the resolution
//! chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::Weekday;
use serde::{Deserialize, Serialize};

use taskcal_core::plan::GeminiConfig;
use taskcal_db::config::DbConfig;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const WEEK_START_VAR: &str = "TASKCAL_WEEK_START";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub gemini: GeminiSection,
    #[serde(default)]
    pub calendar: CalendarSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: DbConfig::DEFAULT_URL.to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GeminiSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CalendarSection {
    /// Day name the calendar grid starts on, e.g. `"sunday"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_start: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// `$XDG_CONFIG_HOME/taskcal` or `~/.config/taskcal`, on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("taskcal");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("taskcal")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Parse the config file at `path`. A missing file is `Ok(None)`; a file
/// that exists but does not parse is an error.
pub fn load_config_from(path: &Path) -> Result<Option<ConfigFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

/// Write `config` to `path`, creating parent directories. The file is
/// made owner-only on Unix since it may hold an API key.
pub fn save_config_to(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

pub fn parse_week_start(value: &str) -> Result<Weekday> {
    value
        .trim()
        .parse::<Weekday>()
        .map_err(|_| anyhow!("invalid week start {value:?}; expected a day name like \"sunday\""))
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct TaskcalConfig {
    pub db_config: DbConfig,
    pub gemini: GeminiConfig,
    pub week_start: Weekday,
}

impl TaskcalConfig {
    /// Resolve using the default config file location.
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file = load_config_from(&config_path())?;
        Self::resolve_with(cli_db_url, file)
    }

    /// - DB URL: `cli_db_url` > `TASKCAL_DATABASE_URL` > `database.url` > default
    /// - API key: `GEMINI_API_KEY` > `gemini.api_key` > none
    /// - Week start: `TASKCAL_WEEK_START` > `calendar.week_start` > Sunday
    pub fn resolve_with(cli_db_url: Option<&str>, file: Option<ConfigFile>) -> Result<Self> {
        let file = file.unwrap_or_default();

        let db_url = match cli_db_url {
            Some(url) => url.to_string(),
            None => std::env::var(DbConfig::ENV_VAR).unwrap_or(file.database.url),
        };

        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .or(file.gemini.api_key)
            .filter(|k| !k.trim().is_empty());

        let defaults = GeminiConfig::default();
        let gemini = GeminiConfig {
            base_url: file.gemini.base_url.unwrap_or(defaults.base_url),
            model: file.gemini.model.unwrap_or(defaults.model),
            api_key,
            timeout: file
                .gemini
                .timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
        };

        let week_start = match std::env::var(WEEK_START_VAR).ok().or(file.calendar.week_start) {
            Some(day) => parse_week_start(&day)?,
            None => Weekday::Sun,
        };

        Ok(Self {
            db_config: DbConfig::new(db_url),
            gemini,
            week_start,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
