//! Configuration for the `taskminder` daemon.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskminder/config.toml`)
//! 4. Compiled defaults

use std::path::{Path, PathBuf};

use chrono::{NaiveTime, Timelike};

use crate::clock::WallClock;
use crate::reminders::NotifierKind;
use crate::reminders::daily::DailyTime;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A setting has a value outside its allowed range.
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    storage: StorageFileConfig,
    reminders: RemindersFileConfig,
    logging: LoggingFileConfig,
}

/// `[storage]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_file: Option<PathBuf>,
}

/// `[reminders]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RemindersFileConfig {
    notifier: Option<String>,
    daily_enabled: Option<bool>,
    daily_hour: Option<u32>,
    daily_minute: Option<u32>,
    utc_offset_minutes: Option<i32>,
}

/// `[logging]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct LoggingFileConfig {
    level: Option<String>,
    file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the daemon.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Personal task tracker reminder daemon")]
pub struct CliArgs {
    /// Path to config file (default: `~/.config/taskminder/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Task snapshot file.
    #[arg(long, env = "TASKMINDER_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// Notifier to deliver reminders with (console, none).
    #[arg(long, env = "TASKMINDER_NOTIFIER")]
    pub notifier: Option<String>,

    /// Disable the daily morning reminder.
    #[arg(long)]
    pub no_daily: bool,

    /// Local time of the daily reminder, as HH:MM.
    #[arg(long)]
    pub daily_at: Option<String>,

    /// Fixed UTC offset in minutes for wall-clock times (default: system zone).
    #[arg(long, allow_hyphen_values = true)]
    pub utc_offset_minutes: Option<i32>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, env = "TASKMINDER_LOG")]
    pub log_level: Option<String>,

    /// Log file path (default: stderr).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Where the task snapshot is stored.
    pub data_file: PathBuf,
    pub notifier: NotifierKind,
    /// Daily reminder time, or `None` when disabled.
    pub daily: Option<DailyTime>,
    /// Zone for 09:00 targets and rendered times.
    pub wall_clock: WallClock,
    /// Log level filter string.
    pub log_level: String,
    /// Log file; stderr when `None`.
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            notifier: NotifierKind::default(),
            daily: Some(DailyTime::default()),
            wall_clock: WallClock::Local,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path is tried and a missing
    /// file is treated as empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read or
    /// parsed, or a setting is out of range.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let reminders = &file.reminders;

        let notifier = match cli.notifier.as_deref().or(reminders.notifier.as_deref()) {
            Some(name) => name.parse().map_err(ConfigError::InvalidValue)?,
            None => defaults.notifier,
        };

        let daily_enabled = !cli.no_daily && reminders.daily_enabled.unwrap_or(true);
        let daily = if daily_enabled {
            let (hour, minute) = match cli.daily_at.as_deref() {
                Some(text) => parse_clock_time(text)?,
                None => (
                    reminders.daily_hour.unwrap_or(9),
                    reminders.daily_minute.unwrap_or(0),
                ),
            };
            Some(DailyTime::new(hour, minute).ok_or_else(|| {
                ConfigError::InvalidValue(format!("daily reminder time {hour}:{minute:02}"))
            })?)
        } else {
            None
        };

        let wall_clock = match cli.utc_offset_minutes.or(reminders.utc_offset_minutes) {
            Some(minutes) => WallClock::from_offset_minutes(minutes).ok_or_else(|| {
                ConfigError::InvalidValue(format!("utc offset {minutes} minutes"))
            })?,
            None => defaults.wall_clock,
        };

        Ok(Self {
            data_file: cli
                .data_file
                .clone()
                .or_else(|| file.storage.data_file.clone())
                .unwrap_or(defaults.data_file),
            notifier,
            daily,
            wall_clock,
            log_level: cli
                .log_level
                .clone()
                .or_else(|| file.logging.level.clone())
                .unwrap_or(defaults.log_level),
            log_file: cli.log_file.clone().or_else(|| file.logging.file.clone()),
        })
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn default_data_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskminder")
        .join("tasks.json")
}

fn parse_clock_time(text: &str) -> Result<(u32, u32), ConfigError> {
    NaiveTime::parse_from_str(text.trim(), "%H:%M")
        .map(|t| (t.hour(), t.minute()))
        .map_err(|_| ConfigError::InvalidValue(format!("'{text}' is not an HH:MM time")))
}

/// Load and parse a TOML config file.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskminder").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
