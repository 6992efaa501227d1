//! Engine configuration loaded from the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const ENV_DB_PATH: &str = "STUDY_DB_PATH";
pub const ENV_LEECH_THRESHOLD: &str = "STUDY_LEECH_THRESHOLD";
pub const ENV_RETENTION: &str = "STUDY_RETENTION";
pub const ENV_DAILY_RESET_HOUR: &str = "STUDY_DAILY_RESET_HOUR";
pub const ENV_ACTIVITY_CAP: &str = "STUDY_ACTIVITY_CAP";
pub const ENV_QUEUE_DEPTH: &str = "STUDY_QUEUE_DEPTH";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub db_path: PathBuf,
    /// Lapses before a card is flagged as a leech; 0 disables detection.
    pub leech_threshold: u32,
    pub request_retention: f64,
    /// UTC hour (0-23) at which a new study day begins.
    pub daily_reset_hour: u32,
    /// Activity events kept per project.
    pub activity_cap: usize,
    /// Commands buffered ahead of the worker.
    pub queue_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            leech_threshold: 8,
            request_retention: 0.9,
            daily_reset_hour: 0,
            activity_cap: 200,
            queue_depth: 64,
        }
    }
}

/// `<data_local_dir>/study-engine/study.db`, or the working directory when
/// the platform has no data directory.
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("study-engine"))
        .unwrap_or_default()
        .join("study.db")
}

impl EngineConfig {
    /// Defaults overlaid with `STUDY_*` variables, after loading `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns per variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB_PATH).filter(|p| !p.trim().is_empty()) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(value) = parse_var(&lookup, ENV_LEECH_THRESHOLD)? {
            config.leech_threshold = value;
        }
        if let Some(value) = parse_var::<f64, _>(&lookup, ENV_RETENTION)? {
            if !(value > 0.0 && value < 1.0) {
                return Err(invalid(ENV_RETENTION, value.to_string()));
            }
            config.request_retention = value;
        }
        if let Some(value) = parse_var::<u32, _>(&lookup, ENV_DAILY_RESET_HOUR)? {
            if value > 23 {
                return Err(invalid(ENV_DAILY_RESET_HOUR, value.to_string()));
            }
            config.daily_reset_hour = value;
        }
        if let Some(value) = parse_var(&lookup, ENV_ACTIVITY_CAP)? {
            config.activity_cap = value;
        }
        if let Some(value) = parse_var::<usize, _>(&lookup, ENV_QUEUE_DEPTH)? {
            if value == 0 {
                return Err(invalid(ENV_QUEUE_DEPTH, value.to_string()));
            }
            config.queue_depth = value;
        }

        Ok(config)
    }
}

fn invalid(key: &'static str, value: String) -> ConfigError {
    ConfigError::Invalid { key, value }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(key, raw)),
        None => Ok(None),
    }
}
