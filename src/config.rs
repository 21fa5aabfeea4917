// src/config.rs
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::AppError;
use crate::pay_period::default_first_period_start;
use crate::store::DEFAULT_DATA_FILE;

pub const ENV_PREFIX: &str = "TIMEPUNCH_";
pub const DEFAULT_REPORT_TITLE: &str = "Pay Period Hours";
const REPORT_FOLDER_NAME: &str = "Hours";

/// Process-wide settings, resolved once at startup from `TIMEPUNCH_*`
/// variables (a `.env` file is honoured).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
    #[serde(default = "default_first_period_start")]
    pub first_period_start: NaiveDate,
    #[serde(default)]
    pub report_recipient: Option<String>,
    #[serde(default = "default_report_title")]
    pub report_title: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_data_file() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_FILE)
}

/// `<Desktop>/Hours`, or `./Hours` when the desktop cannot be located.
fn default_report_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.desktop_dir().map(|d| d.join(REPORT_FOLDER_NAME)))
        .unwrap_or_else(|| PathBuf::from(REPORT_FOLDER_NAME))
}

fn default_report_title() -> String {
    DEFAULT_REPORT_TITLE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            report_dir: default_report_dir(),
            first_period_start: default_first_period_start(),
            report_recipient: None,
            report_title: default_report_title(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Reads `.env` (if any) and the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: AppConfig = envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.first_period_start.weekday() != Weekday::Mon {
            return Err(AppError::Config(format!(
                "first pay period must start on a Monday, {} is a {}",
                self.first_period_start,
                self.first_period_start.weekday()
            )));
        }
        if self.data_file.as_os_str().is_empty() {
            return Err(AppError::Config("data file path is empty".to_string()));
        }
        Ok(())
    }
}
