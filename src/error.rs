// src/error.rs
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

use crate::pay_period::MAX_CYCLES_PER_DAY;

// --- Error Handling ---

/// Every failure a user action can produce. All of them are recovered at the
/// boundary of the command that triggered them.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    InputRequired(String),

    #[error("{0}")]
    SequenceError(String),

    #[error("Maximum {MAX_CYCLES_PER_DAY} punch cycles per day reached.")]
    LimitReached,

    #[error("Time punches are not allowed on weekends ({0}).")]
    WeekendBlocked(NaiveDate),

    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    TimeOrderError(String),

    #[error("Could not access data file {path}: {message}")]
    PersistenceError { path: PathBuf, message: String },

    #[error("{0}")]
    ExternalToolError(String),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("No pay period ending {0}")]
    PeriodNotFound(NaiveDate),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        AppError::PersistenceError {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Short heading shown above the message, one per failure kind.
    pub fn title(&self) -> &'static str {
        match self {
            AppError::InputRequired(_) => "Input Required",
            AppError::SequenceError(_) => "Sequence Error",
            AppError::LimitReached => "Limit Reached",
            AppError::WeekendBlocked(_) => "Unavailable",
            AppError::ValidationError(_) => "Input Error",
            AppError::TimeOrderError(_) => "Time Error",
            AppError::PersistenceError { .. } => "Data Error",
            AppError::ExternalToolError(_) => "Error",
            AppError::UnknownUser(_) => "Unknown User",
            AppError::PeriodNotFound(_) => "Selection Required",
            AppError::Config(_) => "Configuration Error",
        }
    }
}

impl From<csv::Error> for AppError {
    fn from(e: csv::Error) -> Self {
        AppError::ExternalToolError(format!("Could not write report: {}", e))
    }
}
