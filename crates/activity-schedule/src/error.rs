//! Error types for activity-schedule operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid datetime: {0}")]
    InvalidDatetime(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid locale: {0}")]
    InvalidLocale(String),

    #[error("Invalid booking window: {0}")]
    InvalidWindow(String),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
