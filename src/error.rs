use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum HeatingError {
    #[error("Invalid time of day: {0}")]
    InvalidTimeOfDay(String),

    #[error("Invalid weekday index: {0} (expected 0-6)")]
    InvalidWeekday(String),

    #[error("Invalid status path '{path}': {reason}")]
    InvalidStatusPath { path: String, reason: String },

    #[error("Failed to read configuration {path}: {source}")]
    ConfigRead {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Duplicate device id: {0}")]
    DuplicateDevice(String),

    #[error("HTTP request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Accessory task is not running")]
    AccessoryStopped,

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HeatingError>;
