//! Error taxonomy for the telemetry pipeline.
//!
//! These errors stay inside the crate: the `Logger` facade converts every one
//! of them into a console warning, so application code never sees them.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The durable slot could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing the slot would exceed its size bound.
    #[error("storage quota exceeded: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded { needed: usize, limit: usize },

    /// Remote delivery failed.
    #[error("remote delivery failed: {0}")]
    Transport(String),

    #[error("no async runtime available for remote delivery")]
    NoRuntime,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown export format: {0}")]
    UnknownFormat(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for TelemetryError {
    fn from(err: reqwest::Error) -> Self {
        TelemetryError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
