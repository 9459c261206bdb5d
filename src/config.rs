//! Runtime configuration for the telemetry logger.
use crate::error::{Result, TelemetryError};
use crate::types::Level;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for the logger. Every field has a default, so a config file only
/// needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Global switch; when off nothing is recorded.
    pub enabled: bool,
    /// Minimum level recorded. Unknown names fall back to `DEBUG`.
    pub level: Level,
    pub include_timestamp: bool,
    pub include_stack_trace: bool,
    /// Mirror the buffers into the durable store.
    pub persist: bool,
    pub max_stored_logs: usize,
    /// Capacity of the ERROR-only category.
    pub max_stored_errors: usize,
    pub storage_quota_bytes: usize,
    pub performance_monitoring: bool,
    pub long_task_threshold_ms: u64,
    pub interaction_tracking: bool,
    pub console_output: bool,
    pub remote_logging: bool,
    pub remote_endpoint: String,
    pub remote_timeout_ms: u64,
    pub user_agent: String,
    pub default_context: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Level::Debug,
            include_timestamp: true,
            include_stack_trace: true,
            persist: true,
            max_stored_logs: 1000,
            max_stored_errors: 50,
            storage_quota_bytes: 5 * 1024 * 1024,
            performance_monitoring: true,
            long_task_threshold_ms: 50,
            interaction_tracking: true,
            console_output: true,
            remote_logging: false,
            remote_endpoint: "http://127.0.0.1:8080/api/logs".to_string(),
            remote_timeout_ms: 5000,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            default_context: "App".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Loads a JSON config file, or the defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// describes an unusable configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                serde_json::from_str(&raw)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_stored_logs == 0 {
            return Err(TelemetryError::Config(
                "max_stored_logs must be at least 1".to_string(),
            ));
        }
        if self.max_stored_errors == 0 {
            return Err(TelemetryError::Config(
                "max_stored_errors must be at least 1".to_string(),
            ));
        }
        if self.remote_logging && self.remote_endpoint.trim().is_empty() {
            return Err(TelemetryError::Config(
                "remote_endpoint is required when remote_logging is on".to_string(),
            ));
        }
        Ok(())
    }
}
