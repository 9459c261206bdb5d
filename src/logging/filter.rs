use crate::config::TelemetryConfig;
use crate::types::Level;

/// Decides whether an entry passes the configured severity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelFilter {
    enabled: bool,
    threshold: Level,
}

impl LevelFilter {
    pub fn new(enabled: bool, threshold: Level) -> Self {
        Self { enabled, threshold }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.enabled, config.level)
    }

    pub fn threshold(&self) -> Level {
        self.threshold
    }

    pub fn permits(&self, level: Level) -> bool {
        self.enabled && level.rank() >= self.threshold.rank()
    }

    /// Like `permits`, for level names coming from outside the crate.
    /// Unknown names rank as `DEBUG`.
    pub fn permits_name(&self, level: &str) -> bool {
        self.permits(Level::parse_lenient(level))
    }
}
