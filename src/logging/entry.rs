//! Construction of structured log entries.
use crate::types::{ErrorInfo, Level, LogData, LogEntry};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::Value;
use std::sync::{PoisonError, RwLock};

const SESSION_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Builds `LogEntry` values from raw inputs plus the ambient session state:
/// session id, user agent and the current location.
pub struct EntryBuilder {
    session_id: String,
    user_agent: String,
    location: RwLock<String>,
}

impl EntryBuilder {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            session_id: generate_session_id(),
            user_agent: user_agent.into(),
            location: RwLock::new(String::new()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn location(&self) -> String {
        self.location
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sets the URL captured by entries built from now on.
    pub fn set_location(&self, url: impl Into<String>) {
        *self.location.write().unwrap_or_else(PoisonError::into_inner) = url.into();
    }

    pub fn build(
        &self,
        level: Level,
        context: &str,
        message: String,
        data: LogData,
        error: Option<ErrorInfo>,
    ) -> LogEntry {
        LogEntry {
            timestamp: now_millis(),
            session_id: self.session_id.clone(),
            level,
            context: context.to_string(),
            message,
            data,
            error,
            url: self.location(),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Generates `session_<creation millis>_<random base36 suffix>`.
pub fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SESSION_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("session_{}_{}", Utc::now().timestamp_millis(), suffix)
}

/// Normalizes caller-supplied data into a map.
///
/// `null` becomes empty, objects are used as-is and any other value is kept
/// under the `value` key.
pub fn into_data(value: Value) -> LogData {
    match value {
        Value::Null => LogData::new(),
        Value::Object(map) => map,
        other => {
            let mut map = LogData::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

// Stored timestamps only carry milliseconds; truncate so an entry equals its
// own serialized form.
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
