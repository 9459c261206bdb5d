//! Core data types shared by the telemetry pipeline.
use crate::error::TelemetryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Arbitrary structured payload attached to an entry.
pub type LogData = Map<String, Value>;

/// Severity of a log entry, totally ordered from `Debug` to `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Debug, Level::Info, Level::Warn, Level::Error];

    /// Integer rank used for threshold comparisons.
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    /// Parses a level name, falling back to `Debug` (rank 0) for anything
    /// unrecognized so a typo never blocks logging.
    pub fn parse_lenient(value: &str) -> Level {
        value.parse().unwrap_or(Level::Debug)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Level::parse_lenient(&raw))
    }
}

/// Error details captured alongside an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    pub stack: Option<String>,
    pub name: String,
}

impl ErrorInfo {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
            name: name.into(),
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Captures an error value. The `source()` chain, if any, becomes the stack.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        Self {
            message: err.to_string(),
            stack: (!chain.is_empty()).then(|| chain.join("\n")),
            name: short_type_name::<E>(),
        }
    }

    /// Coerces an arbitrary JSON value into an error record.
    ///
    /// Objects contribute their `message`, `stack` and `name` fields; any
    /// other shape becomes `{message: <value>, stack: null, name: "Error"}`.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(fields) if fields.contains_key("message") => Self {
                message: value_text(&fields["message"]),
                stack: fields
                    .get("stack")
                    .filter(|stack| !stack.is_null())
                    .map(value_text),
                name: fields
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("Error")
                    .to_string(),
            },
            other => Self::new("Error", value_text(other)),
        }
    }
}

impl From<&anyhow::Error> for ErrorInfo {
    fn from(err: &anyhow::Error) -> Self {
        let chain: Vec<String> = err
            .chain()
            .skip(1)
            .map(|cause| format!("caused by: {}", cause))
            .collect();

        Self {
            message: err.to_string(),
            stack: (!chain.is_empty()).then(|| chain.join("\n")),
            name: "Error".to_string(),
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn short_type_name<E: ?Sized>() -> String {
    let full = std::any::type_name::<E>();
    if full.starts_with("dyn ") {
        return "Error".to_string();
    }
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
        .to_string()
}

/// One structured log record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub level: Level,
    pub context: String,
    pub message: String,
    #[serde(default)]
    pub data: LogData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub user_agent: String,
}

/// Independent predicates for querying entries; all set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LogFilter {
    #[serde(default)]
    pub level: Option<Level>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

impl LogFilter {
    pub fn level(level: Level) -> Self {
        Self {
            level: Some(level),
            ..Self::default()
        }
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.level.map_or(true, |level| entry.level == level)
            && self
                .context
                .as_deref()
                .map_or(true, |context| entry.context == context)
            && self
                .start_time
                .map_or(true, |start| entry.timestamp >= start)
    }
}

/// Output format for `Logger::export_logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(TelemetryError::UnknownFormat(other.to_string())),
        }
    }
}

/// ISO-8601 timestamps with millisecond precision.
pub(crate) mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(timestamp: &DateTime<Utc>) -> String {
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(timestamp))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
