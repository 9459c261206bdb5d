//! This module provides a `tracing` layer that records the host's own
//! console output into the telemetry logger.
use super::console::CONSOLE_TARGET;
use super::remote::REMOTE_TARGET;
use super::Logger;
use crate::types::{Level, LogData};
use serde_json::Value;
use tracing::{Event, Subscriber};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

/// A `tracing` layer that turns every event into a log entry.
///
/// The event's module (last path segment) becomes the entry context, the
/// `message` field its message and every other field its data. Events the
/// crate emits about itself are skipped.
pub struct TelemetryLayer {
    logger: Logger,
}

impl TelemetryLayer {
    /// Creates a new `TelemetryLayer`.
    ///
    /// # Arguments
    ///
    /// * `logger` - The `Logger` that receives the entries.
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

fn is_internal(target: &str) -> bool {
    target.starts_with(CONSOLE_TARGET) || target.starts_with(REMOTE_TARGET)
}

fn map_level(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::ERROR => Level::Error,
        tracing::Level::WARN => Level::Warn,
        tracing::Level::INFO => Level::Info,
        _ => Level::Debug,
    }
}

impl<S> Layer<S> for TelemetryLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let target = metadata.target();
        if is_internal(target) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let module = metadata
            .module_path()
            .map(|path| path.rsplit("::").next().unwrap_or(path))
            .unwrap_or(target);

        self.logger.log_in(
            module,
            map_level(metadata.level()),
            visitor.message,
            Value::Object(visitor.data),
            None,
        );
    }
}

/// Splits an event into its message and structured fields.
#[derive(Default)]
struct FieldVisitor {
    message: String,
    data: LogData,
}

impl FieldVisitor {
    fn insert(&mut self, field: &tracing::field::Field, value: Value) {
        if field.name() == "message" {
            self.message = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
        } else {
            self.data.insert(field.name().to_string(), value);
        }
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.insert(field, Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelemetryConfig;
    use crate::logging::console::MemoryConsole;
    use crate::types::LogFilter;
    use serde_json::json;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn events_become_entries_with_fields() {
        let logger = Logger::builder(TelemetryConfig::default())
            .console(Arc::new(MemoryConsole::default()))
            .build();
        let subscriber = tracing_subscriber::registry().with(TelemetryLayer::new(logger.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(attempts = 3, form = "contact", "submit retried");
            tracing::info!(target: CONSOLE_TARGET, "[App] echoed line");
            tracing::warn!(target: REMOTE_TARGET, "Remote logging failed");
        });

        let logs = logger.get_logs(&LogFilter::default());
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, Level::Warn);
        assert_eq!(logs[0].message, "submit retried");
        assert_eq!(logs[0].context, "tests");
        assert_eq!(logs[0].data["attempts"], json!(3));
        assert_eq!(logs[0].data["form"], json!("contact"));
    }
}
