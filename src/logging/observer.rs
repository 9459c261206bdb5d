//! Observers that feed failures and slow work from the host into the logger:
//! a panic hook for uncaught errors, a watcher for detached tasks, guarded
//! execution wrappers and a long-task monitor.
use super::logger::panic_message;
use super::timers::format_millis;
use super::Logger;
use crate::types::ErrorInfo;
use serde_json::{json, Map, Value};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Records every panic as an ERROR `Unhandled error` entry, then defers to
/// the previously installed hook.
///
/// The host calls this once at startup.
pub fn install_panic_hook(logger: Logger) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let message = panic_message(info.payload());
        let (filename, lineno, colno) = info
            .location()
            .map(|location| (location.file().to_string(), location.line(), location.column()))
            .unwrap_or_default();

        let mut error = ErrorInfo::new("Panic", message.clone());
        let backtrace = Backtrace::capture();
        if backtrace.status() == BacktraceStatus::Captured {
            error = error.with_stack(backtrace.to_string());
        }

        logger.error(
            "Unhandled error",
            json!({
                "message": message,
                "filename": filename,
                "lineno": lineno,
                "colno": colno,
            }),
            Some(error),
        );
        previous(info);
    }));
}

/// Records a failure nobody awaited as ERROR `Unhandled promise rejection`.
pub fn report_rejection(logger: &Logger, reason: &dyn Display) {
    let reason = reason.to_string();
    logger.error(
        "Unhandled promise rejection",
        json!({ "reason": reason }),
        Some(ErrorInfo::new("Error", reason)),
    );
}

/// Watches a detached task and reports it if it fails or panics.
pub fn watch_task<T, E>(logger: Logger, handle: JoinHandle<Result<T, E>>) -> JoinHandle<()>
where
    T: Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        match handle.await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => report_rejection(&logger, &err),
            Err(join_err) => report_rejection(&logger, &join_err),
        }
    })
}

/// Runs `f`, recording `Executing: <context>` before and `Completed:` or
/// `Error in <context>` after. The result is returned unchanged.
pub fn guard<T, E, F>(logger: &Logger, context: &str, f: F) -> Result<T, E>
where
    E: Display,
    F: FnOnce() -> Result<T, E>,
{
    logger.debug(format!("Executing: {}", context), Value::Null);
    let result = f();
    match &result {
        Ok(_) => logger.debug(format!("Completed: {}", context), Value::Null),
        Err(err) => logger.error(
            format!("Error in {}", context),
            Value::Null,
            Some(ErrorInfo::new("Error", err.to_string())),
        ),
    }
    result
}

/// Async counterpart of [`guard`].
pub async fn guard_async<T, E, Fut>(logger: &Logger, context: &str, fut: Fut) -> Result<T, E>
where
    E: Display,
    Fut: Future<Output = Result<T, E>>,
{
    logger.debug(format!("Executing async: {}", context), Value::Null);
    let result = fut.await;
    match &result {
        Ok(_) => logger.debug(format!("Completed async: {}", context), Value::Null),
        Err(err) => logger.error(
            format!("Error in async {}", context),
            Value::Null,
            Some(ErrorInfo::new("Error", err.to_string())),
        ),
    }
    result
}

/// Flags work that blocks longer than the configured threshold.
pub struct PerformanceMonitor {
    logger: Logger,
    threshold: Duration,
    enabled: bool,
}

impl PerformanceMonitor {
    pub fn new(logger: Logger) -> Self {
        Self {
            threshold: logger.long_task_threshold(),
            enabled: logger.performance_monitoring(),
            logger,
        }
    }

    /// Records WARN `Long task detected` when `duration` exceeds the threshold.
    pub fn record_task(&self, name: &str, duration: Duration) {
        if !self.enabled || duration <= self.threshold {
            return;
        }
        self.logger.warn(
            "Long task detected",
            json!({
                "name": name,
                "duration": format_millis(duration.as_secs_f64() * 1000.0),
            }),
            None,
        );
    }

    /// Runs `f` and records it if it was slow.
    pub fn measure<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let value = f();
        self.record_task(name, started.elapsed());
        value
    }

    /// Records named startup phases as one INFO `Startup metrics` entry.
    pub fn record_startup(&self, phases: &[(&str, Duration)]) {
        if !self.enabled || phases.is_empty() {
            return;
        }
        let mut fields = Map::new();
        let mut total = Duration::ZERO;
        for (name, duration) in phases {
            total += *duration;
            fields.insert(
                name.to_string(),
                Value::String(format_millis(duration.as_secs_f64() * 1000.0)),
            );
        }
        fields.insert(
            "totalLoadTime".to_string(),
            Value::String(format_millis(total.as_secs_f64() * 1000.0)),
        );
        self.logger.info("Startup metrics", Value::Object(fields));
    }
}
