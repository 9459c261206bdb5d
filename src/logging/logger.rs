//! The `Logger` facade.
//!
//! Every emitting call runs the same pipeline: level filter, entry builder,
//! ring buffer, durable mirror, remote sink, console. Failures anywhere in
//! that chain stop here and are reported on the console's fallback channel;
//! they never reach the caller.
use super::buffer::RingBuffer;
use super::console::{ConsoleFormat, ConsoleSink, StderrConsole};
use super::entry::{into_data, EntryBuilder};
use super::export;
use super::filter::LevelFilter;
use super::persist::PersistenceAdapter;
use super::remote::{HttpTransport, RemoteSink, Transport};
use super::timers::{format_millis, TimerRegistry, TimerStop};
use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::storage::{LogSlot, LogStore, MemoryLogStore};
use crate::types::{ErrorInfo, ExportFormat, Level, LogData, LogEntry, LogFilter};
use serde_json::{json, Value};
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const DEFAULT_DOWNLOAD_NAME: &str = "site-logs.json";

thread_local! {
    // Set while this thread is inside the pipeline; nested calls (from a
    // console sink that logs through `tracing`, or a panic hook) are dropped.
    static RECORDING: Cell<bool> = const { Cell::new(false) };
}

struct Buffers {
    logs: RingBuffer,
    errors: RingBuffer,
}

struct Shared {
    filter: LevelFilter,
    builder: EntryBuilder,
    buffers: Mutex<Buffers>,
    timers: Mutex<TimerRegistry>,
    persistence: PersistenceAdapter,
    remote: RemoteSink,
    console: Arc<dyn ConsoleSink>,
    console_output: bool,
    interaction_tracking: bool,
    performance_monitoring: bool,
    long_task_threshold: Duration,
    download_dir: PathBuf,
}

impl Shared {
    fn lock_buffers(&self) -> MutexGuard<'_, Buffers> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_timers(&self) -> MutexGuard<'_, TimerRegistry> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builder for a [`Logger`]; anything not supplied falls back to a default
/// derived from the configuration.
pub struct LoggerBuilder {
    config: TelemetryConfig,
    store: Option<Arc<dyn LogStore>>,
    console: Option<Arc<dyn ConsoleSink>>,
    transport: Option<Arc<dyn Transport>>,
    download_dir: Option<PathBuf>,
}

impl LoggerBuilder {
    /// Durable store for the buffers. Defaults to an in-memory store.
    pub fn store(mut self, store: Arc<dyn LogStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Console channel. Defaults to coloured standard error.
    pub fn console(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.console = Some(console);
        self
    }

    /// Remote transport, used only when `remote_logging` is on. Defaults to
    /// HTTP.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Directory `download_logs` writes into. Defaults to the working
    /// directory.
    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// Builds the logger, seeding both buffers from the store.
    pub fn build(self) -> Logger {
        let config = self.config;
        let console = self.console.unwrap_or_else(|| {
            Arc::new(StderrConsole::new(ConsoleFormat::from_config(&config)))
        });
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryLogStore::new(config.storage_quota_bytes)));
        let persistence = PersistenceAdapter::new(store, console.clone(), config.persist);
        let remote = build_remote(&config, self.transport, console.as_ref());

        let buffers = Buffers {
            logs: RingBuffer::seeded(config.max_stored_logs, persistence.load(LogSlot::Logs)),
            errors: RingBuffer::seeded(
                config.max_stored_errors,
                persistence.load(LogSlot::Errors),
            ),
        };

        let shared = Shared {
            filter: LevelFilter::from_config(&config),
            builder: EntryBuilder::new(config.user_agent.clone()),
            buffers: Mutex::new(buffers),
            timers: Mutex::new(TimerRegistry::new(config.performance_monitoring)),
            persistence,
            remote,
            console,
            console_output: config.console_output,
            interaction_tracking: config.interaction_tracking,
            performance_monitoring: config.performance_monitoring,
            long_task_threshold: Duration::from_millis(config.long_task_threshold_ms),
            download_dir: self.download_dir.unwrap_or_else(|| PathBuf::from(".")),
        };

        tracing::debug!(
            session_id = %shared.builder.session_id(),
            level = %shared.filter.threshold(),
            remote = shared.remote.is_enabled(),
            "Logger initialized"
        );

        Logger {
            shared: Arc::new(shared),
            context: Arc::from(config.default_context.as_str()),
        }
    }
}

fn build_remote(
    config: &TelemetryConfig,
    transport: Option<Arc<dyn Transport>>,
    console: &dyn ConsoleSink,
) -> RemoteSink {
    if !config.remote_logging {
        return RemoteSink::disabled();
    }
    if let Some(transport) = transport {
        return RemoteSink::new(config.remote_endpoint.clone(), transport);
    }

    match HttpTransport::new(Duration::from_millis(config.remote_timeout_ms)) {
        Ok(mut http) => {
            if let Err(err) = http.start_beacon_queue() {
                tracing::debug!("Beacon queue unavailable, using detached posts: {}", err);
            }
            RemoteSink::new(config.remote_endpoint.clone(), Arc::new(http))
        }
        Err(err) => {
            console.warn(&format!("Remote logging disabled: {}", err));
            RemoteSink::disabled()
        }
    }
}

/// The single entry point for emitting, querying and exporting log data.
///
/// Cloning is cheap; clones (and loggers from [`Logger::with_context`]) share
/// one session, one set of buffers and one set of timers.
#[derive(Clone)]
pub struct Logger {
    shared: Arc<Shared>,
    context: Arc<str>,
}

impl Logger {
    pub fn builder(config: TelemetryConfig) -> LoggerBuilder {
        LoggerBuilder {
            config,
            store: None,
            console: None,
            transport: None,
            download_dir: None,
        }
    }

    pub fn new(config: TelemetryConfig) -> Self {
        Self::builder(config).build()
    }

    /// Returns a logger that tags its entries with `context` and shares
    /// everything else with `self`.
    pub fn with_context(&self, context: impl AsRef<str>) -> Logger {
        Logger {
            shared: Arc::clone(&self.shared),
            context: Arc::from(context.as_ref()),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn session_id(&self) -> &str {
        self.shared.builder.session_id()
    }

    /// Updates the URL captured by subsequent entries.
    pub fn set_location(&self, url: impl Into<String>) {
        self.shared.builder.set_location(url);
    }

    pub fn performance_monitoring(&self) -> bool {
        self.shared.performance_monitoring
    }

    pub fn long_task_threshold(&self) -> Duration {
        self.shared.long_task_threshold
    }

    pub fn debug(&self, message: impl Into<String>, data: Value) {
        self.log(Level::Debug, message, data, None);
    }

    pub fn info(&self, message: impl Into<String>, data: Value) {
        self.log(Level::Info, message, data, None);
    }

    pub fn warn(&self, message: impl Into<String>, data: Value, error: Option<ErrorInfo>) {
        self.log(Level::Warn, message, data, error);
    }

    pub fn error(&self, message: impl Into<String>, data: Value, error: Option<ErrorInfo>) {
        self.log(Level::Error, message, data, error);
    }

    /// Records an entry at `level`. `data` may be any JSON value; objects are
    /// stored as-is, `null` as empty.
    pub fn log(
        &self,
        level: Level,
        message: impl Into<String>,
        data: Value,
        error: Option<ErrorInfo>,
    ) {
        self.log_in(&self.context, level, message.into(), data, error);
    }

    pub(crate) fn log_in(
        &self,
        context: &str,
        level: Level,
        message: String,
        data: Value,
        error: Option<ErrorInfo>,
    ) {
        self.contained(|| self.record(context, level, message, data, error));
    }

    /// Runs `f` inside the pipeline boundary: panics are reported on the
    /// fallback channel and nested emits on this thread are dropped.
    fn contained(&self, f: impl FnOnce()) {
        if RECORDING.with(|flag| flag.replace(true)) {
            return;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(f));
        RECORDING.with(|flag| flag.set(false));

        if let Err(payload) = outcome {
            self.shared.console.fallback(&format!(
                "Logging system error: {}",
                panic_message(payload.as_ref())
            ));
        }
    }

    fn record(
        &self,
        context: &str,
        level: Level,
        message: String,
        data: Value,
        error: Option<ErrorInfo>,
    ) {
        let shared = &*self.shared;
        if !shared.filter.permits(level) {
            return;
        }

        let data = into_data(data);
        let entry = {
            let mut guard = shared.lock_buffers();
            let buffers = &mut *guard;
            // Stamped under the lock so buffer order is timestamp order.
            let entry = shared.builder.build(level, context, message, data, error);
            buffers.logs.append(entry.clone());
            shared
                .persistence
                .save(LogSlot::Logs, buffers.logs.contiguous());

            if level == Level::Error {
                buffers.errors.append(entry.clone());
                shared
                    .persistence
                    .save(LogSlot::Errors, buffers.errors.contiguous());
            }
            entry
        };

        shared.remote.send(&entry);
        if shared.console_output {
            shared.console.emit(&entry);
        }
    }

    /// Starts (or restarts) the timer named `label`.
    pub fn start_timer(&self, label: &str) {
        let started = self.shared.lock_timers().start(label);
        if started {
            self.debug(format!("Timer started: {}", label), Value::Null);
        }
    }

    /// Stops the timer named `label` and records its duration merged into
    /// `data`.
    ///
    /// # Returns
    ///
    /// The elapsed milliseconds, or `None` when the timer was never started
    /// or performance monitoring is off.
    pub fn end_timer(&self, label: &str, data: Value) -> Option<f64> {
        let outcome = self.shared.lock_timers().stop(label);
        match outcome {
            TimerStop::Disabled => None,
            TimerStop::Missing => {
                self.warn(
                    format!("Timer \"{}\" was never started", label),
                    Value::Null,
                    None,
                );
                None
            }
            TimerStop::Elapsed(millis) => {
                let mut fields = into_data(data);
                fields.insert("duration".to_string(), Value::String(format_millis(millis)));
                self.info(format!("Timer completed: {}", label), Value::Object(fields));
                Some(millis)
            }
        }
    }

    /// Records a user interaction as an INFO entry.
    pub fn track_interaction(&self, action: &str, element: &str, data: Value) {
        if !self.shared.interaction_tracking {
            return;
        }

        let mut fields = LogData::new();
        fields.insert("action".to_string(), Value::String(action.to_string()));
        fields.insert("element".to_string(), Value::String(element.to_string()));
        fields.extend(into_data(data));
        self.info("User interaction", Value::Object(fields));
    }

    /// Returns a snapshot of the entries matching `filter`.
    pub fn get_logs(&self, filter: &LogFilter) -> Vec<LogEntry> {
        self.shared.lock_buffers().logs.query(filter)
    }

    /// Returns a snapshot of the ERROR-only category.
    pub fn get_errors(&self) -> Vec<LogEntry> {
        self.shared.lock_buffers().errors.snapshot()
    }

    /// Renders every buffered entry. On failure an ERROR entry is recorded
    /// and `None` returned.
    pub fn export_logs(&self, format: ExportFormat) -> Option<String> {
        let entries = self.get_logs(&LogFilter::default());
        match export::render(&entries, format) {
            Ok(rendered) => Some(rendered),
            Err(err) => {
                self.error(
                    "Failed to export logs",
                    Value::Null,
                    Some(ErrorInfo::from_error(&err)),
                );
                None
            }
        }
    }

    /// Empties both buffers and their durable slots, then records that it did.
    pub fn clear_logs(&self) {
        self.contained(|| {
            let mut buffers = self.shared.lock_buffers();
            buffers.logs.clear();
            buffers.errors.clear();
            self.shared.persistence.clear(LogSlot::Logs);
            self.shared.persistence.clear(LogSlot::Errors);
        });
        self.info("Logs cleared", Value::Null);
    }

    /// Writes the JSON export into the download directory.
    ///
    /// # Returns
    ///
    /// The written path, or `None` if writing failed (an ERROR entry is
    /// recorded in that case).
    pub fn download_logs(&self, filename: Option<&str>) -> Option<PathBuf> {
        let filename = filename.unwrap_or(DEFAULT_DOWNLOAD_NAME);
        match self.write_download(filename) {
            Ok(path) => {
                self.info("Logs downloaded", json!({ "filename": filename }));
                Some(path)
            }
            Err(err) => {
                self.error(
                    "Failed to download logs",
                    json!({ "filename": filename }),
                    Some(ErrorInfo::from_error(&err)),
                );
                None
            }
        }
    }

    fn write_download(&self, filename: &str) -> Result<PathBuf> {
        let name = Path::new(filename).file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid file name '{}'", filename),
            )
        })?;
        let content = export::to_json(&self.get_logs(&LogFilter::default()))?;

        std::fs::create_dir_all(&self.shared.download_dir)?;
        let path = self.shared.download_dir.join(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::console::MemoryConsole;
    use rand::Rng;
    use serde_json::json;
    use std::sync::OnceLock;

    struct Harness {
        logger: Logger,
        console: Arc<MemoryConsole>,
        store: Arc<MemoryLogStore>,
    }

    fn harness(config: TelemetryConfig) -> Harness {
        harness_with_store(config, Arc::new(MemoryLogStore::default()))
    }

    fn harness_with_store(config: TelemetryConfig, store: Arc<MemoryLogStore>) -> Harness {
        let console = Arc::new(MemoryConsole::default());
        let logger = Logger::builder(config)
            .store(store.clone())
            .console(console.clone())
            .build();
        Harness {
            logger,
            console,
            store,
        }
    }

    fn messages(entries: &[LogEntry]) -> Vec<String> {
        entries.iter().map(|entry| entry.message.clone()).collect()
    }

    #[test]
    fn info_entry_is_queryable_by_level() {
        let h = harness(TelemetryConfig::default());
        h.logger.info("Page loaded", json!({ "url": "/home" }));

        let logs = h.logger.get_logs(&LogFilter::level(Level::Info));
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "Page loaded");
        assert_eq!(logs[0].data["url"], json!("/home"));
        assert_eq!(logs[0].context, "App");
        assert_eq!(logs[0].session_id, h.logger.session_id());
        assert_eq!(h.console.lines().len(), 1);
    }

    #[test]
    fn overflow_keeps_last_entries_in_memory_and_storage() {
        let config = TelemetryConfig {
            max_stored_logs: 5,
            ..TelemetryConfig::default()
        };
        let h = harness(config);
        for i in 0..12 {
            h.logger.info(format!("entry {}", i), Value::Null);
        }

        let expected: Vec<String> = (7..12).map(|i| format!("entry {}", i)).collect();
        assert_eq!(messages(&h.logger.get_logs(&LogFilter::default())), expected);
        assert_eq!(messages(&h.store.load(LogSlot::Logs).unwrap()), expected);
    }

    #[test]
    fn threshold_drops_lower_levels() {
        let config = TelemetryConfig {
            level: Level::Info,
            ..TelemetryConfig::default()
        };
        let h = harness(config);
        h.logger.error("late", Value::Null, None);
        h.logger.debug("noise", Value::Null);
        h.logger.info("kept", Value::Null);

        assert_eq!(
            messages(&h.logger.get_logs(&LogFilter::default())),
            vec!["late", "kept"]
        );
    }

    #[test]
    fn disabled_logging_records_nothing() {
        let config = TelemetryConfig {
            enabled: false,
            ..TelemetryConfig::default()
        };
        let h = harness(config);
        h.logger.error("ignored", Value::Null, None);
        assert!(h.logger.get_logs(&LogFilter::default()).is_empty());
        assert!(h.console.lines().is_empty());
    }

    #[test]
    fn timers_measure_and_warn_once_on_missing_label() {
        let h = harness(TelemetryConfig::default());
        h.logger.start_timer("x");
        let elapsed = h.logger.end_timer("x", json!({ "step": "render" }));
        assert!(elapsed.unwrap() >= 0.0);

        assert_eq!(h.logger.end_timer("x", Value::Null), None);

        let warnings = h.logger.get_logs(&LogFilter::level(Level::Warn));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "Timer \"x\" was never started");

        let completed = h.logger.get_logs(&LogFilter::level(Level::Info));
        assert_eq!(completed[0].message, "Timer completed: x");
        assert_eq!(completed[0].data["step"], json!("render"));
        assert!(completed[0].data["duration"]
            .as_str()
            .unwrap()
            .ends_with("ms"));
    }

    #[test]
    fn timers_are_inert_without_performance_monitoring() {
        let config = TelemetryConfig {
            performance_monitoring: false,
            ..TelemetryConfig::default()
        };
        let h = harness(config);
        h.logger.start_timer("x");
        assert_eq!(h.logger.end_timer("x", Value::Null), None);
        assert_eq!(h.logger.end_timer("never", Value::Null), None);
        assert!(h.logger.get_logs(&LogFilter::default()).is_empty());
    }

    #[test]
    fn json_export_matches_current_logs() {
        let h = harness(TelemetryConfig::default());
        h.logger.info("one", json!({ "a": 1 }));
        h.logger.warn(
            "two",
            Value::Null,
            Some(ErrorInfo::new("RangeError", "too far")),
        );

        let exported = h.logger.export_logs(ExportFormat::Json).unwrap();
        let parsed: Vec<LogEntry> = serde_json::from_str(&exported).unwrap();
        assert_eq!(parsed, h.logger.get_logs(&LogFilter::default()));
    }

    #[test]
    fn json_export_and_reload_preserve_float_data() {
        let store = Arc::new(MemoryLogStore::default());
        let h = harness_with_store(TelemetryConfig::default(), store.clone());
        let mut rng = rand::thread_rng();
        for i in 0..40 {
            let mut data = LogData::new();
            for j in 0..25 {
                data.insert(format!("scaled{}", j), json!(rng.gen::<f64>() * 1000.0));
                let raw = f64::from_bits(rng.gen::<u64>());
                if raw.is_finite() {
                    data.insert(format!("raw{}", j), json!(raw));
                }
            }
            h.logger.info(format!("sample {}", i), Value::Object(data));
        }

        let current = h.logger.get_logs(&LogFilter::default());
        let exported = h.logger.export_logs(ExportFormat::Json).unwrap();
        let parsed: Vec<LogEntry> = serde_json::from_str(&exported).unwrap();
        assert_eq!(parsed, current);

        let reloaded = harness_with_store(TelemetryConfig::default(), store);
        assert_eq!(reloaded.logger.get_logs(&LogFilter::default()), current);
    }

    #[test]
    fn concurrent_emits_keep_timestamps_in_order() {
        let config = TelemetryConfig {
            max_stored_logs: 4000,
            persist: false,
            console_output: false,
            ..TelemetryConfig::default()
        };
        let h = harness(config);

        std::thread::scope(|scope| {
            for t in 0..8 {
                let logger = h.logger.clone();
                scope.spawn(move || {
                    for i in 0..500 {
                        logger.info(format!("worker {} entry {}", t, i), Value::Null);
                    }
                });
            }
        });

        let logs = h.logger.get_logs(&LogFilter::default());
        assert_eq!(logs.len(), 4000);
        assert!(logs
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[test]
    fn csv_export_has_header_and_one_row_per_entry() {
        let h = harness(TelemetryConfig::default());
        assert_eq!(h.logger.export_logs(ExportFormat::Csv).unwrap(), "");

        h.logger.info("a", Value::Null);
        h.logger.info("b", Value::Null);
        let csv = h.logger.export_logs(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|line| line.starts_with('"') && line.ends_with('"')));
    }

    #[test]
    fn storage_failure_never_reaches_caller() {
        let store = Arc::new(MemoryLogStore::new(16));
        let h = harness_with_store(TelemetryConfig::default(), store);

        h.logger.info("first", Value::Null);
        h.logger.info("second", Value::Null);

        assert_eq!(h.logger.get_logs(&LogFilter::default()).len(), 2);
        assert_eq!(h.console.warnings().len(), 2);
        assert!(h.store.raw(LogSlot::Logs).is_none());
    }

    #[test]
    fn persisted_entries_seed_next_logger() {
        let store = Arc::new(MemoryLogStore::default());
        let first = harness_with_store(TelemetryConfig::default(), store.clone());
        first.logger.info("before reload", Value::Null);
        first.logger.error("broken", Value::Null, None);

        let second = harness_with_store(TelemetryConfig::default(), store);
        assert_eq!(
            messages(&second.logger.get_logs(&LogFilter::default())),
            vec!["before reload", "broken"]
        );
        assert_eq!(second.logger.get_errors().len(), 1);
        assert_ne!(first.logger.session_id(), second.logger.session_id());
    }

    #[test]
    fn corrupt_storage_starts_empty() {
        let store = Arc::new(MemoryLogStore::default());
        store.put_raw(LogSlot::Logs, "not json at all");
        let h = harness_with_store(TelemetryConfig::default(), store);

        assert!(h.logger.get_logs(&LogFilter::default()).is_empty());
        assert_eq!(h.console.warnings().len(), 1);
        h.logger.info("recovered", Value::Null);
        assert_eq!(h.logger.get_logs(&LogFilter::default()).len(), 1);
    }

    #[test]
    fn error_category_has_its_own_capacity() {
        let config = TelemetryConfig {
            max_stored_errors: 2,
            ..TelemetryConfig::default()
        };
        let h = harness(config);
        for i in 0..4 {
            h.logger.error(format!("e{}", i), Value::Null, None);
            h.logger.info(format!("i{}", i), Value::Null);
        }

        assert_eq!(messages(&h.logger.get_errors()), vec!["e2", "e3"]);
        assert_eq!(h.logger.get_logs(&LogFilter::default()).len(), 8);
        assert_eq!(h.store.load(LogSlot::Errors).unwrap().len(), 2);
    }

    #[test]
    fn clear_logs_empties_everything_then_records_itself() {
        let h = harness(TelemetryConfig::default());
        h.logger.error("boom", Value::Null, None);
        h.logger.clear_logs();

        let logs = h.logger.get_logs(&LogFilter::default());
        assert_eq!(messages(&logs), vec!["Logs cleared"]);
        assert!(h.logger.get_errors().is_empty());
        assert!(h.store.raw(LogSlot::Errors).is_none());
    }

    #[test]
    fn interactions_merge_data_and_respect_switch() {
        let h = harness(TelemetryConfig::default());
        h.logger
            .track_interaction("click", "#cta", json!({ "section": "hero" }));

        let logs = h.logger.get_logs(&LogFilter::default());
        assert_eq!(logs[0].message, "User interaction");
        assert_eq!(logs[0].data["action"], json!("click"));
        assert_eq!(logs[0].data["element"], json!("#cta"));
        assert_eq!(logs[0].data["section"], json!("hero"));

        let quiet = harness(TelemetryConfig {
            interaction_tracking: false,
            ..TelemetryConfig::default()
        });
        quiet.logger.track_interaction("click", "#cta", Value::Null);
        assert!(quiet.logger.get_logs(&LogFilter::default()).is_empty());
    }

    #[test]
    fn contexts_share_one_buffer() {
        let h = harness(TelemetryConfig::default());
        let slider = h.logger.with_context("Slider");
        slider.info("advanced", Value::Null);
        h.logger.info("root", Value::Null);

        let filter = LogFilter {
            context: Some("Slider".into()),
            ..LogFilter::default()
        };
        assert_eq!(messages(&h.logger.get_logs(&filter)), vec!["advanced"]);
        assert_eq!(slider.get_logs(&LogFilter::default()).len(), 2);
        assert_eq!(slider.session_id(), h.logger.session_id());
    }

    #[test]
    fn location_is_captured_per_entry() {
        let h = harness(TelemetryConfig::default());
        h.logger.set_location("/home");
        h.logger.info("a", Value::Null);
        h.logger.set_location("/pricing");
        h.logger.info("b", Value::Null);

        let logs = h.logger.get_logs(&LogFilter::default());
        assert_eq!(logs[0].url, "/home");
        assert_eq!(logs[1].url, "/pricing");
    }

    struct ExplodingConsole {
        fallbacks: Mutex<Vec<String>>,
    }

    impl ConsoleSink for ExplodingConsole {
        fn emit(&self, _entry: &LogEntry) {
            panic!("console went away");
        }

        fn warn(&self, _message: &str) {}

        fn fallback(&self, message: &str) {
            self.fallbacks.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn pipeline_panics_are_contained() {
        let console = Arc::new(ExplodingConsole {
            fallbacks: Mutex::new(Vec::new()),
        });
        let logger = Logger::builder(TelemetryConfig::default())
            .console(console.clone())
            .build();

        logger.info("first", Value::Null);
        logger.info("second", Value::Null);

        assert_eq!(logger.get_logs(&LogFilter::default()).len(), 2);
        let fallbacks = console.fallbacks.lock().unwrap();
        assert_eq!(fallbacks.len(), 2);
        assert_eq!(fallbacks[0], "Logging system error: console went away");
    }

    #[test]
    fn download_writes_json_export() {
        let dir = std::env::temp_dir().join(format!("site-telemetry-{}", std::process::id()));
        let console = Arc::new(MemoryConsole::default());
        let logger = Logger::builder(TelemetryConfig::default())
            .console(console)
            .download_dir(&dir)
            .build();
        logger.info("saved", Value::Null);

        let path = logger.download_logs(Some("export.json")).unwrap();
        let written: Vec<LogEntry> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].message, "saved");

        let last = logger.get_logs(&LogFilter::default()).pop().unwrap();
        assert_eq!(last.message, "Logs downloaded");
        assert_eq!(last.data["filename"], json!("export.json"));

        assert!(logger.download_logs(Some("..")).is_none());
        let failure = logger.get_errors().pop().unwrap();
        assert_eq!(failure.message, "Failed to download logs");

        let _ = std::fs::remove_dir_all(dir);
    }

    /// Calls back into the logger from `clear` before failing, the way a
    /// panic hook would while the buffers are locked.
    struct ReentrantStore {
        logger: OnceLock<Logger>,
    }

    impl LogStore for ReentrantStore {
        fn load(&self, _slot: LogSlot) -> Result<Vec<LogEntry>> {
            Ok(Vec::new())
        }

        fn save(&self, _slot: LogSlot, _entries: &[LogEntry]) -> Result<()> {
            Ok(())
        }

        fn clear(&self, _slot: LogSlot) -> Result<()> {
            if let Some(logger) = self.logger.get() {
                logger.error("store callback", Value::Null, None);
            }
            panic!("store vanished");
        }
    }

    #[test]
    fn clear_logs_contains_store_panics_without_deadlock() {
        let store = Arc::new(ReentrantStore {
            logger: OnceLock::new(),
        });
        let console = Arc::new(MemoryConsole::default());
        let logger = Logger::builder(TelemetryConfig::default())
            .store(store.clone())
            .console(console.clone())
            .build();
        let _ = store.logger.set(logger.clone());

        logger.error("before clear", Value::Null, None);
        logger.clear_logs();

        assert_eq!(
            messages(&logger.get_logs(&LogFilter::default())),
            vec!["Logs cleared"]
        );
        assert!(logger.get_errors().is_empty());
        assert_eq!(
            console.fallbacks(),
            vec!["Logging system error: store vanished".to_string()]
        );
    }
}
