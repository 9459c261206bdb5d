//! The console-like output channel.
//!
//! Each accepted entry is printed as one line, `[time] [context] message`,
//! followed by its data and error. ERROR entries with a stack get a second
//! `Stack trace:` line when stack traces are enabled.
use crate::config::TelemetryConfig;
use crate::types::{Level, LogEntry};
use chrono::Local;
use colored::Colorize;
use std::sync::{Mutex, PoisonError};

/// Target used for lines the crate itself emits through `tracing`.
pub const CONSOLE_TARGET: &str = "site_telemetry::console";

/// A sink for rendered entries and for the crate's own warnings.
pub trait ConsoleSink: Send + Sync {
    /// Prints an accepted entry.
    fn emit(&self, entry: &LogEntry);

    /// Reports a best-effort failure (persistence, timers, ...).
    fn warn(&self, message: &str);

    /// Reports a failure inside the logging pipeline itself.
    fn fallback(&self, message: &str);
}

/// Rendering options shared by the console sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleFormat {
    pub include_timestamp: bool,
    pub include_stack_trace: bool,
}

impl ConsoleFormat {
    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self {
            include_timestamp: config.include_timestamp,
            include_stack_trace: config.include_stack_trace,
        }
    }

    /// Renders the entry line and, if applicable, the stack trace line.
    pub fn render(&self, entry: &LogEntry) -> (String, Option<String>) {
        let mut line = String::new();
        if self.include_timestamp {
            let local = entry.timestamp.with_timezone(&Local);
            line.push_str(&format!("[{}] ", local.format("%H:%M:%S")));
        }
        line.push_str(&format!("[{}] {}", entry.context, entry.message));

        if !entry.data.is_empty() {
            if let Ok(data) = serde_json::to_string(&entry.data) {
                line.push(' ');
                line.push_str(&data);
            }
        }
        if let Some(error) = &entry.error {
            line.push_str(&format!(" {}: {}", error.name, error.message));
        }

        let stack = match (&entry.error, entry.level) {
            (Some(error), Level::Error) if self.include_stack_trace => error
                .stack
                .as_ref()
                .map(|stack| format!("Stack trace: {}", stack)),
            _ => None,
        };

        (line, stack)
    }
}

impl Default for ConsoleFormat {
    fn default() -> Self {
        Self {
            include_timestamp: true,
            include_stack_trace: true,
        }
    }
}

/// Writes coloured lines to standard error.
pub struct StderrConsole {
    format: ConsoleFormat,
}

impl StderrConsole {
    pub fn new(format: ConsoleFormat) -> Self {
        Self { format }
    }
}

impl ConsoleSink for StderrConsole {
    fn emit(&self, entry: &LogEntry) {
        let (line, stack) = self.format.render(entry);
        let line = match entry.level {
            Level::Debug => line.dimmed(),
            Level::Info => line.normal(),
            Level::Warn => line.yellow(),
            Level::Error => line.red(),
        };
        eprintln!("{}", line);
        if let Some(stack) = stack {
            eprintln!("{}", stack.red());
        }
    }

    fn warn(&self, message: &str) {
        eprintln!("{}", message.yellow());
    }

    fn fallback(&self, message: &str) {
        eprintln!("{}", message.red().bold());
    }
}

/// Forwards lines to `tracing` under [`CONSOLE_TARGET`].
pub struct TracingConsole {
    format: ConsoleFormat,
}

impl TracingConsole {
    pub fn new(format: ConsoleFormat) -> Self {
        Self { format }
    }
}

impl ConsoleSink for TracingConsole {
    fn emit(&self, entry: &LogEntry) {
        let (line, stack) = self.format.render(entry);
        match entry.level {
            Level::Debug => tracing::debug!(target: CONSOLE_TARGET, "{}", line),
            Level::Info => tracing::info!(target: CONSOLE_TARGET, "{}", line),
            Level::Warn => tracing::warn!(target: CONSOLE_TARGET, "{}", line),
            Level::Error => tracing::error!(target: CONSOLE_TARGET, "{}", line),
        }
        if let Some(stack) = stack {
            tracing::error!(target: CONSOLE_TARGET, "{}", stack);
        }
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: CONSOLE_TARGET, "{}", message);
    }

    fn fallback(&self, message: &str) {
        tracing::error!(target: CONSOLE_TARGET, "{}", message);
    }
}

/// Keeps everything in memory, for hosts that render the console themselves.
#[derive(Default)]
pub struct MemoryConsole {
    format: ConsoleFormat,
    lines: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
    fallbacks: Mutex<Vec<String>>,
}

impl MemoryConsole {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn fallbacks(&self) -> Vec<String> {
        self.fallbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConsoleSink for MemoryConsole {
    fn emit(&self, entry: &LogEntry) {
        let (line, stack) = self.format.render(entry);
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.push(line);
        lines.extend(stack);
    }

    fn warn(&self, message: &str) {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }

    fn fallback(&self, message: &str) {
        self.fallbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}
