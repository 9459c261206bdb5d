//! Client-side logging and telemetry for a marketing site.
//!
//! A [`Logger`] records leveled, structured entries into a bounded buffer,
//! mirrors them into a durable slot, optionally forwards them to a remote
//! collector and prints them to a console channel. Nothing in this crate ever
//! surfaces a logging failure to the calling code.
pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod storage;
pub mod types;
pub mod web;

pub use config::TelemetryConfig;
pub use error::TelemetryError;
pub use logging::Logger;
pub use types::{ErrorInfo, ExportFormat, Level, LogData, LogEntry, LogFilter};
