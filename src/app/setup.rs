//! This module handles the initial setup of the application.
use super::args::AppArgs;
use crate::config::TelemetryConfig;
use crate::logging::{
    observer, ConsoleFormat, Logger, PerformanceMonitor, TelemetryLayer, TracingConsole,
};
use crate::storage::{LogStore, MemoryLogStore, SledLogStore};
use crate::types::Level;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Contains all the necessary components for the application to run.
pub struct PreparedApp {
    /// The command-line arguments.
    pub args: AppArgs,
    /// The session logger.
    pub logger: Logger,
    /// The store backing the logger, flushed before exit.
    pub store: Arc<dyn LogStore>,
    /// Durations of the setup phases.
    pub startup: Vec<(&'static str, Duration)>,
}

/// Prepares the application for running.
///
/// This function performs the following steps:
/// 1. Loads the config file and applies command-line overrides.
/// 2. Opens the log store.
/// 3. Builds the session logger.
/// 4. Configures `tracing`, recording host events when serving.
/// 5. Installs the panic hook.
///
/// # Arguments
///
/// * `args` - The command-line arguments.
///
/// # Errors
///
/// This function will return an error if any of the setup steps fail.
pub fn prepare(args: AppArgs) -> Result<PreparedApp> {
    let mut startup = Vec::new();

    let started = Instant::now();
    let config = resolve_config(&args)?;
    startup.push(("config", started.elapsed()));

    let started = Instant::now();
    let store = open_store(&args, &config)?;
    startup.push(("storage", started.elapsed()));

    let started = Instant::now();
    let logger = Logger::builder(config.clone())
        .store(store.clone())
        .console(Arc::new(TracingConsole::new(ConsoleFormat::from_config(
            &config,
        ))))
        .download_dir(Path::new(&args.data_dir).join("downloads"))
        .build();
    startup.push(("logger", started.elapsed()));

    configure_logging(&logger, args.is_server());
    observer::install_panic_hook(logger.clone());

    Ok(PreparedApp {
        args,
        logger,
        store,
        startup,
    })
}

/// Records the setup phases collected by `prepare`.
pub fn report_startup(logger: &Logger, phases: &[(&'static str, Duration)]) {
    PerformanceMonitor::new(logger.clone()).record_startup(phases);
}

fn resolve_config(args: &AppArgs) -> Result<TelemetryConfig> {
    let path = args.config.as_ref().map(PathBuf::from);
    let mut config = TelemetryConfig::load(path.as_deref())
        .with_context(|| format!("loading config {:?}", args.config))?;

    if let Some(level) = &args.level {
        config.level = Level::parse_lenient(level);
    }
    if let Some(endpoint) = &args.remote_endpoint {
        config.remote_logging = true;
        config.remote_endpoint = endpoint.clone();
    }
    if args.quiet {
        config.console_output = false;
    }
    config.validate()?;
    Ok(config)
}

fn open_store(args: &AppArgs, config: &TelemetryConfig) -> Result<Arc<dyn LogStore>> {
    if args.ephemeral {
        return Ok(Arc::new(MemoryLogStore::new(config.storage_quota_bytes)));
    }

    std::fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("creating data directory {}", args.data_dir))?;
    let db_path = format!("{}/db", args.data_dir);
    let db = sled::open(&db_path).with_context(|| format!("opening {}", db_path))?;
    Ok(Arc::new(SledLogStore::new(&db, config.storage_quota_bytes)?))
}

/// Configures logging for the application.
///
/// When serving, host events are also recorded into the session logger.
fn configure_logging(logger: &Logger, record_host_events: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,site_telemetry=debug"));
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let telemetry = record_host_events.then(|| TelemetryLayer::new(logger.clone()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt)
        .with(telemetry)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let args = AppArgs::try_parse_from([
            "site-telemetry",
            "--level",
            "error",
            "--remote-endpoint",
            "http://collector.local/api/logs",
            "--quiet",
            "clear",
        ])
        .unwrap();

        let config = resolve_config(&args).unwrap();
        assert_eq!(config.level, Level::Error);
        assert!(config.remote_logging);
        assert_eq!(config.remote_endpoint, "http://collector.local/api/logs");
        assert!(!config.console_output);
    }
}
