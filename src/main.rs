//! The main entry point for the site-telemetry host.
use anyhow::Result;

/// The main function of the application.
///
/// Parses the command line and runs the selected command against the
/// persisted telemetry store.
///
/// # Errors
///
/// Returns an error if setup fails or the command cannot complete.
#[tokio::main]
async fn main() -> Result<()> {
    site_telemetry::app::launch().await
}
