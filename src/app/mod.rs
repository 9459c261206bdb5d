pub mod args;
mod setup;

pub use args::{AppArgs, Command};

use crate::types::{ExportFormat, Level, LogFilter};
use anyhow::{bail, Result};
use serde_json::{json, Value};

pub async fn launch() -> Result<()> {
    launch_with_args(AppArgs::from_cli()).await
}

pub async fn launch_with_args(args: AppArgs) -> Result<()> {
    let setup::PreparedApp {
        args,
        logger,
        store,
        startup,
    } = setup::prepare(args)?;

    let outcome = match args.command.clone() {
        Command::Serve { port } => {
            print_start_banner(&args, port);
            setup::report_startup(&logger, &startup);
            logger.info(
                "Logging system fully initialized",
                json!({
                    "sessionId": logger.session_id(),
                    "features": {
                        "errorTracking": true,
                        "performanceMonitoring": logger.performance_monitoring(),
                        "persistent": !args.ephemeral,
                    }
                }),
            );
            crate::web::start_server(logger.clone(), port).await
        }
        Command::View {
            level,
            context,
            since,
        } => {
            let filter = LogFilter {
                level: level.as_deref().map(Level::parse_lenient),
                context,
                start_time: since,
            };
            println!("{}", serde_json::to_string_pretty(&logger.get_logs(&filter))?);
            Ok(())
        }
        Command::Export { format } => {
            let format: ExportFormat = format.parse()?;
            match logger.export_logs(format) {
                Some(rendered) => {
                    println!("{}", rendered);
                    Ok(())
                }
                None => bail!("export failed; see the stored ERROR entry"),
            }
        }
        Command::Clear => {
            logger.clear_logs();
            println!("Logs cleared");
            Ok(())
        }
        Command::Download { filename } => match logger.download_logs(filename.as_deref()) {
            Some(path) => {
                println!("Logs written to {}", path.display());
                Ok(())
            }
            None => bail!("download failed; see the stored ERROR entry"),
        },
    };

    if let Err(err) = store.flush() {
        logger.warn(
            "Could not flush log store",
            Value::Null,
            Some(crate::types::ErrorInfo::from_error(&err)),
        );
    }
    outcome
}

/// Prints a banner with startup information.
fn print_start_banner(args: &AppArgs, port: u16) {
    println!("🚀 Starting site telemetry host");
    println!("Accessors: http://127.0.0.1:{}/api/logs", port);
    if args.ephemeral {
        println!("Storage: in memory");
    } else {
        println!("Data directory: {}", args.data_dir);
    }
    println!();
}
