use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "site-telemetry")]
#[command(about = "Client-side logging and telemetry host")]
pub struct AppArgs {
    #[arg(long, help = "Config file path (JSON)")]
    pub config: Option<String>,

    #[arg(long, default_value = "data", help = "Data directory")]
    pub data_dir: String,

    #[arg(long, help = "Keep logs in memory only")]
    pub ephemeral: bool,

    #[arg(long, help = "Minimum level recorded (DEBUG, INFO, WARN, ERROR)")]
    pub level: Option<String>,

    #[arg(long, help = "Forward entries to this collector URL")]
    pub remote_endpoint: Option<String>,

    #[arg(long, help = "Do not echo entries to the console")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the logging accessors over HTTP.
    Serve {
        #[arg(long, default_value_t = 8080, help = "Port to listen on")]
        port: u16,
    },
    /// Print stored entries as JSON.
    View {
        #[arg(long, help = "Only entries with this level")]
        level: Option<String>,
        #[arg(long, help = "Only entries from this context")]
        context: Option<String>,
        #[arg(long, help = "Only entries at or after this RFC 3339 time")]
        since: Option<DateTime<Utc>>,
    },
    /// Print every stored entry as JSON or CSV.
    Export {
        #[arg(long, default_value = "json", help = "json or csv")]
        format: String,
    },
    /// Delete every stored entry.
    Clear,
    /// Write the JSON export into the downloads directory.
    Download {
        #[arg(long, help = "File name (default site-logs.json)")]
        filename: Option<String>,
    },
}

impl AppArgs {
    pub fn from_cli() -> Self {
        <Self as Parser>::parse()
    }

    pub fn is_server(&self) -> bool {
        matches!(self.command, Command::Serve { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_view_filters() {
        let args = AppArgs::try_parse_from([
            "site-telemetry",
            "--ephemeral",
            "view",
            "--level",
            "WARN",
            "--since",
            "2024-01-01T00:00:00Z",
        ])
        .unwrap();

        assert!(args.ephemeral);
        match args.command {
            Command::View { level, since, .. } => {
                assert_eq!(level.as_deref(), Some("WARN"));
                assert!(since.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn serve_defaults_port() {
        let args = AppArgs::try_parse_from(["site-telemetry", "serve"]).unwrap();
        assert!(args.is_server());
        assert!(matches!(args.command, Command::Serve { port: 8080 }));
    }
}
