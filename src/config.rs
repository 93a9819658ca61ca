// ⚙️ Configuration
// CLI flags with environment fallbacks. Base URL, port and file locations are
// deployment concerns, never hardcoded into the core.

use clap::Parser;
use std::path::PathBuf;

/// Dashboard client settings
#[derive(Debug, Clone, Parser)]
#[command(name = "status-tracker", about = "Terminal dashboard for biller / ISP / MFI go-live tracking")]
pub struct ClientConfig {
    /// Base URL of the status API
    #[arg(long, env = "TRACKER_API_URL", default_value = "http://localhost:5000/api")]
    pub api_url: String,

    /// Request timeout in seconds
    #[arg(long, env = "TRACKER_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Open a local SQLite store instead of talking to the API
    #[arg(long, env = "TRACKER_DB")]
    pub db: Option<PathBuf>,

    /// Import a CSV (Name,Category,Status,Web,Top50) into --db and exit
    #[arg(long, requires = "db")]
    pub import: Option<PathBuf>,

    /// Where spreadsheet exports are written
    #[arg(long, env = "TRACKER_EXPORT_DIR", default_value = ".")]
    pub export_dir: PathBuf,

    /// Log file (the terminal belongs to the UI)
    #[arg(long, env = "TRACKER_LOG_FILE", default_value = "status-tracker.log")]
    pub log_file: PathBuf,

    /// tracing filter directive, e.g. "info" or "status_tracker=debug"
    #[arg(long, env = "TRACKER_LOG", default_value = "info")]
    pub log_filter: String,
}

/// API server settings
#[derive(Debug, Clone, Parser)]
#[command(name = "tracker-server", about = "REST API for the status tracker")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "TRACKER_BIND", default_value = "0.0.0.0:5000")]
    pub bind: String,

    /// SQLite database file
    #[arg(long, env = "TRACKER_DB_PATH", default_value = "instance/status_tracker.db")]
    pub db_path: PathBuf,

    /// CSV of entities to import on start (Name,Category,Status,Web,Top50)
    #[arg(long, env = "TRACKER_SEED")]
    pub seed: Option<PathBuf>,

    #[arg(long, env = "TRACKER_LOG", default_value = "info")]
    pub log_filter: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_defaults() {
        let config = ClientConfig::parse_from(["status-tracker"]);
        assert_eq!(config.timeout_secs, 10);
        assert!(config.db.is_none());
        assert_eq!(config.export_dir, PathBuf::from("."));
        assert!(config.import.is_none());
    }

    #[test]
    fn test_import_requires_db() {
        assert!(ClientConfig::try_parse_from(["status-tracker", "--import", "seed.csv"]).is_err());

        let config = ClientConfig::try_parse_from([
            "status-tracker",
            "--db",
            "local.db",
            "--import",
            "seed.csv",
        ])
        .unwrap();
        assert_eq!(config.import, Some(PathBuf::from("seed.csv")));
    }

    #[test]
    fn test_server_flags_override() {
        let config = ServerConfig::parse_from([
            "tracker-server",
            "--bind",
            "127.0.0.1:8080",
            "--db-path",
            "/tmp/t.db",
        ]);
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.db_path, PathBuf::from("/tmp/t.db"));
        assert!(config.seed.is_none());
    }
}
