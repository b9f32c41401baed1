//! Check-in Ledger Daemon
//!
//! Serves the append-only check-in ledger over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults (SQLite file in the working directory, port 8095)
//! checkin-ledger
//!
//! # Custom config file
//! checkin-ledger --config /etc/checkin-ledger.toml
//!
//! # Throwaway in-memory ledger
//! checkin-ledger --in-memory --http-port 9000
//! ```
//!
//! ## HTTP API
//!
//! - `GET /?action=check&email=...&monthId=...` - Check for an existing row
//! - `POST /` - `{"action":"check",...}` or `{"action":"append","data":{...}}`
//! - `GET /health` - Health check

use checkin_ledger::{serve, Config, Ledger, MemoryStore, RowStore, SqliteStore};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "checkin-ledger")]
#[command(about = "Append-only ledger endpoint for monthly check-ins")]
struct Args {
    /// Path to config file
    #[arg(short, long, env = "CHECKIN_LEDGER_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP port
    #[arg(long, env = "CHECKIN_LEDGER_PORT")]
    http_port: Option<u16>,

    /// SQLite database path
    #[arg(long)]
    database: Option<PathBuf>,

    /// Sheet that receives rows
    #[arg(long)]
    sheet_name: Option<String>,

    /// Keep rows in memory only
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("checkin_ledger=info".parse()?),
        )
        .init();

    let args = Args::parse();

    // Load config
    let mut config = if let Some(config_path) = &args.config {
        Config::load(config_path)?
    } else {
        Config::default()
    };

    // Apply CLI overrides
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(sheet_name) = args.sheet_name {
        config.sheet_name = sheet_name;
    }

    let store: Arc<dyn RowStore> = if args.in_memory {
        info!("Using in-memory ledger");
        Arc::new(MemoryStore::new())
    } else {
        info!(database = %config.database_path.display(), "Using SQLite ledger");
        Arc::new(SqliteStore::open(&config.database_path)?)
    };

    let ledger = Arc::new(Ledger::new(store, config.sheet_name.clone()));

    let listener = TcpListener::bind(config.listen_addr()).await?;
    info!(
        addr = %config.listen_addr(),
        sheet = %config.sheet_name,
        "Starting checkin-ledger"
    );

    serve(listener, ledger).await?;
    Ok(())
}
