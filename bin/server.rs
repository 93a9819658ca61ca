// Status Tracker - Web Server
// REST API over the SQLite store

use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;
use status_tracker::server::{router, AppState};
use status_tracker::{insert_entities, load_csv, logging, setup_database, verify_count, ServerConfig};
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    logging::init(&config.log_filter);

    println!("🌐 Status Tracker - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Open database
    if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let conn = Connection::open(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
    setup_database(&conn)?;
    println!("✓ Database opened: {}", config.db_path.display());

    // Optional seed import
    if let Some(seed) = &config.seed {
        let seeds = load_csv(seed)
            .with_context(|| format!("Failed to read seed file {}", seed.display()))?;
        let inserted = insert_entities(&conn, &seeds)?;
        println!("✓ Seeded {} new entities from {}", inserted, seed.display());
    }
    println!("✓ {} entities in store", verify_count(&conn)?);

    // Create shared state
    let state = AppState::new(Arc::new(Mutex::new(conn)));
    let app = router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    println!("\n🚀 Server running on http://{}", config.bind);
    println!("   API: http://{}/api/entities", config.bind);
    println!("\n   Press Ctrl+C to stop\n");
    tracing::info!(bind = %config.bind, "server listening");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
