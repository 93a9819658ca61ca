// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;
use std::path::Path;

use status_tracker::{insert_entities, load_csv, logging, setup_database, verify_count, ClientConfig};

fn main() -> Result<()> {
    let config = ClientConfig::parse();

    // Import mode
    if let (Some(csv_path), Some(db_path)) = (config.import.clone(), config.db.clone()) {
        return run_import(&config, &csv_path, &db_path);
    }

    // UI mode (default)
    run_ui_mode(config)
}

fn run_import(config: &ClientConfig, csv_path: &Path, db_path: &Path) -> Result<()> {
    logging::init(&config.log_filter);

    println!("🗄️  Seed Import - CSV → SQLite + WAL");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load CSV
    println!("\n📂 Loading CSV...");
    let seeds = load_csv(csv_path)
        .with_context(|| format!("Failed to read seed file {}", csv_path.display()))?;
    println!("✓ Loaded {} rows from CSV", seeds.len());

    // 2. Setup database
    println!("\n🔧 Setting up database...");
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode");

    // 3. Insert entities
    println!("\n💾 Inserting entities...");
    let inserted = insert_entities(&conn, &seeds)?;
    println!("✓ Inserted: {}", inserted);
    println!("✓ Skipped duplicates: {}", seeds.len() - inserted);

    // 4. Verify count
    let count = verify_count(&conn)?;
    println!("\n✅ Database contains {} entities", count);

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: ClientConfig) -> Result<()> {
    use status_tracker::{HttpStore, RemoteStore, SqliteStore};
    use std::sync::Arc;

    logging::init_file(&config.log_filter, &config.log_file)?;

    let store: Arc<dyn RemoteStore> = match &config.db {
        Some(db_path) => {
            println!("🗄️  Opening local store {}...", db_path.display());
            Arc::new(
                SqliteStore::open(db_path)
                    .with_context(|| format!("Failed to open database {}", db_path.display()))?,
            )
        }
        None => {
            println!("🌐 Using API at {}...", config.api_url);
            Arc::new(HttpStore::from_config(&config).context("Failed to build HTTP client")?)
        }
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    tracing::info!(api = %config.api_url, db = ?config.db, "dashboard starting");

    // Create and run app
    let mut app = ui::App::new(runtime.handle().clone(), store, config.export_dir.clone());
    ui::run_ui(&mut app)?;

    runtime.shutdown_timeout(std::time::Duration::from_secs(1));
    println!("\n✅ Dashboard closed");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: ClientConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or run the API: cargo run --bin tracker-server --features server");
    std::process::exit(1);
}
