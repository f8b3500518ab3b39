//! # postbox-server
//!
//! Server-side host for the postbox store.
//!
//! This binary provides:
//! - the **server database** (key packages + mailboxes), opened with
//!   fsync-on-commit durability and migrated to the current schema
//! - a **backlog reporter** that logs table volume on a timer, since the
//!   store never expires data on its own
//!
//! The delivery service that calls into the store links `postbox-store`
//! directly; this process owns the database file's lifecycle.

mod config;
mod reporter;

use std::sync::{Arc, Mutex};

use anyhow::Context;
use postbox_store::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,postbox_server=debug,postbox_store=debug")
            }),
        )
        .init();

    info!("Starting postbox server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the database (runs migrations)
    // -----------------------------------------------------------------------
    let options = config.store_options();
    let db_path = config.db_path.clone();
    let db = tokio::task::spawn_blocking(move || Database::open_with(&db_path, &options))
        .await?
        .with_context(|| format!("opening {}", config.db_path.display()))?;

    reporter::report(&db, config.backlog_warn).context("initial backlog snapshot")?;
    let db = Arc::new(Mutex::new(db));

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------
    let reporter_task = tokio::spawn(reporter::run(
        db.clone(),
        config.report_interval,
        config.backlog_warn,
    ));

    // -----------------------------------------------------------------------
    // 5. Run until interrupted
    // -----------------------------------------------------------------------
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    reporter_task.abort();
    let _ = reporter_task.await;
    // The connection closes (and checkpoints the WAL) with its last handle.
    drop(db);

    info!("Postbox server stopped");
    Ok(())
}
