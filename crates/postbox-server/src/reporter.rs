//! Periodic backlog reporting.
//!
//! Key packages and undelivered messages are never expired by the store, so
//! the server logs their volume on a timer and warns when the mailbox grows
//! past the configured threshold.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use postbox_store::{BacklogStats, Database};
use tracing::{info, warn};

/// Take one snapshot and log it. Returns the snapshot for callers and tests.
pub fn report(db: &Database, backlog_warn: u64) -> postbox_store::Result<BacklogStats> {
    let stats = db.backlog_stats()?;

    info!(
        key_packages = stats.key_packages,
        messages = stats.messages,
        recipients = stats.recipients,
        oldest_message_at = ?stats.oldest_message_at,
        "backlog snapshot"
    );

    if exceeds(&stats, backlog_warn) {
        warn!(
            messages = stats.messages,
            threshold = backlog_warn,
            "undelivered message backlog above threshold"
        );
    }

    Ok(stats)
}

fn exceeds(stats: &BacklogStats, backlog_warn: u64) -> bool {
    backlog_warn > 0 && stats.messages > backlog_warn
}

/// Report every `interval`, starting one interval from now, until the task is
/// dropped.
///
/// SQLite calls are blocking, so each snapshot runs on the blocking pool.
pub async fn run(db: Arc<Mutex<Database>>, interval: Duration, backlog_warn: u64) {
    let start = tokio::time::Instant::now() + interval;
    let mut ticker = tokio::time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let db = db.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let db = db.lock().map_err(|_| "database mutex poisoned".to_string())?;
            report(&db, backlog_warn).map_err(|e| e.to_string())
        })
        .await;

        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "backlog snapshot failed"),
            Err(e) => warn!(error = %e, "backlog task panicked"),
        }
    }
}
