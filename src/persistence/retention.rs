//! Retention service for abandoned rendezvous channels.
//!
//! Orchestrators delete their own channel on exit. Channels left behind by
//! a process that died first are purged here once they are older than
//! `retention_hours`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::db::Database;
use crate::Result;

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Spawn the retention purge background task.
///
/// The task runs hourly until `cancel` fires.
#[must_use]
pub fn spawn_retention_task(
    db: Arc<Database>,
    retention_hours: u32,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("retention task shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(err) = purge(&db, retention_hours).await {
                        error!(?err, "retention purge failed");
                    }
                }
            }
        }
    })
}

/// Delete channels created more than `retention_hours` ago.
///
/// Returns the number of channels removed.
///
/// # Errors
///
/// Returns `AppError::Db` if a delete fails.
pub async fn purge(db: &Database, retention_hours: u32) -> Result<u64> {
    let cutoff = Utc::now() - chrono::Duration::hours(i64::from(retention_hours));
    let cutoff_str = cutoff.to_rfc3339();

    // Messages first, then their channels.
    sqlx::query(
        "DELETE FROM rendezvous_message WHERE channel IN \
         (SELECT name FROM rendezvous_channel WHERE created_at < ?1)",
    )
    .bind(&cutoff_str)
    .execute(db)
    .await?;

    let result = sqlx::query("DELETE FROM rendezvous_channel WHERE created_at < ?1")
        .bind(&cutoff_str)
        .execute(db)
        .await?;

    let purged = result.rows_affected();
    info!(retention_hours, purged, "retention purge completed");
    Ok(purged)
}
