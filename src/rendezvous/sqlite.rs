//! Durable rendezvous backend on `SQLite`.
//!
//! Lets the process that receives a human reply differ from the process
//! running the conversation, as long as both point at the same database
//! file. Readers poll; consumption is a single `DELETE … RETURNING` so a
//! value is handed to exactly one reader.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::BoxFuture;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{channel_name, no_channel, Rendezvous};
use crate::persistence::db::Database;
use crate::Result;

/// Rendezvous channels stored in `SQLite`.
#[derive(Clone)]
pub struct SqliteRendezvous {
    db: Arc<Database>,
    poll_interval: Duration,
}

impl SqliteRendezvous {
    /// Create a backend over an initialized pool.
    #[must_use]
    pub fn new(db: Arc<Database>, poll_interval: Duration) -> Self {
        Self { db, poll_interval }
    }

    /// Whether a channel row exists for `task_id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn contains(&self, task_id: &str) -> Result<bool> {
        let found: Option<String> =
            sqlx::query_scalar("SELECT name FROM rendezvous_channel WHERE name = ?1")
                .bind(channel_name(task_id))
                .fetch_optional(self.db.as_ref())
                .await?;
        Ok(found.is_some())
    }

    async fn create_if_missing(&self, name: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO rendezvous_channel (name, created_at) VALUES (?1, ?2)")
            .bind(name)
            .bind(Utc::now().to_rfc3339())
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn take(&self, name: &str) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("DELETE FROM rendezvous_message WHERE channel = ?1 RETURNING value")
                .bind(name)
                .fetch_optional(self.db.as_ref())
                .await?;
        Ok(value)
    }

    async fn remove(&self, name: &str) -> Result<()> {
        sqlx::query("DELETE FROM rendezvous_message WHERE channel = ?1")
            .bind(name)
            .execute(self.db.as_ref())
            .await?;
        sqlx::query("DELETE FROM rendezvous_channel WHERE name = ?1")
            .bind(name)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }
}

impl Rendezvous for SqliteRendezvous {
    fn ensure<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.create_if_missing(&channel_name(task_id)).await })
    }

    fn put<'a>(&'a self, task_id: &'a str, value: String) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let name = channel_name(task_id);
            // Only lands while the channel row exists, so a late reply
            // cannot leave an orphan behind a deleted channel.
            let stored = sqlx::query(
                "INSERT INTO rendezvous_message (channel, value, created_at)
                 SELECT ?1, ?2, ?3 WHERE EXISTS (SELECT 1 FROM rendezvous_channel WHERE name = ?1)
                 ON CONFLICT(channel) DO UPDATE SET value = excluded.value, created_at = excluded.created_at",
            )
            .bind(&name)
            .bind(value)
            .bind(Utc::now().to_rfc3339())
            .execute(self.db.as_ref())
            .await?;
            if stored.rows_affected() == 0 {
                return Err(no_channel(task_id));
            }
            debug!(task_id, "answer stored in rendezvous channel");
            Ok(())
        })
    }

    fn get<'a>(
        &'a self,
        task_id: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let name = channel_name(task_id);
            let deadline = Instant::now() + timeout;
            loop {
                if let Some(value) = self.take(&name).await? {
                    return Ok(Some(value));
                }
                let now = Instant::now();
                if now >= deadline {
                    return Ok(None);
                }
                tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
            }
        })
    }

    fn delete<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if let Err(err) = self.remove(&channel_name(task_id)).await {
                warn!(task_id, %err, "failed to delete rendezvous channel");
            }
        })
    }
}
