//! In-process rendezvous backend.
//!
//! Each channel is a slot holding at most one value plus a [`Notify`] used
//! to wake the blocked reader. `Notify::notify_one` stores a permit when no
//! reader is waiting, so a put that lands before the reader starts waiting
//! is never missed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{channel_name, no_channel, Rendezvous};
use crate::Result;

#[derive(Default)]
struct Slot {
    value: Mutex<Option<String>>,
    ready: Notify,
}

/// Rendezvous channels held in process memory.
#[derive(Clone, Default)]
pub struct MemoryRendezvous {
    channels: Arc<Mutex<HashMap<String, Arc<Slot>>>>,
}

impl MemoryRendezvous {
    /// Create an empty channel set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a channel currently exists for `task_id`.
    pub async fn contains(&self, task_id: &str) -> bool {
        self.channels.lock().await.contains_key(&channel_name(task_id))
    }

    async fn slot(&self, task_id: &str) -> Arc<Slot> {
        let mut channels = self.channels.lock().await;
        Arc::clone(channels.entry(channel_name(task_id)).or_default())
    }
}

impl Rendezvous for MemoryRendezvous {
    fn ensure<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let _ = self.slot(task_id).await;
            Ok(())
        })
    }

    fn put<'a>(&'a self, task_id: &'a str, value: String) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let slot = self
                .channels
                .lock()
                .await
                .get(&channel_name(task_id))
                .map(Arc::clone)
                .ok_or_else(|| no_channel(task_id))?;
            let replaced = slot.value.lock().await.replace(value);
            if replaced.is_some() {
                warn!(task_id, "unconsumed answer replaced by a newer one");
            }
            slot.ready.notify_one();
            Ok(())
        })
    }

    fn get<'a>(
        &'a self,
        task_id: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let deadline = Instant::now() + timeout;
            let slot = self.slot(task_id).await;
            loop {
                if let Some(value) = slot.value.lock().await.take() {
                    return Ok(Some(value));
                }
                // A stale permit only costs one extra pass through the loop.
                if tokio::time::timeout_at(deadline, slot.ready.notified())
                    .await
                    .is_err()
                {
                    // A put may have raced the deadline.
                    return Ok(slot.value.lock().await.take());
                }
            }
        })
    }

    fn delete<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let removed = self.channels.lock().await.remove(&channel_name(task_id));
            debug!(task_id, existed = removed.is_some(), "rendezvous channel deleted");
        })
    }
}
