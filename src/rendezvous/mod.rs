//! Per-conversation rendezvous channels.
//!
//! A rendezvous channel hands one human answer from the inbound router
//! (producer) to a blocked checkpoint gate (consumer). Each conversation
//! has its own channel, named by [`channel_name`].
//!
//! Semantics shared by every backend:
//!
//! | Operation | Behaviour                                                  |
//! |-----------|------------------------------------------------------------|
//! | `ensure`  | Create the channel if missing.                             |
//! | `put`     | Non-blocking. Buffers one value; a second put overwrites.  |
//! |           | Fails with `NotFound` once the channel is gone.            |
//! | `get`     | Blocks until a value arrives or the timeout elapses.       |
//! | `delete`  | Idempotent; failures are logged, never returned.           |

pub mod memory;
pub mod sqlite;

use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::{AppError, Result};

pub use memory::MemoryRendezvous;
pub use sqlite::SqliteRendezvous;

/// Prefix shared by every rendezvous channel name.
pub const CHANNEL_PREFIX: &str = "agent-conv-";

/// Deterministic channel name for a conversation.
///
/// The prefix is constant, so distinct task ids always map to distinct names.
#[must_use]
pub fn channel_name(task_id: &str) -> String {
    format!("{CHANNEL_PREFIX}{task_id}")
}

fn no_channel(task_id: &str) -> AppError {
    AppError::NotFound(format!("no conversation is waiting on task {task_id}"))
}

/// Named single-slot hand-off between an answer producer and a blocked waiter.
pub trait Rendezvous: Send + Sync {
    /// Create the channel for `task_id` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Rendezvous` or `AppError::Db` on backend failure.
    fn ensure<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Buffer `value` for the next `get`, replacing any unconsumed value.
    ///
    /// Never creates the channel: an answer for a conversation that is not
    /// (or no longer) waiting has nowhere to go.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the channel does not exist, or
    /// `AppError::Rendezvous` / `AppError::Db` on backend failure.
    fn put<'a>(&'a self, task_id: &'a str, value: String) -> BoxFuture<'a, Result<()>>;

    /// Wait up to `timeout` for a value; `Ok(None)` means the wait timed out.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Rendezvous` or `AppError::Db` on backend failure.
    fn get<'a>(&'a self, task_id: &'a str, timeout: Duration)
        -> BoxFuture<'a, Result<Option<String>>>;

    /// Remove the channel and any unconsumed value. Never fails.
    fn delete<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, ()>;
}
