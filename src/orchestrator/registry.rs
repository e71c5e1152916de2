//! In-process registry of running conversations.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Task ids with a conversation currently running in this process.
///
/// A rendezvous channel has a single consumer, so the router refuses to
/// start a second run for a task id that is still claimed.
#[derive(Debug, Clone, Default)]
pub struct ActiveConversations {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl ActiveConversations {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `task_id`; `None` if it is already running.
    ///
    /// The claim is released when the returned guard is dropped.
    #[must_use]
    pub fn claim(&self, task_id: &str) -> Option<ActiveClaim> {
        let inserted = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task_id.to_owned());
        inserted.then(|| ActiveClaim {
            inner: Arc::clone(&self.inner),
            task_id: task_id.to_owned(),
        })
    }

    /// Whether `task_id` is currently claimed.
    #[must_use]
    pub fn contains(&self, task_id: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(task_id)
    }

    /// Number of running conversations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no conversation is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Guard for a claimed task id.
#[derive(Debug)]
pub struct ActiveClaim {
    inner: Arc<Mutex<HashSet<String>>>,
    task_id: String,
}

impl ActiveClaim {
    /// The claimed task id.
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }
}

impl Drop for ActiveClaim {
    fn drop(&mut self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.task_id);
    }
}
