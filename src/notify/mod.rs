//! Outbound lifecycle notifications.
//!
//! The [`EventSink`] trait decouples the orchestrator and checkpoint gate
//! from how events reach the external controller. [`WebhookNotifier`] is
//! the production implementation: signed JSON over HTTP POST.
//!
//! Delivery is fire-and-forget. A sink reports success as a `bool` and
//! never returns an error; a failed delivery is logged and the conversation
//! carries on.

pub mod signature;
pub mod webhook;

use futures_util::future::BoxFuture;

use crate::models::notification::NotificationEvent;

pub use webhook::WebhookNotifier;

/// Destination for lifecycle notifications.
pub trait EventSink: Send + Sync {
    /// Deliver `event` to `target`.
    ///
    /// Returns `true` only when the receiver acknowledged the event. Never
    /// retries.
    fn deliver<'a>(&'a self, target: &'a str, event: &'a NotificationEvent)
        -> BoxFuture<'a, bool>;
}
