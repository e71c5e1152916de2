//! Gate that ends the run and lets a later reply resume the session.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use tracing::info;

use super::{clarification_event, CheckpointGate, GateContext, GateOutcome};
use crate::models::checkpoint::Checkpoint;
use crate::notify::EventSink;
use crate::Result;

/// Announces the question, then suspends the run.
pub struct RespawnGate {
    sink: Arc<dyn EventSink>,
}

impl RespawnGate {
    /// Create a gate notifying through `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }
}

impl CheckpointGate for RespawnGate {
    fn ask<'a>(
        &'a self,
        ctx: &'a GateContext,
        checkpoint: Checkpoint,
    ) -> BoxFuture<'a, Result<GateOutcome>> {
        Box::pin(async move {
            self.sink
                .deliver(&ctx.notify_url, &clarification_event(ctx, &checkpoint))
                .await;
            info!(task_id = %ctx.task_id, session_id = %ctx.session_id, "run suspended for human input");
            Ok(GateOutcome::Suspended)
        })
    }

    fn suspends_run(&self) -> bool {
        true
    }
}
