//! Gate that keeps the agent suspended while it waits for the answer.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use tracing::{info, info_span, warn, Instrument};

use super::{clarification_event, CheckpointGate, GateContext, GateOutcome};
use crate::models::checkpoint::Checkpoint;
use crate::models::notification::NotificationEvent;
use crate::notify::EventSink;
use crate::rendezvous::Rendezvous;
use crate::{AppError, Result};

/// Waits on the conversation's rendezvous channel for the human answer.
pub struct BlockingGate {
    rendezvous: Arc<dyn Rendezvous>,
    sink: Arc<dyn EventSink>,
}

impl BlockingGate {
    /// Create a gate reading answers from `rendezvous`.
    #[must_use]
    pub fn new(rendezvous: Arc<dyn Rendezvous>, sink: Arc<dyn EventSink>) -> Self {
        Self { rendezvous, sink }
    }
}

impl CheckpointGate for BlockingGate {
    fn ask<'a>(
        &'a self,
        ctx: &'a GateContext,
        checkpoint: Checkpoint,
    ) -> BoxFuture<'a, Result<GateOutcome>> {
        let span = info_span!("checkpoint_wait", task_id = %ctx.task_id, session_id = %ctx.session_id);
        Box::pin(
            async move {
                let event = clarification_event(ctx, &checkpoint);
                if !self.sink.deliver(&ctx.notify_url, &event).await {
                    warn!("clarification notification not acknowledged; waiting anyway");
                }

                let deadline = checkpoint.deadline;
                let Some(answer) = self.rendezvous.get(&ctx.task_id, deadline).await? else {
                    info!(timeout_seconds = deadline.as_secs(), "checkpoint timed out");
                    return Err(AppError::IdleTimeout(deadline));
                };

                info!("human answer received");
                self.sink
                    .deliver(&ctx.notify_url, &NotificationEvent::resuming(&ctx.task_id))
                    .await;
                Ok(GateOutcome::Answer(answer))
            }
            .instrument(span),
        )
    }
}
