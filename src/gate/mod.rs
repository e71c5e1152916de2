//! Checkpoint gate: the human-in-the-loop half of an ask-human round.
//!
//! When the agent calls the ask-human tool the orchestrator hands the
//! question to a [`CheckpointGate`]. The gate announces it with a
//! `clarification_needed` notification and then either waits for the
//! answer in-process ([`BlockingGate`]) or tells the orchestrator to end
//! the run so a later reply can resume it ([`RespawnGate`]).

pub mod blocking;
pub mod respawn;

use futures_util::future::BoxFuture;

use crate::models::checkpoint::Checkpoint;
use crate::models::notification::NotificationEvent;
use crate::Result;

pub use blocking::BlockingGate;
pub use respawn::RespawnGate;

/// Conversation details a gate needs for one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateContext {
    /// Conversation identifier; also names the rendezvous channel.
    pub task_id: String,
    /// Agent session; always known by the time the agent asks.
    pub session_id: String,
    /// Where notifications go.
    pub notify_url: String,
}

/// How an ask-human round resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The human answered; feed this back to the agent.
    Answer(String),
    /// The run should end in `awaiting_input`; a later reply resumes it.
    Suspended,
}

/// Converts an agent question into a human answer.
pub trait CheckpointGate: Send + Sync {
    /// Run one ask-human round.
    ///
    /// # Errors
    ///
    /// Returns `AppError::IdleTimeout` if no answer arrives within
    /// `checkpoint.deadline`, or a rendezvous error from the backend.
    fn ask<'a>(
        &'a self,
        ctx: &'a GateContext,
        checkpoint: Checkpoint,
    ) -> BoxFuture<'a, Result<GateOutcome>>;

    /// Whether every round ends the run in [`GateOutcome::Suspended`].
    ///
    /// Such gates are asked only after the agent session has been torn
    /// down and the task id released, so the human's reply may arrive as
    /// soon as the question is delivered.
    fn suspends_run(&self) -> bool {
        false
    }
}

/// Build the `clarification_needed` event for `checkpoint`.
#[must_use]
pub fn clarification_event(ctx: &GateContext, checkpoint: &Checkpoint) -> NotificationEvent {
    NotificationEvent::ClarificationNeeded {
        task_id: ctx.task_id.clone(),
        session_id: ctx.session_id.clone(),
        question: checkpoint.question.clone(),
        context: checkpoint.context.clone(),
        options: checkpoint.options.clone(),
    }
}
