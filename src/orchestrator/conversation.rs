//! Single-run conversation driver.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use super::registry::ActiveClaim;
use super::OrchestratorConfig;
use crate::driver::{AgentCapability, AgentEvent, AgentRequest, AgentSession, ToolSet};
use crate::gate::{CheckpointGate, GateContext, GateOutcome};
use crate::models::checkpoint::Checkpoint;
use crate::models::conversation::{
    render_initial_prompt, ChatTurn, Conversation, ConversationResult, ConversationState,
    ConversationStatus,
};
use crate::models::notification::{CompletionSummary, NotificationEvent};
use crate::notify::EventSink;
use crate::rendezvous::Rendezvous;
use crate::{AppError, Result};

/// Summary reported when neither the result nor the agent's text has one.
pub const DEFAULT_SUMMARY: &str = "Task completed successfully";

/// Input for one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRequest {
    /// Conversation identifier.
    pub task_id: String,
    /// The task, or the human answer when resuming.
    pub prompt: String,
    /// Where lifecycle notifications go.
    pub notify_url: String,
    /// Prior turns rendered ahead of the prompt on a fresh start.
    pub chat_context: Option<Vec<ChatTurn>>,
    /// Agent session to resume instead of starting a new one.
    pub resume_session_id: Option<String>,
}

/// How `drive` stopped without an error.
enum RunOutcome {
    Completed(String),
    /// The gate suspends runs; the question is announced once the agent
    /// session has been torn down.
    Suspending {
        ctx: GateContext,
        checkpoint: Checkpoint,
    },
    Suspended,
    StreamEnded,
}

/// Drives one agent run to a terminal outcome.
pub struct ConversationOrchestrator {
    config: Arc<OrchestratorConfig>,
    agent: Arc<dyn AgentCapability>,
    gate: Arc<dyn CheckpointGate>,
    rendezvous: Arc<dyn Rendezvous>,
    sink: Arc<dyn EventSink>,
    shutdown: CancellationToken,
}

impl ConversationOrchestrator {
    /// Assemble an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        config: Arc<OrchestratorConfig>,
        agent: Arc<dyn AgentCapability>,
        gate: Arc<dyn CheckpointGate>,
        rendezvous: Arc<dyn Rendezvous>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            agent,
            gate,
            rendezvous,
            sink,
            shutdown: CancellationToken::new(),
        }
    }

    /// Fail in-flight runs when `shutdown` is cancelled.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Immutable run settings.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one conversation to completion.
    ///
    /// Never returns an error: every failure is reported through a `failed`
    /// notification and a [`ConversationStatus::Failed`] result. The
    /// conversation's rendezvous channel is released on every exit path.
    pub async fn run(&self, request: ConversationRequest) -> ConversationResult {
        self.run_inner(request, None).await
    }

    /// [`run`](Self::run) holding `claim` on the task id.
    ///
    /// The claim is dropped when the run ends, or as soon as the agent
    /// session is torn down for a suspending gate, so a reply to the
    /// clarification can start the resumed run straight away.
    pub async fn run_claimed(
        &self,
        request: ConversationRequest,
        claim: ActiveClaim,
    ) -> ConversationResult {
        self.run_inner(request, Some(claim)).await
    }

    async fn run_inner(
        &self,
        request: ConversationRequest,
        mut claim: Option<ActiveClaim>,
    ) -> ConversationResult {
        let span = info_span!(
            "conversation",
            task_id = %request.task_id,
            resumed = request.resume_session_id.is_some()
        );
        async move {
            let ConversationRequest {
                task_id,
                prompt,
                notify_url,
                chat_context,
                resume_session_id,
            } = request;

            let mut conversation = match resume_session_id {
                Some(session_id) => Conversation::resumed(task_id, notify_url, session_id),
                None => Conversation::new(task_id, notify_url, chat_context),
            };
            let mut guard = Some(ChannelGuard::new(
                Arc::clone(&self.rendezvous),
                conversation.task_id(),
            ));

            info!("conversation started");
            let ensured = self.rendezvous.ensure(conversation.task_id()).await;
            let outcome = match ensured {
                Ok(()) => self.drive_bounded(&mut conversation, &prompt).await,
                Err(err) => Err(err),
            };

            let outcome = match outcome {
                Ok(RunOutcome::Suspending { ctx, checkpoint }) => {
                    if let Some(guard) = guard.take() {
                        guard.release().await;
                    }
                    drop(claim.take());
                    self.gate
                        .ask(&ctx, checkpoint)
                        .await
                        .map(|_| RunOutcome::Suspended)
                }
                other => other,
            };

            let result = self.finish(&mut conversation, outcome).await;
            if let Some(guard) = guard {
                guard.release().await;
            }
            drop(claim);
            info!(status = ?result.status, "conversation finished");
            result
        }
        .instrument(span)
        .await
    }

    async fn drive_bounded(
        &self,
        conversation: &mut Conversation,
        prompt: &str,
    ) -> Result<RunOutcome> {
        let hard_limit = self.config.hard_limit;
        tokio::select! {
            () = self.shutdown.cancelled() => Err(AppError::Shutdown),
            outcome = tokio::time::timeout(hard_limit, self.drive(conversation, prompt)) => {
                outcome.unwrap_or(Err(AppError::HardLimit(hard_limit)))
            }
        }
    }

    async fn drive(&self, conversation: &mut Conversation, prompt: &str) -> Result<RunOutcome> {
        let mut session = self.agent.initialize(self.agent_request(conversation, prompt)).await?;

        while let Some(event) = session.next_event().await? {
            match event {
                AgentEvent::Init { session_id } => self.on_init(conversation, &session_id).await?,
                AgentEvent::ToolUse { name } => {
                    conversation.record_action(&name);
                    self.emit(
                        conversation,
                        &NotificationEvent::tool_status(conversation.task_id(), &name),
                    )
                    .await;
                }
                AgentEvent::Text { content } => conversation.set_last_text(content),
                AgentEvent::AskHuman {
                    call_id,
                    question,
                    context,
                    options,
                } => {
                    let checkpoint =
                        Checkpoint::new(question, context, options, self.config.idle_timeout);
                    if self.gate.suspends_run() {
                        let ctx = Self::enter_checkpoint(conversation)?;
                        return Ok(RunOutcome::Suspending { ctx, checkpoint });
                    }
                    let answered = self
                        .on_ask_human(conversation, session.as_mut(), &call_id, checkpoint)
                        .await?;
                    if !answered {
                        return Ok(RunOutcome::Suspended);
                    }
                }
                AgentEvent::Result { is_error, summary } => {
                    if is_error {
                        return Err(AppError::Agent(summary));
                    }
                    if conversation.session_id().is_none() {
                        return Err(AppError::SessionNotInitialized);
                    }
                    conversation.transition_to(ConversationState::Completed)?;
                    return Ok(RunOutcome::Completed(summary));
                }
            }
        }

        warn!("agent stream ended without a result");
        Ok(RunOutcome::StreamEnded)
    }

    fn agent_request(&self, conversation: &Conversation, prompt: &str) -> AgentRequest {
        let prompt = if conversation.is_resumed() {
            prompt.to_owned()
        } else {
            render_initial_prompt(prompt, conversation.chat_context())
        };
        AgentRequest {
            prompt,
            tool_set: ToolSet::with_ask_human(&self.config.allowed_tools),
            working_directory: self.config.working_directory.clone(),
            model: self.config.model.clone(),
            resume_session_id: conversation
                .is_resumed()
                .then(|| conversation.session_id().map(str::to_owned))
                .flatten(),
        }
    }

    async fn on_init(&self, conversation: &mut Conversation, session_id: &str) -> Result<()> {
        if !conversation.capture_session(session_id) {
            if conversation.session_id() != Some(session_id) {
                warn!(
                    reported = session_id,
                    captured = ?conversation.session_id(),
                    "agent reported a different session id; ignoring"
                );
            }
            return Ok(());
        }

        conversation.transition_to(ConversationState::Running)?;
        info!(session_id, "agent session captured");
        let event = NotificationEvent::SessionStarted {
            task_id: conversation.task_id().to_owned(),
            session_id: session_id.to_owned(),
        };
        self.emit(conversation, &event).await;
        Ok(())
    }

    /// Returns `false` when the gate suspended the run.
    async fn on_ask_human(
        &self,
        conversation: &mut Conversation,
        session: &mut dyn AgentSession,
        call_id: &str,
        checkpoint: Checkpoint,
    ) -> Result<bool> {
        let ctx = Self::enter_checkpoint(conversation)?;
        match self.gate.ask(&ctx, checkpoint).await? {
            GateOutcome::Answer(answer) => {
                conversation.transition_to(ConversationState::Running)?;
                session.answer(call_id, answer).await?;
                Ok(true)
            }
            GateOutcome::Suspended => Ok(false),
        }
    }

    fn enter_checkpoint(conversation: &mut Conversation) -> Result<GateContext> {
        let Some(session_id) = conversation.session_id().map(str::to_owned) else {
            return Err(AppError::SessionNotInitialized);
        };
        conversation.transition_to(ConversationState::AwaitingInput)?;
        Ok(GateContext {
            task_id: conversation.task_id().to_owned(),
            session_id,
            notify_url: conversation.notify_url().to_owned(),
        })
    }

    async fn finish(
        &self,
        conversation: &mut Conversation,
        outcome: Result<RunOutcome>,
    ) -> ConversationResult {
        let session_id = conversation.session_id().map(str::to_owned);
        let task_id = conversation.task_id().to_owned();

        match outcome {
            Ok(RunOutcome::Completed(summary)) => {
                let summary = Some(summary)
                    .filter(|s| !s.trim().is_empty())
                    .or_else(|| {
                        conversation
                            .last_text()
                            .filter(|s| !s.trim().is_empty())
                            .map(str::to_owned)
                    })
                    .unwrap_or_else(|| DEFAULT_SUMMARY.to_owned());
                let event = NotificationEvent::Completed {
                    task_id: task_id.clone(),
                    session_id: session_id.clone().unwrap_or_default(),
                    result: CompletionSummary {
                        summary: summary.clone(),
                        actions_taken: conversation.actions_taken().to_vec(),
                    },
                };
                self.emit(conversation, &event).await;
                ConversationResult {
                    task_id,
                    session_id,
                    status: ConversationStatus::Completed,
                    detail: summary,
                }
            }
            Ok(RunOutcome::Suspended | RunOutcome::Suspending { .. }) => ConversationResult {
                task_id,
                session_id,
                status: ConversationStatus::AwaitingInput,
                detail: "waiting for human input".to_owned(),
            },
            Ok(RunOutcome::StreamEnded) => ConversationResult {
                task_id,
                session_id,
                status: ConversationStatus::Unknown,
                detail: "agent stream ended without a result".to_owned(),
            },
            Err(err) => {
                conversation.mark_failed();
                let message = err.failure_message();
                warn!(error = %err, "conversation failed");
                let event = NotificationEvent::Failed {
                    task_id: task_id.clone(),
                    error: message.clone(),
                };
                self.emit(conversation, &event).await;
                ConversationResult {
                    task_id,
                    session_id,
                    status: ConversationStatus::Failed,
                    detail: message,
                }
            }
        }
    }

    async fn emit(&self, conversation: &Conversation, event: &NotificationEvent) {
        if !self.sink.deliver(conversation.notify_url(), event).await {
            warn!(kind = event.kind().as_str(), "notification not delivered");
        }
    }
}

/// Deletes the conversation's rendezvous channel when the run ends.
///
/// Normal exits call [`ChannelGuard::release`]. If the run future is
/// dropped or unwinds first, `Drop` schedules the delete on the runtime.
struct ChannelGuard {
    rendezvous: Arc<dyn Rendezvous>,
    task_id: String,
    released: bool,
}

impl ChannelGuard {
    fn new(rendezvous: Arc<dyn Rendezvous>, task_id: &str) -> Self {
        Self {
            rendezvous,
            task_id: task_id.to_owned(),
            released: false,
        }
    }

    async fn release(mut self) {
        self.released = true;
        self.rendezvous.delete(&self.task_id).await;
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            warn!(task_id = %self.task_id, "no runtime to release rendezvous channel");
            return;
        };
        let rendezvous = Arc::clone(&self.rendezvous);
        let task_id = std::mem::take(&mut self.task_id);
        handle.spawn(async move {
            rendezvous.delete(&task_id).await;
        });
    }
}
