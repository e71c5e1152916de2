//! Start-vs-reply dispatch for inbound conversation requests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::models::conversation::ChatTurn;
use crate::orchestrator::{ActiveClaim, ActiveConversations, ConversationOrchestrator, ConversationRequest};
use crate::rendezvous::Rendezvous;
use crate::strategy::CheckpointStrategy;
use crate::{AppError, Result};

/// Body of `POST /conversations`.
///
/// All fields are optional at the wire level so missing ones are reported
/// as a `400` instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundRequest {
    /// Conversation identifier.
    #[serde(default)]
    pub task_id: Option<String>,
    /// Task text, or the human answer on a reply.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Where notifications go.
    #[serde(default, alias = "webhook_url")]
    pub notify_url: Option<String>,
    /// Prior turns for a new conversation.
    #[serde(default)]
    pub chat_context: Option<Vec<ChatTurn>>,
    /// Present and non-empty on a human reply.
    #[serde(default)]
    pub resume_session_id: Option<String>,
}

/// What the router did with an accepted request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteAction {
    /// The answer was handed to the waiting conversation.
    ResponseQueued,
    /// A conversation run was started.
    ContainerSpawned,
}

/// Response body for an accepted request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteAccepted {
    /// Always `"accepted"`.
    pub status: String,
    /// Conversation identifier.
    pub task_id: String,
    /// What was done.
    pub action: RouteAction,
}

impl RouteAccepted {
    fn new(task_id: String, action: RouteAction) -> Self {
        Self {
            status: "accepted".to_owned(),
            task_id,
            action,
        }
    }
}

/// Validated inbound request.
struct Validated {
    task_id: String,
    prompt: String,
    notify_url: String,
    chat_context: Option<Vec<ChatTurn>>,
    resume_session_id: Option<String>,
}

/// Dispatches inbound requests to new runs or waiting conversations.
pub struct InboundRouter {
    strategy: CheckpointStrategy,
    rendezvous: Arc<dyn Rendezvous>,
    orchestrator: Arc<ConversationOrchestrator>,
    active: ActiveConversations,
    runs: TaskTracker,
}

impl InboundRouter {
    /// Create a router.
    #[must_use]
    pub fn new(
        strategy: CheckpointStrategy,
        rendezvous: Arc<dyn Rendezvous>,
        orchestrator: Arc<ConversationOrchestrator>,
        active: ActiveConversations,
    ) -> Self {
        Self {
            strategy,
            rendezvous,
            orchestrator,
            active,
            runs: TaskTracker::new(),
        }
    }

    /// Conversations currently running in this process.
    #[must_use]
    pub fn active(&self) -> &ActiveConversations {
        &self.active
    }

    /// Tracker for spawned conversation runs; close and wait on it to drain.
    #[must_use]
    pub fn runs(&self) -> &TaskTracker {
        &self.runs
    }

    /// Route one inbound request.
    ///
    /// # Errors
    ///
    /// - `AppError::BadRequest` if a required field is missing or the
    ///   notify URL is not http(s). Nothing has happened yet.
    /// - `AppError::Conflict` if a run for the task id is still active.
    /// - `AppError::NotFound` if a blocking reply names a task with no
    ///   open rendezvous channel.
    /// - Rendezvous errors from the backend.
    pub async fn handle(&self, request: InboundRequest) -> Result<RouteAccepted> {
        let request = validate(request)?;
        match request.resume_session_id.clone() {
            Some(session_id) => self.reply(request, session_id).await,
            None => self.start(request).await,
        }
    }

    async fn start(&self, request: Validated) -> Result<RouteAccepted> {
        let claim = self.claim(&request.task_id)?;
        self.rendezvous.ensure(&request.task_id).await?;

        let task_id = request.task_id.clone();
        info!(task_id, "starting conversation");
        self.spawn_run(
            claim,
            ConversationRequest {
                task_id: request.task_id,
                prompt: request.prompt,
                notify_url: request.notify_url,
                chat_context: request.chat_context,
                resume_session_id: None,
            },
        );
        Ok(RouteAccepted::new(task_id, RouteAction::ContainerSpawned))
    }

    async fn reply(&self, request: Validated, session_id: String) -> Result<RouteAccepted> {
        let task_id = request.task_id.clone();
        match self.strategy {
            CheckpointStrategy::Blocking => {
                if let Err(err) = self.rendezvous.put(&task_id, request.prompt).await {
                    warn!(task_id, %err, "human answer not queued");
                    return Err(err);
                }
                info!(task_id, session_id, "human answer queued");
                Ok(RouteAccepted::new(task_id, RouteAction::ResponseQueued))
            }
            CheckpointStrategy::Respawn => {
                let claim = self.claim(&task_id)?;
                info!(task_id, session_id, "resuming conversation with human answer");
                self.spawn_run(
                    claim,
                    ConversationRequest {
                        task_id: request.task_id,
                        prompt: request.prompt,
                        notify_url: request.notify_url,
                        chat_context: None,
                        resume_session_id: Some(session_id),
                    },
                );
                Ok(RouteAccepted::new(task_id, RouteAction::ContainerSpawned))
            }
        }
    }

    fn claim(&self, task_id: &str) -> Result<ActiveClaim> {
        self.active.claim(task_id).ok_or_else(|| {
            AppError::Conflict(format!("conversation {task_id} is already running"))
        })
    }

    fn spawn_run(&self, claim: ActiveClaim, request: ConversationRequest) {
        let orchestrator = Arc::clone(&self.orchestrator);
        self.runs
            .spawn(async move { orchestrator.run_claimed(request, claim).await });
    }
}

fn validate(request: InboundRequest) -> Result<Validated> {
    let task_id = required(request.task_id, "task_id")?;
    let prompt = required(request.prompt, "prompt")?;
    let notify_url = required(request.notify_url, "notify_url")?;

    let parsed = reqwest::Url::parse(&notify_url)
        .map_err(|err| AppError::BadRequest(format!("invalid notify_url: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::BadRequest(format!(
            "notify_url must be http or https, got {}",
            parsed.scheme()
        )));
    }

    Ok(Validated {
        task_id,
        prompt,
        notify_url,
        chat_context: request.chat_context,
        resume_session_id: request
            .resume_session_id
            .filter(|id| !id.trim().is_empty()),
    })
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("missing required field: {field}")))
}
