//! Conversation model and lifecycle helpers.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Lifecycle state of a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Agent capability started, session not yet reported.
    Init,
    /// Agent is working.
    Running,
    /// Agent is suspended on an ask-human round.
    AwaitingInput,
    /// Agent finished successfully. Terminal.
    Completed,
    /// Conversation failed. Terminal.
    Failed,
}

impl ConversationState {
    /// Whether the state is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Final status reported by a conversation run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// Agent produced a successful result.
    Completed,
    /// Agent failed, timed out, or violated the protocol.
    Failed,
    /// Run ended while waiting for a human (respawn strategy).
    AwaitingInput,
    /// Agent stream ended without a terminal result.
    Unknown,
}

/// Structured outcome of one orchestrator run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationResult {
    /// Conversation identifier.
    pub task_id: String,
    /// Agent session, if one was ever reported.
    pub session_id: Option<String>,
    /// Final status.
    pub status: ConversationStatus,
    /// Completion summary or failure message.
    pub detail: String,
}

/// Speaker of a prior chat turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The human side.
    User,
    /// The agent side.
    Assistant,
}

impl ChatRole {
    fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// One prior turn supplied with a new conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    /// Who spoke.
    pub role: ChatRole,
    /// What was said.
    pub content: String,
}

/// Render the agent's first input from the prompt and optional prior turns.
///
/// Without chat context the prompt is returned unchanged.
#[must_use]
pub fn render_initial_prompt(prompt: &str, chat_context: Option<&[ChatTurn]>) -> String {
    let Some(turns) = chat_context.filter(|turns| !turns.is_empty()) else {
        return prompt.to_owned();
    };

    let mut rendered = String::from("Previous conversation:\n");
    for turn in turns {
        let _ = writeln!(rendered, "{}: {}", turn.role.label(), turn.content);
    }
    let _ = write!(rendered, "\nCurrent request:\n{prompt}");
    rendered
}

/// Per-run conversation state owned by a single orchestrator.
#[derive(Debug, Clone)]
pub struct Conversation {
    task_id: String,
    notify_url: String,
    session_id: Option<String>,
    state: ConversationState,
    actions_taken: Vec<String>,
    chat_context: Option<Vec<ChatTurn>>,
    last_text: Option<String>,
    resumed: bool,
    started_at: DateTime<Utc>,
}

impl Conversation {
    /// Start a fresh conversation in `Init`.
    #[must_use]
    pub fn new(task_id: String, notify_url: String, chat_context: Option<Vec<ChatTurn>>) -> Self {
        Self {
            task_id,
            notify_url,
            session_id: None,
            state: ConversationState::Init,
            actions_taken: Vec::new(),
            chat_context,
            last_text: None,
            resumed: false,
            started_at: Utc::now(),
        }
    }

    /// Continue an existing agent session; starts in `Running` with the
    /// session already known.
    #[must_use]
    pub fn resumed(task_id: String, notify_url: String, session_id: String) -> Self {
        Self {
            session_id: Some(session_id),
            state: ConversationState::Running,
            resumed: true,
            ..Self::new(task_id, notify_url, None)
        }
    }

    /// Conversation identifier.
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Where lifecycle notifications are delivered.
    #[must_use]
    pub fn notify_url(&self) -> &str {
        &self.notify_url
    }

    /// Agent session, once reported.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConversationState {
        self.state
    }

    /// Tool invocations so far, in order.
    #[must_use]
    pub fn actions_taken(&self) -> &[String] {
        &self.actions_taken
    }

    /// Prior turns supplied at start.
    #[must_use]
    pub fn chat_context(&self) -> Option<&[ChatTurn]> {
        self.chat_context.as_deref()
    }

    /// Most recent assistant text.
    #[must_use]
    pub fn last_text(&self) -> Option<&str> {
        self.last_text.as_deref()
    }

    /// Whether this run continues a previously suspended session.
    #[must_use]
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    /// When the run started.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Record the session reported by the agent.
    ///
    /// Returns `true` only the first time a session is captured. Later
    /// reports never replace the captured id.
    pub fn capture_session(&mut self, session_id: &str) -> bool {
        if self.session_id.is_some() {
            return false;
        }
        self.session_id = Some(session_id.to_owned());
        true
    }

    /// Append a tool invocation to the action log.
    pub fn record_action(&mut self, tool: &str) {
        self.actions_taken.push(tool.to_owned());
    }

    /// Remember the latest assistant text.
    pub fn set_last_text(&mut self, text: String) {
        self.last_text = Some(text);
    }

    /// Determine whether a lifecycle transition is permitted.
    #[must_use]
    pub fn can_transition_to(&self, next: ConversationState) -> bool {
        matches!(
            (self.state, next),
            (
                ConversationState::Init,
                ConversationState::Running | ConversationState::Failed
            ) | (
                ConversationState::Running,
                ConversationState::AwaitingInput
                    | ConversationState::Completed
                    | ConversationState::Failed
            ) | (
                ConversationState::AwaitingInput,
                ConversationState::Running | ConversationState::Failed
            )
        ) || (self.state == next && next == ConversationState::Running)
    }

    /// Move to `next`, enforcing the state machine.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Agent` if the transition is not permitted, which
    /// means the agent emitted events out of protocol order.
    pub fn transition_to(&mut self, next: ConversationState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(AppError::Agent(format!(
                "invalid conversation transition {:?} -> {next:?}",
                self.state
            )));
        }
        self.state = next;
        Ok(())
    }

    /// Force the terminal failed state; valid from any state.
    pub fn mark_failed(&mut self) {
        self.state = ConversationState::Failed;
    }
}
