//! Outbound lifecycle notification events.
//!
//! The serialized form is the signed wire body, so field order matters:
//! `type` first, then `taskId`, then payload fields in declaration order.

use serde::{Deserialize, Serialize};

/// Message sent with the status update emitted when a human answer arrives.
pub const RESUMING_MESSAGE: &str = "Resuming with user response";

/// Event type discriminator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Agent reported its session.
    SessionStarted,
    /// Progress message.
    StatusUpdate,
    /// Agent is waiting for a human answer.
    ClarificationNeeded,
    /// Conversation finished successfully.
    Completed,
    /// Conversation failed.
    Failed,
}

impl EventKind {
    /// Wire name of the event type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionStarted => "session_started",
            Self::StatusUpdate => "status_update",
            Self::ClarificationNeeded => "clarification_needed",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Result block carried by a `completed` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionSummary {
    /// Human-readable outcome.
    pub summary: String,
    /// Tools invoked during the conversation, in order.
    pub actions_taken: Vec<String>,
}

/// An immutable lifecycle notification for one conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// Agent session established.
    #[serde(rename_all = "camelCase")]
    SessionStarted {
        /// Conversation identifier.
        task_id: String,
        /// Agent session identifier.
        session_id: String,
    },
    /// Progress message, optionally naming the tool in use.
    #[serde(rename_all = "camelCase")]
    StatusUpdate {
        /// Conversation identifier.
        task_id: String,
        /// Human-readable status.
        message: String,
        /// Tool being used, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool: Option<String>,
    },
    /// Agent needs a human answer.
    #[serde(rename_all = "camelCase")]
    ClarificationNeeded {
        /// Conversation identifier.
        task_id: String,
        /// Agent session identifier.
        session_id: String,
        /// The question.
        question: String,
        /// Why the agent is asking.
        context: String,
        /// Suggested answers.
        options: Vec<String>,
    },
    /// Conversation finished successfully.
    #[serde(rename_all = "camelCase")]
    Completed {
        /// Conversation identifier.
        task_id: String,
        /// Agent session identifier.
        session_id: String,
        /// Outcome summary.
        result: CompletionSummary,
    },
    /// Conversation failed.
    #[serde(rename_all = "camelCase")]
    Failed {
        /// Conversation identifier.
        task_id: String,
        /// Failure description.
        error: String,
    },
}

impl NotificationEvent {
    /// Event type discriminator.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::SessionStarted { .. } => EventKind::SessionStarted,
            Self::StatusUpdate { .. } => EventKind::StatusUpdate,
            Self::ClarificationNeeded { .. } => EventKind::ClarificationNeeded,
            Self::Completed { .. } => EventKind::Completed,
            Self::Failed { .. } => EventKind::Failed,
        }
    }

    /// Conversation this event belongs to.
    #[must_use]
    pub fn task_id(&self) -> &str {
        match self {
            Self::SessionStarted { task_id, .. }
            | Self::StatusUpdate { task_id, .. }
            | Self::ClarificationNeeded { task_id, .. }
            | Self::Completed { task_id, .. }
            | Self::Failed { task_id, .. } => task_id,
        }
    }

    /// Agent session referenced by the event, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::SessionStarted { session_id, .. }
            | Self::ClarificationNeeded { session_id, .. }
            | Self::Completed { session_id, .. } => Some(session_id),
            Self::StatusUpdate { .. } | Self::Failed { .. } => None,
        }
    }

    /// Serialize to the exact compact JSON body that gets signed and sent.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_body(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Build a `status_update` announcing a tool invocation.
    #[must_use]
    pub fn tool_status(task_id: &str, tool: &str) -> Self {
        Self::StatusUpdate {
            task_id: task_id.to_owned(),
            message: format!("Using {tool}..."),
            tool: Some(tool.to_owned()),
        }
    }

    /// Build the `status_update` emitted when a human answer arrives.
    #[must_use]
    pub fn resuming(task_id: &str) -> Self {
        Self::StatusUpdate {
            task_id: task_id.to_owned(),
            message: RESUMING_MESSAGE.to_owned(),
            tool: None,
        }
    }
}
