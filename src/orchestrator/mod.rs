//! Conversation orchestration.
//!
//! [`ConversationOrchestrator`] drives one agent run from start to a
//! terminal outcome, translating agent events into lifecycle notifications
//! and delegating ask-human rounds to the configured checkpoint gate.
//! [`ActiveConversations`] tracks which task ids currently have a run in
//! this process.

pub mod conversation;
pub mod registry;

use std::path::PathBuf;
use std::time::Duration;

pub use conversation::{ConversationOrchestrator, ConversationRequest, DEFAULT_SUMMARY};
pub use registry::{ActiveClaim, ActiveConversations};

/// Immutable settings shared by every conversation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Bound on each human wait.
    pub idle_timeout: Duration,
    /// Ceiling on a whole run.
    pub hard_limit: Duration,
    /// Built-in tools the agent may use.
    pub allowed_tools: Vec<String>,
    /// Model identifier passed to the agent.
    pub model: String,
    /// Directory the agent works in.
    pub working_directory: PathBuf,
}
