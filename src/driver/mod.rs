//! Agent capability abstraction.
//!
//! The [`AgentCapability`] trait is the seam between the conversation
//! orchestrator and whatever actually runs the agent's reasoning and tool
//! loop. A capability is initialized once per run and yields an
//! [`AgentSession`]: a pull-based stream of [`AgentEvent`]s plus a way to
//! answer a suspended ask-human tool call.
//!
//! The ask-human tool is registered in the [`ToolSet`] handed to
//! `initialize`. When the agent calls it, the session yields
//! [`AgentEvent::AskHuman`] and does not produce further events until the
//! orchestrator calls [`AgentSession::answer`] with the checkpoint gate's
//! result.

pub mod codec;
pub mod process;

use std::path::PathBuf;

use futures_util::future::BoxFuture;
use serde::Serialize;

use crate::Result;

pub use process::{ProcessAgent, ProcessAgentConfig};

/// Name of the ask-human tool registered with the agent.
pub const ASK_HUMAN_TOOL: &str = "AskUser";

/// Description shown to the agent for the ask-human tool.
pub const ASK_HUMAN_DESCRIPTION: &str = "\
Ask the user for clarification when you need more information to proceed.
Use this when:
- The task is ambiguous and could be interpreted multiple ways
- You need to confirm a destructive or irreversible action
- You need specific information the user hasn't provided
- You want to present options for the user to choose from

Do NOT use this for:
- Routine progress updates
- Rhetorical questions
- Asking permission for every small step";

/// Built-in tools allowed when the configuration does not list any.
#[must_use]
pub fn default_allowed_tools() -> Vec<String> {
    ["Bash", "Read", "Write", "Edit", "Glob", "Grep"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Events emitted by an agent session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// Agent established its session.
    Init {
        /// Session identifier assigned by the agent.
        session_id: String,
    },
    /// Agent invoked a tool.
    ToolUse {
        /// Tool name.
        name: String,
    },
    /// Agent produced assistant text.
    Text {
        /// Text content.
        content: String,
    },
    /// Agent called the ask-human tool and is suspended until answered.
    AskHuman {
        /// Correlation id for the tool call.
        call_id: String,
        /// The question.
        question: String,
        /// Why the agent is asking.
        context: String,
        /// Suggested answers.
        options: Vec<String>,
    },
    /// Agent finished.
    Result {
        /// Whether the agent finished with an error.
        is_error: bool,
        /// Outcome text or error message.
        summary: String,
    },
}

/// A custom tool definition registered with the agent.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Description shown to the agent.
    pub description: String,
    /// JSON schema for the tool input.
    pub input_schema: serde_json::Value,
}

/// The ask-human tool definition.
#[must_use]
pub fn ask_human_tool() -> ToolDefinition {
    ToolDefinition {
        name: ASK_HUMAN_TOOL.to_owned(),
        description: ASK_HUMAN_DESCRIPTION.to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "question": { "type": "string", "description": "The question to ask the user" },
                "context": { "type": "string", "description": "Why you need this information" },
                "options": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional list of suggested answers"
                }
            },
            "required": ["question", "context"]
        }),
    }
}

/// Tools available to the agent for one run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolSet {
    /// Built-in tools the agent may use.
    pub allowed: Vec<String>,
    /// Custom tools handled by this server.
    pub custom: Vec<ToolDefinition>,
}

impl ToolSet {
    /// Allowed built-in tools plus the ask-human tool.
    #[must_use]
    pub fn with_ask_human(allowed: &[String]) -> Self {
        Self {
            allowed: allowed.to_vec(),
            custom: vec![ask_human_tool()],
        }
    }
}

/// Everything the capability needs to start (or resume) a session.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRequest {
    /// First input; already includes any rendered chat context.
    pub prompt: String,
    /// Tools the agent may use.
    pub tool_set: ToolSet,
    /// Directory the agent works in.
    pub working_directory: PathBuf,
    /// Model identifier.
    pub model: String,
    /// Session to resume instead of starting a new one.
    pub resume_session_id: Option<String>,
}

/// An initialized agent run.
pub trait AgentSession: Send {
    /// Next event; `Ok(None)` once the agent's stream has ended.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Agent` if the stream is malformed or broken.
    fn next_event(&mut self) -> BoxFuture<'_, Result<Option<AgentEvent>>>;

    /// Complete the suspended ask-human call `call_id` with `answer`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Agent` if the answer cannot be delivered.
    fn answer<'a>(&'a mut self, call_id: &'a str, answer: String) -> BoxFuture<'a, Result<()>>;
}

/// Something that can run an agent conversation.
pub trait AgentCapability: Send + Sync {
    /// Start (or resume) an agent session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Agent` if the agent cannot be started.
    fn initialize(&self, request: AgentRequest) -> BoxFuture<'_, Result<Box<dyn AgentSession>>>;
}
