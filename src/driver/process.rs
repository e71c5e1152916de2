//! Agent capability backed by a headless agent process.
//!
//! The process is launched per run with a cleared environment and speaks
//! NDJSON over stdio:
//!
//! - outbound `{"method":"session/start","params":{...}}` once, then
//!   `{"method":"tool/result","id":...,"params":{"content":...}}` for each
//!   answered ask-human call;
//! - inbound messages carry a `type` of `init`, `tool_use`, `text`,
//!   `ask_human`, or `result`. Unknown types are skipped.

use std::path::PathBuf;
use std::process::Stdio;

use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use super::codec::AgentCodec;
use super::{AgentCapability, AgentEvent, AgentRequest, AgentSession};
use crate::{AppError, Result};

/// Environment variables inherited by the agent process.
///
/// Everything else is stripped via `env_clear()`, so the webhook secret
/// never reaches the agent.
pub const ALLOWED_ENV_VARS: &[&str] = &[
    "PATH",
    "HOME",
    "RUST_LOG",
    "ANTHROPIC_API_KEY",
    // Windows-specific variables.
    "USERPROFILE",
    "SystemRoot",
    "TEMP",
    "TMP",
    "USERNAME",
    "APPDATA",
    "LOCALAPPDATA",
    "COMSPEC",
];

/// How to launch the agent process.
#[derive(Debug, Clone)]
pub struct ProcessAgentConfig {
    /// Agent binary.
    pub host_cli: String,
    /// Arguments passed to the binary.
    pub host_cli_args: Vec<String>,
}

/// Runs each conversation in a fresh agent process.
#[derive(Debug, Clone)]
pub struct ProcessAgent {
    config: ProcessAgentConfig,
}

impl ProcessAgent {
    /// Create a capability that launches `config.host_cli`.
    #[must_use]
    pub fn new(config: ProcessAgentConfig) -> Self {
        Self { config }
    }

    async fn spawn(&self, request: AgentRequest) -> Result<ProcessSession> {
        let cwd: PathBuf = request.working_directory.clone();
        tokio::fs::create_dir_all(&cwd)
            .await
            .map_err(|err| AppError::Agent(format!("failed to create working directory: {err}")))?;

        let mut cmd = Command::new(&self.config.host_cli);
        cmd.args(&self.config.host_cli_args);

        cmd.env_clear();
        for &key in ALLOWED_ENV_VARS {
            if let Ok(val) = std::env::var(key) {
                cmd.env(key, val);
            }
        }

        cmd.current_dir(&cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|err| AppError::Agent(format!("failed to spawn agent: {err}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::Agent("failed to capture agent stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Agent("failed to capture agent stdout".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(stderr));
        }

        info!(
            host_cli = %self.config.host_cli,
            cwd = %cwd.display(),
            resume = request.resume_session_id.is_some(),
            "agent process spawned"
        );

        let mut session = ProcessSession {
            _child: child,
            stdin,
            stdout: FramedRead::new(stdout, AgentCodec::new()),
        };
        session.write(&start_message(&request)).await?;
        Ok(session)
    }
}

impl AgentCapability for ProcessAgent {
    fn initialize(&self, request: AgentRequest) -> BoxFuture<'_, Result<Box<dyn AgentSession>>> {
        Box::pin(async move {
            let session = self.spawn(request).await?;
            Ok(Box::new(session) as Box<dyn AgentSession>)
        })
    }
}

/// Build the `session/start` message for `request`.
#[must_use]
pub fn start_message(request: &AgentRequest) -> Value {
    json!({
        "method": "session/start",
        "params": {
            "prompt": request.prompt,
            "model": request.model,
            "cwd": request.working_directory,
            "resume": request.resume_session_id,
            "allowed_tools": request.tool_set.allowed,
            "tools": request.tool_set.custom,
        }
    })
}

/// Build the `tool/result` message answering ask-human call `call_id`.
#[must_use]
pub fn answer_message(call_id: &str, answer: &str) -> Value {
    json!({
        "method": "tool/result",
        "id": call_id,
        "params": { "content": answer }
    })
}

/// Parse one stdout line into an [`AgentEvent`].
///
/// Returns `Ok(None)` for blank lines and unrecognized message types.
///
/// # Errors
///
/// Returns `AppError::Agent` if the line is not valid JSON or a recognized
/// message is missing a required field.
pub fn parse_event_line(line: &str) -> Result<Option<AgentEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|err| AppError::Agent(format!("malformed agent message: {err}")))?;

    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return Err(AppError::Agent("agent message missing type".into()));
    };

    let event = match kind {
        "init" => AgentEvent::Init {
            session_id: required_str(&value, "session_id")?,
        },
        "tool_use" => AgentEvent::ToolUse {
            name: required_str(&value, "name")?,
        },
        "text" => AgentEvent::Text {
            content: required_str(&value, "content")?,
        },
        "ask_human" => AgentEvent::AskHuman {
            call_id: required_str(&value, "id")?,
            question: required_str(&value, "question")?,
            context: optional_str(&value, "context"),
            options: value
                .get("options")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
        },
        "result" => AgentEvent::Result {
            is_error: value
                .get("is_error")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            summary: optional_str(&value, "summary"),
        },
        other => {
            debug!(kind = other, "skipping unrecognized agent message");
            return Ok(None);
        }
    };
    Ok(Some(event))
}

fn required_str(value: &Value, field: &str) -> Result<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| AppError::Agent(format!("agent message missing {field}")))
}

fn optional_str(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

async fn drain_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(line, "agent stderr");
    }
}

/// One running agent process.
struct ProcessSession {
    // Held so `kill_on_drop` ends the process with the session.
    _child: Child,
    stdin: ChildStdin,
    stdout: FramedRead<ChildStdout, AgentCodec>,
}

impl ProcessSession {
    async fn write(&mut self, message: &Value) -> Result<()> {
        let mut bytes = serde_json::to_vec(message)
            .map_err(|err| AppError::Agent(format!("failed to serialise agent message: {err}")))?;
        bytes.push(b'\n');
        self.stdin.write_all(&bytes).await.map_err(|err| {
            warn!(%err, "write to agent stdin failed");
            AppError::Agent(format!("write failed: {err}"))
        })?;
        self.stdin
            .flush()
            .await
            .map_err(|err| AppError::Agent(format!("write failed: {err}")))
    }
}

impl AgentSession for ProcessSession {
    fn next_event(&mut self) -> BoxFuture<'_, Result<Option<AgentEvent>>> {
        Box::pin(async move {
            while let Some(line) = self.stdout.next().await {
                if let Some(event) = parse_event_line(&line?)? {
                    return Ok(Some(event));
                }
            }
            debug!("agent stdout closed");
            Ok(None)
        })
    }

    fn answer<'a>(&'a mut self, call_id: &'a str, answer: String) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.write(&answer_message(call_id, &answer)).await })
    }
}
