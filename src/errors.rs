//! Error types shared across the application.

use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Persistence failure when interacting with `SQLite`.
    Db(String),
    /// HTTP server bind or serve failure.
    Http(String),
    /// Notification delivery failure. Logged and swallowed, never fatal.
    Notify(String),
    /// The wrapped agent capability reported a failure.
    Agent(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// Ask-human (or a successful result) arrived before the agent reported a session.
    SessionNotInitialized,
    /// No human answer arrived within the idle bound.
    IdleTimeout(Duration),
    /// The conversation exceeded its overall execution ceiling.
    HardLimit(Duration),
    /// The server stopped while the conversation was still running.
    Shutdown,
    /// Rendezvous channel failure.
    Rendezvous(String),
    /// Inbound request is missing fields or malformed.
    BadRequest(String),
    /// Inbound request conflicts with a conversation already running.
    Conflict(String),
    /// Requested entity does not exist.
    NotFound(String),
}

impl AppError {
    /// Text reported in the `error` field of a `failed` notification.
    ///
    /// Agent failures are surfaced verbatim; everything else uses its
    /// display form.
    #[must_use]
    pub fn failure_message(&self) -> String {
        match self {
            Self::Agent(msg) => msg.clone(),
            Self::IdleTimeout(timeout) => format!(
                "conversation timed out: no response within {} seconds",
                timeout.as_secs_f64()
            ),
            other => other.to_string(),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::Http(msg) => write!(f, "http: {msg}"),
            Self::Notify(msg) => write!(f, "notify: {msg}"),
            Self::Agent(msg) => write!(f, "agent: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::SessionNotInitialized => write!(
                f,
                "session not initialized: agent asked for input or finished before reporting a session"
            ),
            Self::IdleTimeout(timeout) => write!(
                f,
                "idle timeout: no human response within {} seconds",
                timeout.as_secs_f64()
            ),
            Self::HardLimit(limit) => write!(
                f,
                "hard limit exceeded: conversation ran longer than {} seconds",
                limit.as_secs_f64()
            ),
            Self::Shutdown => write!(f, "shutdown: server stopped before the conversation finished"),
            Self::Rendezvous(msg) => write!(f, "rendezvous: {msg}"),
            Self::BadRequest(msg) => write!(f, "bad request: {msg}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
