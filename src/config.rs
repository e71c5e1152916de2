//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::driver::default_allowed_tools;
use crate::orchestrator::OrchestratorConfig;
use crate::strategy::CheckpointStrategy;
use crate::{AppError, Result};

/// Keyring service under which the webhook secret may be stored.
pub const KEYRING_SERVICE: &str = "checkpoint-relay";

/// Configurable timeout values (seconds).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    /// Maximum time a conversation may block awaiting a human answer.
    #[serde(default = "default_idle_seconds")]
    pub idle_seconds: u64,
    /// Overall ceiling for one conversation run.
    #[serde(default = "default_hard_limit_seconds")]
    pub hard_limit_seconds: u64,
    /// HTTP timeout for each notification delivery.
    #[serde(default = "default_notification_seconds")]
    pub notification_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            idle_seconds: default_idle_seconds(),
            hard_limit_seconds: default_hard_limit_seconds(),
            notification_seconds: default_notification_seconds(),
        }
    }
}

fn default_idle_seconds() -> u64 {
    300
}

fn default_hard_limit_seconds() -> u64 {
    1800
}

fn default_notification_seconds() -> u64 {
    30
}

/// Storage backend for rendezvous channels.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RendezvousBackend {
    /// In-process map; answers are lost on restart.
    #[default]
    Memory,
    /// `SQLite` file shared by every process pointing at `db_path`.
    Sqlite,
}

/// Rendezvous channel settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RendezvousConfig {
    /// Which backend stores pending answers.
    #[serde(default)]
    pub backend: RendezvousBackend,
    /// Database file for the `sqlite` backend.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// Poll interval for blocked readers on the `sqlite` backend.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Channels older than this are purged by the retention task.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u32,
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self {
            backend: RendezvousBackend::Memory,
            db_path: None,
            poll_interval_ms: default_poll_interval_ms(),
            retention_hours: default_retention_hours(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_retention_hours() -> u32 {
    24
}

fn default_http_port() -> u16 {
    8000
}

fn default_bind_host() -> String {
    "127.0.0.1".into()
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from("/tmp/workspace")
}

fn default_model() -> String {
    "claude-sonnet-4-5".into()
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Interface the inbound HTTP server binds to.
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    /// HTTP port for the inbound router.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Working directory handed to the agent capability.
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,
    /// Agent host binary spawned per conversation.
    pub host_cli: String,
    /// Default arguments for the host binary.
    #[serde(default)]
    pub host_cli_args: Vec<String>,
    /// Model identifier passed to the agent.
    #[serde(default = "default_model")]
    pub model: String,
    /// Built-in tools the agent may use; the ask-human tool is always added.
    #[serde(default = "default_allowed_tools")]
    pub allowed_tools: Vec<String>,
    /// How conversations wait for human answers.
    #[serde(default)]
    pub checkpoint_strategy: CheckpointStrategy,
    /// Timeout configuration.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Rendezvous channel backend.
    #[serde(default)]
    pub rendezvous: RendezvousConfig,
    /// Shared HMAC secret for outbound notifications (populated at runtime).
    #[serde(skip)]
    pub webhook_secret: String,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the webhook secret from the OS keychain with env-var fallback.
    ///
    /// Tries the `checkpoint-relay` keyring service first, then falls back
    /// to the `WEBHOOK_SECRET` environment variable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither source provides a secret.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.webhook_secret = load_credential("webhook_secret", "WEBHOOK_SECRET").await?;
        Ok(())
    }

    /// Idle timeout for a single ask-human round.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.idle_seconds)
    }

    /// Overall ceiling for one conversation run.
    #[must_use]
    pub fn hard_limit(&self) -> Duration {
        Duration::from_secs(self.timeouts.hard_limit_seconds)
    }

    /// HTTP timeout for each notification.
    #[must_use]
    pub fn notification_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.notification_seconds)
    }

    /// Poll interval for the `sqlite` rendezvous backend.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.rendezvous.poll_interval_ms)
    }

    /// Build the immutable per-conversation configuration.
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            idle_timeout: self.idle_timeout(),
            hard_limit: self.hard_limit(),
            allowed_tools: self.allowed_tools.clone(),
            model: self.model.clone(),
            working_directory: self.workspace_dir.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.host_cli.trim().is_empty() {
            return Err(AppError::Config("host_cli must not be empty".into()));
        }

        if self.timeouts.idle_seconds == 0 {
            return Err(AppError::Config(
                "timeouts.idle_seconds must be greater than zero".into(),
            ));
        }

        if self.timeouts.notification_seconds == 0 {
            return Err(AppError::Config(
                "timeouts.notification_seconds must be greater than zero".into(),
            ));
        }

        // A human wait that outlives the hard limit would be cut off mid-notification.
        if self.timeouts.idle_seconds >= self.timeouts.hard_limit_seconds {
            return Err(AppError::Config(format!(
                "timeouts.idle_seconds ({}) must be less than timeouts.hard_limit_seconds ({})",
                self.timeouts.idle_seconds, self.timeouts.hard_limit_seconds
            )));
        }

        if self.rendezvous.backend == RendezvousBackend::Sqlite
            && self.rendezvous.db_path.is_none()
        {
            return Err(AppError::Config(
                "rendezvous.db_path is required for the sqlite backend".into(),
            ));
        }

        if self.rendezvous.poll_interval_ms == 0 {
            return Err(AppError::Config(
                "rendezvous.poll_interval_ms must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    match env::var(env_key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))),
    }
}
