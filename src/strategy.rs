//! Checkpoint strategy — how a conversation waits for a human answer.
//!
//! `CheckpointStrategy` is both a config value (`checkpoint_strategy`) and
//! the `--strategy` CLI flag. It selects the [`CheckpointGate`](crate::gate::CheckpointGate)
//! implementation and how the inbound router treats replies.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Strategy used when the agent asks a human a question.
///
/// Defaults to [`CheckpointStrategy::Blocking`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStrategy {
    /// Keep the agent warm and block on the rendezvous channel until the
    /// answer arrives or the idle timeout fires. Default.
    #[default]
    Blocking,
    /// Notify, then end the run as `awaiting_input`; the reply starts a new
    /// run that resumes the agent session by id.
    Respawn,
}

impl CheckpointStrategy {
    /// Wire/config name of the strategy.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::Respawn => "respawn",
        }
    }
}
