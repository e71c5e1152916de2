//! Checkpoint model for a single ask-human round.

use std::time::Duration;

/// A question the agent put to the human, with its wait bound.
///
/// Lives only for one round: it is sent as a `clarification_needed`
/// notification and discarded once the wait resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// The question shown to the human.
    pub question: String,
    /// Why the agent is asking.
    pub context: String,
    /// Suggested answers; may be empty.
    pub options: Vec<String>,
    /// How long to wait for an answer.
    pub deadline: Duration,
}

impl Checkpoint {
    /// Construct a checkpoint for one round.
    #[must_use]
    pub fn new(question: String, context: String, options: Vec<String>, deadline: Duration) -> Self {
        Self {
            question,
            context,
            options,
            deadline,
        }
    }
}
