//! Per-episode feedback.

use serde::{Deserialize, Serialize};

/// A critique aimed at one episode of the pending batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// Episode the critique applies to
    pub episode_number: u32,
    /// What to change
    pub feedback: String,
}

impl Feedback {
    /// Create feedback for an episode.
    pub fn new(episode_number: u32, feedback: impl Into<String>) -> Self {
        Self {
            episode_number,
            feedback: feedback.into(),
        }
    }
}
