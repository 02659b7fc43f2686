//! Per-story generation state: the cursor and the draft buffer.

use crate::EpisodeDraft;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Where a story sits in the batch cycle.
///
/// [`GenerationState::phase`] reports the resting phases; `Validating`,
/// `Refining` and `Finalizing` only exist while an orchestration runs and
/// are recorded on its spans.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchPhase {
    /// No draft in the buffer
    AwaitingBatch,
    /// A batch was generated and written to the draft buffer
    Drafting,
    /// The draft is being checked
    Validating,
    /// Flagged episodes are being rewritten
    Refining,
    /// The draft is being persisted and the cursor advanced
    Finalizing,
    /// The cursor is past the last episode
    Complete,
}

/// Cursor and draft buffer for one story.
///
/// `current_episode` is the next episode to generate. It only moves when
/// an episode is finalized, never when a draft is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationState {
    /// Next episode number to generate
    pub current_episode: u32,
    /// The in-flight batch, empty when no batch is pending
    #[serde(default)]
    pub draft: Vec<EpisodeDraft>,
    /// Times the pending draft was rewritten on caller feedback
    #[serde(default)]
    pub refine_rounds: u32,
}

impl Default for GenerationState {
    fn default() -> Self {
        Self {
            current_episode: 1,
            draft: Vec::new(),
            refine_rounds: 0,
        }
    }
}

impl GenerationState {
    /// True while a batch waits in the draft buffer.
    pub fn has_draft(&self) -> bool {
        !self.draft.is_empty()
    }

    /// Resting phase of a story between operations.
    pub fn phase(&self, num_episodes: u32) -> BatchPhase {
        if self.current_episode > num_episodes {
            BatchPhase::Complete
        } else if self.has_draft() {
            BatchPhase::Drafting
        } else {
            BatchPhase::AwaitingBatch
        }
    }

    /// Episodes not yet finalized.
    pub fn remaining(&self, num_episodes: u32) -> u32 {
        (num_episodes + 1).saturating_sub(self.current_episode)
    }

    /// Episode numbers of the next batch, clamped to what remains.
    ///
    /// # Examples
    ///
    /// ```
    /// use shakescript_core::GenerationState;
    ///
    /// let state = GenerationState::default();
    /// assert_eq!(state.next_batch(5, 4), Some(1..=4));
    /// assert_eq!(state.next_batch(2, 4), Some(1..=2));
    /// assert_eq!(state.next_batch(0, 4), None);
    /// ```
    pub fn next_batch(&self, requested: u32, num_episodes: u32) -> Option<RangeInclusive<u32>> {
        let size = requested.min(self.remaining(num_episodes));
        (size > 0).then(|| self.current_episode..=self.current_episode + size - 1)
    }

    /// Put a freshly generated batch in the draft buffer.
    pub fn stage_draft(&mut self, batch: Vec<EpisodeDraft>) {
        self.draft = batch;
        self.refine_rounds = 0;
    }

    /// Overwrite the pending draft with a refined version.
    pub fn replace_draft(&mut self, batch: Vec<EpisodeDraft>) {
        self.draft = batch;
        self.refine_rounds += 1;
    }

    /// Record that `episode_number` is durably finalized.
    ///
    /// Moves the cursor past it (never backwards, never beyond
    /// `num_episodes + 1`) and drops it from the draft buffer.
    pub fn mark_finalized(&mut self, episode_number: u32, num_episodes: u32) {
        self.current_episode = self
            .current_episode
            .max(episode_number + 1)
            .min(num_episodes + 1);
        self.draft.retain(|d| d.episode_number != episode_number);
        if self.draft.is_empty() {
            self.refine_rounds = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_never_moves_backwards() {
        let mut state = GenerationState {
            current_episode: 4,
            ..Default::default()
        };
        state.mark_finalized(2, 10);
        assert_eq!(state.current_episode, 4);
        state.mark_finalized(4, 10);
        assert_eq!(state.current_episode, 5);
    }

    #[test]
    fn cursor_is_capped_past_the_last_episode() {
        let mut state = GenerationState::default();
        state.mark_finalized(9, 3);
        assert_eq!(state.current_episode, 4);
        assert_eq!(state.phase(3), BatchPhase::Complete);
    }

    #[test]
    fn finalizing_drains_the_draft() {
        let mut state = GenerationState::default();
        state.stage_draft(vec![EpisodeDraft::new(1), EpisodeDraft::new(2)]);
        state.replace_draft(state.draft.clone());
        assert_eq!(state.refine_rounds, 1);
        state.mark_finalized(1, 4);
        assert_eq!(state.phase(4), BatchPhase::Drafting);
        state.mark_finalized(2, 4);
        assert_eq!(state.phase(4), BatchPhase::AwaitingBatch);
        assert_eq!(state.refine_rounds, 0);
        assert_eq!(state.current_episode, 3);
    }

    #[test]
    fn phases_use_state_machine_labels() {
        assert_eq!(BatchPhase::AwaitingBatch.to_string(), "AWAITING_BATCH");
        assert_eq!(BatchPhase::Refining.to_string(), "REFINING");
        assert_eq!("FINALIZING".parse::<BatchPhase>().unwrap(), BatchPhase::Finalizing);
        assert_eq!(
            serde_json::to_string(&BatchPhase::Validating).unwrap(),
            "\"VALIDATING\""
        );
    }
}
