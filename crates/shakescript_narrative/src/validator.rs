//! Batch Validator: model-judged continuity and quality checks.

use crate::{PipelineConfig, continuity_prompt, quality_prompt};
use shakescript_core::{EpisodeDraft, Feedback, PriorEpisode, Story};
use shakescript_interface::ShakescriptDriver;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Feedback for a batch's first episode against the finalized predecessor.
pub const TIMELINE_FEEDBACK: &str =
    "Ensure this episode follows directly from the previous one in the timeline";

/// Feedback for an episode against its in-batch predecessor.
pub const CONTINUITY_FEEDBACK: &str =
    "Ensure this episode maintains continuity with the previous episode";

const CONSISTENT: &str = "TRUE";
const QUALITY_OK: &str = "GOOD";

/// Result of validating a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// No complaints
    Success,
    /// Complaints in episode order; one episode may have several
    NeedsRefinement(Vec<Feedback>),
}

impl ValidationOutcome {
    /// True when nothing was flagged.
    pub fn is_success(&self) -> bool {
        matches!(self, ValidationOutcome::Success)
    }

    /// Collected feedback, empty on success.
    pub fn feedback(&self) -> &[Feedback] {
        match self {
            ValidationOutcome::Success => &[],
            ValidationOutcome::NeedsRefinement(feedback) => feedback,
        }
    }
}

/// Checks each episode of a batch against its predecessor and for quality.
#[derive(Clone)]
pub struct BatchValidator {
    driver: Arc<dyn ShakescriptDriver>,
    config: PipelineConfig,
}

impl BatchValidator {
    /// Create a validator.
    pub fn new(driver: Arc<dyn ShakescriptDriver>, config: PipelineConfig) -> Self {
        Self { driver, config }
    }

    /// Validate a batch in order.
    ///
    /// The first episode is compared with the last finalized one (if any),
    /// later episodes with their in-batch predecessor.
    #[instrument(skip(self, story, batch, prior), fields(story_id = story.id, batch_len = batch.len()))]
    pub async fn validate(
        &self,
        story: &Story,
        batch: &[EpisodeDraft],
        prior: &[PriorEpisode],
    ) -> ValidationOutcome {
        let mut feedback = Vec::new();

        for (index, episode) in batch.iter().enumerate() {
            let predecessor = if index == 0 {
                prior.last().map(|p| (p.content.as_str(), TIMELINE_FEEDBACK))
            } else {
                Some((batch[index - 1].episode_content.as_str(), CONTINUITY_FEEDBACK))
            };

            if let Some((previous, complaint)) = predecessor
                && !self.is_consistent(previous, &episode.episode_content).await
            {
                feedback.push(Feedback::new(episode.episode_number, complaint));
            }

            if let Some(critique) = self.quality_critique(story, episode).await {
                feedback.push(Feedback::new(episode.episode_number, critique));
            }
        }

        if feedback.is_empty() {
            debug!("Batch passed validation");
            ValidationOutcome::Success
        } else {
            debug!(issues = feedback.len(), "Batch needs refinement");
            ValidationOutcome::NeedsRefinement(feedback)
        }
    }

    /// Fail-closed: anything but a reply containing TRUE is inconsistent,
    /// including a failed call.
    async fn is_consistent(&self, previous: &str, current: &str) -> bool {
        let request = self
            .config
            .sampling()
            .continuity()
            .request(continuity_prompt(previous, current));
        match self.driver.generate(&request).await {
            Ok(response) => response.text.to_uppercase().contains(CONSISTENT),
            Err(e) => {
                warn!(error = %e, "Continuity check failed, treating as inconsistent");
                false
            }
        }
    }

    /// Free-text critique, or `None` when the reply contains GOOD, is empty,
    /// or the call failed.
    async fn quality_critique(&self, story: &Story, episode: &EpisodeDraft) -> Option<String> {
        let request = self
            .config
            .sampling()
            .quality()
            .request(quality_prompt(story, &episode.episode_content));
        match self.driver.generate(&request).await {
            Ok(response) => {
                let critique = response.text.trim();
                (!critique.is_empty() && !critique.to_uppercase().contains(QUALITY_OK))
                    .then(|| critique.to_string())
            }
            Err(e) => {
                warn!(episode = episode.episode_number, error = %e, "Quality check failed, skipping");
                None
            }
        }
    }
}
