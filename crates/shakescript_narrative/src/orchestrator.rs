//! Batch Orchestrator: drives generate, validate, refine and finalize
//! across a story, one batch at a time.
//!
//! The story's [`GenerationState`](shakescript_core::GenerationState) is
//! carried through each stage in memory and written back at transition
//! boundaries only: after a draft is staged, after each finalized batch,
//! and after a human refine.

use crate::{
    BatchRefiner, BatchValidator, ContextAssembler, EpisodeGenerator, EpisodeRequest,
    PipelineConfig, ValidationOutcome,
};
use serde::{Deserialize, Serialize};
use shakescript_core::{BatchPhase, Episode, EpisodeDraft, Feedback, PriorEpisode, Story, StoryId};
use shakescript_error::{
    ErrorPayload, ShakescriptError, ShakescriptResult, StoryError, StoryErrorKind,
};
use shakescript_interface::{RelevanceIndex, ShakescriptDriver, StoryRepository};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{Span, debug, error, info, instrument, warn};

/// Who judges a drafted batch.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum RefinementMode {
    /// Validate and refine automatically, then finalize and continue
    #[default]
    Ai,
    /// Stop after drafting; the caller validates or refines explicitly
    Human,
}

/// How an orchestration call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every episode of the story is finalized
    Complete,
    /// A draft batch awaits human review
    Pending,
    /// The pending draft was finalized
    Finalized,
    /// The pending draft was rewritten
    Refined,
    /// Generation failed; partial batch returned
    Halted,
}

/// Result of an exposed orchestration operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Story the operation ran on
    pub story_id: StoryId,
    /// How it ended
    pub status: BatchStatus,
    /// Cursor after the operation
    pub current_episode: u32,
    /// Finalized episodes produced or returned
    pub episodes: Vec<Episode>,
    /// Unfinalized episodes: the pending draft or a partial batch
    pub draft: Vec<EpisodeDraft>,
    /// Non-fatal problems, e.g. unresolved feedback
    pub warnings: Vec<String>,
    /// Error marker for a halted batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
    /// Human-readable summary
    pub message: String,
}

impl BatchOutcome {
    fn new(story: &Story, status: BatchStatus, message: impl Into<String>) -> Self {
        Self {
            story_id: story.id,
            status,
            current_episode: story.state.current_episode,
            episodes: Vec::new(),
            draft: Vec::new(),
            warnings: Vec::new(),
            error: None,
            message: message.into(),
        }
    }
}

/// Drafted episodes up to the first generation failure.
struct DraftAttempt {
    episodes: Vec<EpisodeDraft>,
    failure: Option<ShakescriptError>,
}

/// The batch state machine.
///
/// Callers must not run two operations for the same story concurrently.
#[derive(Clone)]
pub struct BatchOrchestrator {
    repository: Arc<dyn StoryRepository>,
    index: Arc<dyn RelevanceIndex>,
    generator: EpisodeGenerator,
    validator: BatchValidator,
    refiner: BatchRefiner,
    config: PipelineConfig,
}

impl BatchOrchestrator {
    /// Wire the pipeline components around shared collaborators.
    pub fn new(
        driver: Arc<dyn ShakescriptDriver>,
        repository: Arc<dyn StoryRepository>,
        index: Arc<dyn RelevanceIndex>,
        config: PipelineConfig,
    ) -> Self {
        let assembler = ContextAssembler::new(index.clone(), config.clone());
        Self {
            generator: EpisodeGenerator::new(driver.clone(), assembler, config.clone()),
            validator: BatchValidator::new(driver.clone(), config.clone()),
            refiner: BatchRefiner::new(driver, config.clone()),
            repository,
            index,
            config,
        }
    }

    /// Generate the next batch.
    ///
    /// In [`RefinementMode::Human`] the batch is drafted and left pending.
    /// In [`RefinementMode::Ai`] batches are drafted, validated, refined
    /// within budget and finalized until the story is complete; the result
    /// lists every finalized episode of the story. Episodes are localized
    /// when `localize` is set or the story was created for Hinglish.
    ///
    /// # Errors
    ///
    /// Precondition failures: unknown story, batch size zero, story already
    /// complete, or a draft still pending. Persistence failures propagate.
    /// Generation failures do not; they halt the batch and are reported in
    /// the returned outcome.
    #[instrument(skip(self), fields(mode = %mode))]
    pub async fn generate_batch(
        &self,
        story_id: StoryId,
        batch_size: u32,
        localize: bool,
        mode: RefinementMode,
    ) -> ShakescriptResult<BatchOutcome> {
        if batch_size == 0 {
            return Err(StoryError::new(StoryErrorKind::InvalidBatchSize(batch_size)).into());
        }
        let story = self.repository.load_story(story_id).await?;
        if story.is_complete() {
            return Err(StoryError::new(StoryErrorKind::EpisodesExhausted {
                story_id,
                num_episodes: story.num_episodes,
            })
            .into());
        }
        if story.state.has_draft() {
            return Err(StoryError::new(StoryErrorKind::DraftPending(story_id)).into());
        }

        let localize = localize || story.is_hinglish;
        match mode {
            RefinementMode::Human => self.draft_for_review(story, batch_size, localize).await,
            RefinementMode::Ai => self.run_to_completion(story, batch_size, localize).await,
        }
    }

    /// Finalize the pending draft verbatim.
    ///
    /// # Errors
    ///
    /// Unknown story or no pending draft. Persistence failures propagate
    /// after the cursor is saved past whatever was finalized.
    #[instrument(skip(self))]
    pub async fn validate_batch(&self, story_id: StoryId) -> ShakescriptResult<BatchOutcome> {
        let mut story = self.repository.load_story(story_id).await?;
        if !story.state.has_draft() {
            return Err(StoryError::new(StoryErrorKind::NoDraft(story_id)).into());
        }

        let batch = story.state.draft.clone();
        let episodes = self.finalize(&mut story, &batch).await?;
        info!(
            finalized = episodes.len(),
            current_episode = story.state.current_episode,
            "Pending draft finalized"
        );

        let message = format!("Finalized {} episode(s)", episodes.len());
        let mut outcome = BatchOutcome::new(&story, BatchStatus::Finalized, message);
        outcome.episodes = episodes;
        Ok(outcome)
    }

    /// Rewrite the pending draft with caller feedback; the cursor stays put.
    ///
    /// There is no cap on how often a draft may be refined; the running
    /// count is kept in the generation state.
    ///
    /// # Errors
    ///
    /// Unknown story, no pending draft, feedback naming an episode outside
    /// the draft, or a failed refine call.
    #[instrument(skip(self, feedback), fields(notes = feedback.len()))]
    pub async fn refine_batch(
        &self,
        story_id: StoryId,
        feedback: &[Feedback],
    ) -> ShakescriptResult<BatchOutcome> {
        let mut story = self.repository.load_story(story_id).await?;
        let Some(first) = story.state.draft.first().map(|d| d.episode_number) else {
            return Err(StoryError::new(StoryErrorKind::NoDraft(story_id)).into());
        };
        if let Some(stray) = feedback
            .iter()
            .find(|f| !story.state.draft.iter().any(|d| d.episode_number == f.episode_number))
        {
            return Err(StoryError::new(StoryErrorKind::UnknownEpisode(stray.episode_number)).into());
        }

        let prior = self.prior_finalized(story_id, first).await?;
        let refined = self
            .refiner
            .refine(&story, &story.state.draft, &prior, feedback)
            .await?;
        story.state.replace_draft(refined);
        self.repository
            .save_generation_state(story_id, &story.state)
            .await?;
        info!(refine_rounds = story.state.refine_rounds, "Pending draft refined");

        let message = format!(
            "Draft refined (round {}); validate to finalize",
            story.state.refine_rounds
        );
        let mut outcome = BatchOutcome::new(&story, BatchStatus::Refined, message);
        outcome.draft = story.state.draft;
        Ok(outcome)
    }

    async fn draft_for_review(
        &self,
        mut story: Story,
        batch_size: u32,
        localize: bool,
    ) -> ShakescriptResult<BatchOutcome> {
        let range = self.next_range(&story, batch_size)?;
        let prior = self.prior_finalized(story.id, *range.start()).await?;
        let attempt = self.draft_batch(&story, range.clone(), &prior, localize).await;
        if let Some(failure) = attempt.failure {
            return Ok(self.halted(&story, attempt.episodes, failure));
        }

        story.state.stage_draft(attempt.episodes);
        self.repository
            .save_generation_state(story.id, &story.state)
            .await?;
        info!(start = *range.start(), end = *range.end(), "Draft batch awaiting review");

        let message = format!(
            "Drafted episodes {}-{}; validate or refine to continue",
            range.start(),
            range.end()
        );
        let mut outcome = BatchOutcome::new(&story, BatchStatus::Pending, message);
        outcome.draft = story.state.draft;
        Ok(outcome)
    }

    async fn run_to_completion(
        &self,
        mut story: Story,
        batch_size: u32,
        localize: bool,
    ) -> ShakescriptResult<BatchOutcome> {
        let mut finalized: Vec<Episode> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();

        while let Some(range) = story.state.next_batch(batch_size, story.num_episodes) {
            info!(start = *range.start(), end = *range.end(), "Starting batch");
            let prior = self.prior_finalized(story.id, *range.start()).await?;
            let attempt = self.draft_batch(&story, range, &prior, localize).await;
            if let Some(failure) = attempt.failure {
                let mut outcome = self.halted(&story, attempt.episodes, failure);
                outcome.episodes = finalized;
                outcome.warnings = warnings;
                return Ok(outcome);
            }

            story.state.stage_draft(attempt.episodes.clone());
            self.repository
                .save_generation_state(story.id, &story.state)
                .await?;

            let (batch, warning) = self.converge(&story, attempt.episodes, &prior).await;
            warnings.extend(warning);
            story.state.stage_draft(batch.clone());
            finalized.extend(self.finalize(&mut story, &batch).await?);
        }

        info!(
            finalized = finalized.len(),
            warnings = warnings.len(),
            "All episodes completed"
        );
        let mut outcome = BatchOutcome::new(
            &story,
            BatchStatus::Complete,
            format!("All {} episodes completed", story.num_episodes),
        );
        outcome.episodes = self.repository.episodes(story.id).await?;
        outcome.warnings = warnings;
        Ok(outcome)
    }

    fn next_range(&self, story: &Story, batch_size: u32) -> ShakescriptResult<RangeInclusive<u32>> {
        story
            .state
            .next_batch(batch_size, story.num_episodes)
            .ok_or_else(|| {
                StoryError::new(StoryErrorKind::EpisodesExhausted {
                    story_id: story.id,
                    num_episodes: story.num_episodes,
                })
                .into()
            })
    }

    /// Finalized episodes just before `first`, ascending.
    async fn prior_finalized(
        &self,
        story_id: StoryId,
        first: u32,
    ) -> ShakescriptResult<Vec<PriorEpisode>> {
        if first <= 1 {
            return Ok(Vec::new());
        }
        let window = *self.config.prior_episode_window() as u32;
        let start = first.saturating_sub(window).max(1);
        let episodes = self
            .repository
            .episodes_in_range(story_id, start, first - 1)
            .await?;
        Ok(episodes.iter().map(PriorEpisode::from).collect())
    }

    /// Generate each episode of `range` in order, stopping at the first
    /// failure.
    #[instrument(
        skip_all,
        fields(
            story_id = story.id,
            phase = %BatchPhase::Drafting,
            start = *range.start(),
            end = *range.end()
        )
    )]
    async fn draft_batch(
        &self,
        story: &Story,
        range: RangeInclusive<u32>,
        prior: &[PriorEpisode],
        localize: bool,
    ) -> DraftAttempt {
        let rolling = *self.config.rolling_window();
        let mut episodes: Vec<EpisodeDraft> = Vec::new();

        for episode_number in range {
            let recent = &episodes[episodes.len().saturating_sub(rolling)..];
            let context: Vec<PriorEpisode> = prior
                .iter()
                .cloned()
                .chain(recent.iter().map(PriorEpisode::from))
                .collect();
            let request = EpisodeRequest::new(story, episode_number, &context).localized(localize);

            match self.generator.generate(request).await {
                Ok(draft) => episodes.push(draft),
                Err(e) => {
                    error!(episode = episode_number, error = %e, "Episode generation failed, halting batch");
                    return DraftAttempt {
                        episodes,
                        failure: Some(e),
                    };
                }
            }
        }

        DraftAttempt {
            episodes,
            failure: None,
        }
    }

    /// Validate and refine within budget; returns the batch to finalize and
    /// a warning when feedback was left unresolved.
    #[instrument(
        skip_all,
        fields(story_id = story.id, phase = tracing::field::Empty, attempt = tracing::field::Empty)
    )]
    async fn converge(
        &self,
        story: &Story,
        mut batch: Vec<EpisodeDraft>,
        prior: &[PriorEpisode],
    ) -> (Vec<EpisodeDraft>, Option<String>) {
        let budget = *self.config.max_refinement_attempts();

        for attempt in 1..=budget {
            Span::current().record("attempt", attempt);
            Span::current().record("phase", tracing::field::display(BatchPhase::Validating));
            let feedback = match self.validator.validate(story, &batch, prior).await {
                ValidationOutcome::Success => {
                    info!(attempt, "Batch validated");
                    return (batch, None);
                }
                ValidationOutcome::NeedsRefinement(feedback) => feedback,
            };
            debug!(attempt, issues = feedback.len(), "Batch needs refinement");
            Span::current().record("phase", tracing::field::display(BatchPhase::Refining));

            match self.refiner.refine(story, &batch, prior, &feedback).await {
                Ok(refined) => batch = refined,
                Err(e) => {
                    warn!(attempt, error = %e, "Refinement failed, finalizing last batch");
                    return (
                        batch,
                        Some(format!(
                            "Refinement failed on attempt {}: {}; finalized the last batch",
                            attempt,
                            e.reason()
                        )),
                    );
                }
            }
        }

        if budget == 0 {
            return (batch, None);
        }
        let first = batch.first().map(|d| d.episode_number).unwrap_or_default();
        let last = batch.last().map(|d| d.episode_number).unwrap_or_default();
        warn!(budget, first, last, "Refinement budget exhausted, proceeding anyway");
        (
            batch,
            Some(format!(
                "Episodes {first}-{last} finalized with unresolved feedback after {budget} refinement attempts"
            )),
        )
    }

    /// Finalize a batch episode by episode.
    ///
    /// Each episode is persisted, folded into the story ledger and indexed
    /// before the cursor moves past it. On failure the state is saved with
    /// the cursor after the last fully finalized episode and the rest of
    /// the batch still in the draft buffer.
    #[instrument(
        skip_all,
        fields(story_id = story.id, phase = %BatchPhase::Finalizing, episodes = batch.len())
    )]
    async fn finalize(
        &self,
        story: &mut Story,
        batch: &[EpisodeDraft],
    ) -> ShakescriptResult<Vec<Episode>> {
        let mut episodes = Vec::with_capacity(batch.len());
        for draft in batch {
            match self.finalize_episode(story, draft).await {
                Ok(episode) => episodes.push(episode),
                Err(e) => {
                    error!(episode = draft.episode_number, error = %e, "Finalization failed");
                    if let Err(save) = self
                        .repository
                        .save_generation_state(story.id, &story.state)
                        .await
                    {
                        warn!(error = %save, "Could not save generation state after failure");
                    }
                    return Err(e);
                }
            }
        }
        self.repository
            .save_generation_state(story.id, &story.state)
            .await?;
        Ok(episodes)
    }

    async fn finalize_episode(
        &self,
        story: &mut Story,
        draft: &EpisodeDraft,
    ) -> ShakescriptResult<Episode> {
        let episode = self.repository.finalize_episode(story.id, draft).await?;
        story.absorb_episode(draft);
        if !episode.content.trim().is_empty() {
            let chunks = self.index.index_episode(story, &episode).await?;
            debug!(episode = episode.episode_number, chunks, "Indexed episode");
        }
        story
            .state
            .mark_finalized(draft.episode_number, story.num_episodes);
        Ok(episode)
    }

    fn halted(
        &self,
        story: &Story,
        partial: Vec<EpisodeDraft>,
        failure: ShakescriptError,
    ) -> BatchOutcome {
        warn!(
            drafted = partial.len(),
            error = %failure,
            "Batch halted, partial draft not persisted"
        );
        let mut outcome = BatchOutcome::new(
            story,
            BatchStatus::Halted,
            format!("Generation halted: {}", failure.reason()),
        );
        outcome.draft = partial;
        outcome.error = Some(ErrorPayload::from(&failure));
        outcome
    }
}
