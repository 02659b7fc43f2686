//! The operations exposed to an outer API layer.

use crate::{BatchOrchestrator, BatchOutcome, PipelineConfig, RefinementMode, StoryPlanner};
use shakescript_core::{Episode, Feedback, Story, StoryId, StorySummary};
use shakescript_error::ShakescriptResult;
use shakescript_interface::{RelevanceIndex, ShakescriptDriver, StoryRepository};
use std::sync::Arc;
use tracing::{info, instrument};

/// Story lifecycle facade over the planner and orchestrator.
///
/// Errors carry enough classification ([`is_not_found`], [`is_bad_request`])
/// and an [`ErrorPayload`] form for a transport layer to map them.
///
/// [`is_not_found`]: shakescript_error::ShakescriptError::is_not_found
/// [`is_bad_request`]: shakescript_error::ShakescriptError::is_bad_request
/// [`ErrorPayload`]: shakescript_error::ErrorPayload
#[derive(Clone)]
pub struct StoryService {
    repository: Arc<dyn StoryRepository>,
    index: Arc<dyn RelevanceIndex>,
    planner: StoryPlanner,
    orchestrator: BatchOrchestrator,
    config: PipelineConfig,
}

impl StoryService {
    /// Wire a service around the three collaborators.
    pub fn new(
        driver: Arc<dyn ShakescriptDriver>,
        repository: Arc<dyn StoryRepository>,
        index: Arc<dyn RelevanceIndex>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            planner: StoryPlanner::new(driver.clone(), repository.clone(), config.clone()),
            orchestrator: BatchOrchestrator::new(
                driver,
                repository.clone(),
                index.clone(),
                config.clone(),
            ),
            repository,
            index,
            config,
        }
    }

    /// Pipeline configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Plan and persist a new story.
    pub async fn create_story(
        &self,
        prompt: &str,
        num_episodes: u32,
        localize: bool,
    ) -> ShakescriptResult<Story> {
        self.planner.create_story(prompt, num_episodes, localize).await
    }

    /// A story with its roster, ledger and generation state.
    pub async fn story(&self, story_id: StoryId) -> ShakescriptResult<Story> {
        self.repository.load_story(story_id).await
    }

    /// All stories, newest first.
    pub async fn list_stories(&self) -> ShakescriptResult<Vec<StorySummary>> {
        self.repository.list_stories().await
    }

    /// Finalized episodes, ascending.
    pub async fn episodes(&self, story_id: StoryId) -> ShakescriptResult<Vec<Episode>> {
        self.repository.episodes(story_id).await
    }

    /// Delete a story and everything it owns, including indexed chunks.
    #[instrument(skip(self))]
    pub async fn delete_story(&self, story_id: StoryId) -> ShakescriptResult<()> {
        self.repository.delete_story(story_id).await?;
        self.index.remove_story(story_id).await?;
        info!("Story deleted");
        Ok(())
    }

    /// Generate the next batch; `None` uses the configured batch size.
    pub async fn generate_batch(
        &self,
        story_id: StoryId,
        batch_size: Option<u32>,
        localize: bool,
        mode: RefinementMode,
    ) -> ShakescriptResult<BatchOutcome> {
        let batch_size = batch_size.unwrap_or(*self.config.default_batch_size());
        self.orchestrator
            .generate_batch(story_id, batch_size, localize, mode)
            .await
    }

    /// Finalize the pending draft.
    pub async fn validate_batch(&self, story_id: StoryId) -> ShakescriptResult<BatchOutcome> {
        self.orchestrator.validate_batch(story_id).await
    }

    /// Refine the pending draft with per-episode feedback.
    pub async fn refine_batch(
        &self,
        story_id: StoryId,
        feedback: &[Feedback],
    ) -> ShakescriptResult<BatchOutcome> {
        self.orchestrator.refine_batch(story_id, feedback).await
    }

    /// Write and store a teaser for the story so far.
    pub async fn summarize_story(&self, story_id: StoryId) -> ShakescriptResult<String> {
        self.planner.write_teaser(story_id).await
    }
}
