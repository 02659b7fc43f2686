//! Story planning and teaser summaries.

use crate::{
    PipelineConfig, clean_model_text, parse_structured, planning_prompt, teaser_prompt,
};
use shakescript_core::{Story, StoryId, StoryMetadata};
use shakescript_error::{BackendError, ShakescriptResult, StoryError, StoryErrorKind};
use shakescript_interface::{ShakescriptDriver, StoryRepository};
use std::sync::Arc;
use tracing::{info, instrument};

const UNTITLED: &str = "Untitled Story";

/// Strip markdown from a user prompt and collapse whitespace.
///
/// # Examples
///
/// ```
/// use shakescript_narrative::clean_prompt;
///
/// let raw = "## My idea\n- a **lonely** `lighthouse` keeper\n\n* finds   a map";
/// assert_eq!(clean_prompt(raw), "My idea a lonely lighthouse keeper finds a map");
/// ```
pub fn clean_prompt(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            let line = line.trim().trim_start_matches('#').trim_start();
            let line = ["- ", "* ", "+ "]
                .iter()
                .find_map(|bullet| line.strip_prefix(bullet))
                .unwrap_or(line);
            line.replace("**", "").replace("__", "").replace('`', "")
        })
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Plans new stories and writes teasers for finished ones.
#[derive(Clone)]
pub struct StoryPlanner {
    driver: Arc<dyn ShakescriptDriver>,
    repository: Arc<dyn StoryRepository>,
    config: PipelineConfig,
}

impl StoryPlanner {
    /// Create a planner.
    pub fn new(
        driver: Arc<dyn ShakescriptDriver>,
        repository: Arc<dyn StoryRepository>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            driver,
            repository,
            config,
        }
    }

    /// Ask the model for story metadata and persist a new story.
    ///
    /// # Errors
    ///
    /// Zero episodes, an unreachable model, or metadata that no parser tier
    /// can read.
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn create_story(
        &self,
        prompt: &str,
        num_episodes: u32,
        localize: bool,
    ) -> ShakescriptResult<Story> {
        if num_episodes == 0 {
            return Err(StoryError::new(StoryErrorKind::InvalidEpisodeCount(num_episodes)).into());
        }

        let idea = clean_prompt(prompt);
        let request = self
            .config
            .sampling()
            .planning()
            .request(planning_prompt(&idea, num_episodes, localize));
        let response = self.driver.generate(&request).await?;

        let mut metadata: StoryMetadata =
            parse_structured(&response.text, &["Title", "Story Outline", "Characters"])?;
        if metadata.title.trim().is_empty() {
            metadata.title = UNTITLED.to_string();
        }

        let id = self
            .repository
            .create_story(prompt, &metadata, num_episodes, localize)
            .await?;
        info!(
            story_id = id,
            title = %metadata.title,
            outline_segments = metadata.story_outline.len(),
            characters = metadata.characters.len(),
            "Story planned"
        );
        self.repository.load_story(id).await
    }

    /// Write and store a spoiler-free teaser from episode summaries.
    ///
    /// # Errors
    ///
    /// Unknown story, no finalized episodes, or an unreachable model.
    #[instrument(skip(self))]
    pub async fn write_teaser(&self, story_id: StoryId) -> ShakescriptResult<String> {
        let story = self.repository.load_story(story_id).await?;
        let episodes = self.repository.episodes(story_id).await?;
        if episodes.is_empty() {
            return Err(StoryError::new(StoryErrorKind::NoEpisodes(story_id)).into());
        }

        let summaries: Vec<String> = episodes.iter().map(|e| e.summary.clone()).collect();
        let request = self
            .config
            .sampling()
            .summary()
            .request(teaser_prompt(story.title(), &summaries));
        let response = self.driver.generate(&request).await?;
        let teaser = clean_model_text(&response.text);
        if teaser.is_empty() {
            return Err(BackendError::new(format!(
                "Model returned an empty teaser for story {}",
                story_id
            ))
            .into());
        }

        self.repository.update_summary(story_id, &teaser).await?;
        info!(words = teaser.split_whitespace().count(), "Teaser stored");
        Ok(teaser)
    }
}
