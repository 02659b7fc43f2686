//! Episode Generator: prose, optional localization, then structured details.

use crate::{
    ContextAssembler, PipelineConfig, content_prompt, details_prompt, localization_prompt,
    parse_episode_body, parse_episode_details,
};
use shakescript_core::{EpisodeDraft, PriorEpisode, Story};
use shakescript_error::{GenerationError, GenerationErrorKind, ShakescriptResult};
use shakescript_interface::ShakescriptDriver;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Inputs for one episode.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeRequest<'a> {
    /// Story being written
    pub story: &'a Story,
    /// Episode to generate
    pub episode_number: u32,
    /// Finalized and in-batch episodes before this one, ascending
    pub prior_episodes: &'a [PriorEpisode],
    /// Rewrite title and content into Hinglish
    pub localize: bool,
    /// Feedback applied as a hard constraint
    pub feedback: Option<&'a str>,
}

impl<'a> EpisodeRequest<'a> {
    /// Request with no feedback and no localization.
    pub fn new(story: &'a Story, episode_number: u32, prior_episodes: &'a [PriorEpisode]) -> Self {
        Self {
            story,
            episode_number,
            prior_episodes,
            localize: false,
            feedback: None,
        }
    }

    /// Toggle Hinglish localization.
    pub fn localized(mut self, localize: bool) -> Self {
        self.localize = localize;
        self
    }

    /// Attach feedback.
    pub fn with_feedback(mut self, feedback: Option<&'a str>) -> Self {
        self.feedback = feedback;
        self
    }
}

/// Produces canonical episode drafts from model calls.
#[derive(Clone)]
pub struct EpisodeGenerator {
    driver: Arc<dyn ShakescriptDriver>,
    assembler: ContextAssembler,
    config: PipelineConfig,
}

impl EpisodeGenerator {
    /// Create a generator.
    pub fn new(
        driver: Arc<dyn ShakescriptDriver>,
        assembler: ContextAssembler,
        config: PipelineConfig,
    ) -> Self {
        Self {
            driver,
            assembler,
            config,
        }
    }

    /// Generate one episode draft.
    ///
    /// Unparseable output degrades to a placeholder record. Only an
    /// unreachable model or empty prose is an error.
    #[instrument(
        skip(self, request),
        fields(story_id = request.story.id, episode = request.episode_number, localize = request.localize)
    )]
    pub async fn generate(&self, request: EpisodeRequest<'_>) -> ShakescriptResult<EpisodeDraft> {
        let episode = request.episode_number;
        let context = self
            .assembler
            .assemble(
                request.story,
                episode,
                request.prior_episodes,
                request.feedback,
            )
            .await;

        let sampling = self.config.sampling();
        let prompt = content_prompt(request.story, &context, &self.config);
        let response = self
            .driver
            .generate(&sampling.content().request(prompt))
            .await
            .map_err(|e| upstream(episode, e.reason()))?;

        let (mut draft, tier) = parse_episode_body(&response.text, episode);
        debug!(tier = %tier, "Parsed episode body");
        if draft.episode_content.is_empty() {
            return Err(GenerationError::new(GenerationErrorKind::EmptyContent(episode)).into());
        }

        if request.localize {
            self.localize(&mut draft).await;
        }

        let prompt = details_prompt(
            request.story,
            &draft.episode_title,
            &draft.episode_content,
            &context,
        );
        let response = self
            .driver
            .generate(&sampling.details().request(prompt))
            .await
            .map_err(|e| upstream(episode, e.reason()))?;
        let (details, tier) = parse_episode_details(&response.text, episode);
        debug!(tier = %tier, "Parsed episode details");

        draft.episode_summary = details.episode_summary;
        draft.episode_emotional_state = details.episode_emotional_state;
        draft.characters_featured = details.characters_featured;
        draft.key_events = details.key_events;
        draft.settings_delta = details.settings_delta;

        info!(
            title = %draft.episode_title,
            key_events = draft.key_events.len(),
            characters = draft.characters_featured.len(),
            "Generated episode"
        );
        Ok(draft)
    }

    /// Replace title and content with a Hinglish rewrite, keeping the
    /// original when the rewrite fails or comes back empty.
    async fn localize(&self, draft: &mut EpisodeDraft) {
        let prompt = localization_prompt(&draft.episode_title, &draft.episode_content);
        let request = self.config.sampling().localization().request(prompt);
        match self.driver.generate(&request).await {
            Ok(response) => {
                let (localized, tier) = parse_episode_body(&response.text, draft.episode_number);
                if tier == crate::ParseTier::Placeholder || localized.episode_content.is_empty() {
                    warn!(episode = draft.episode_number, "Localization unparseable, keeping original");
                    return;
                }
                draft.episode_title = localized.episode_title;
                draft.episode_content = localized.episode_content;
            }
            Err(e) => {
                warn!(episode = draft.episode_number, error = %e, "Localization failed, keeping original");
            }
        }
    }
}

fn upstream(episode: u32, reason: String) -> GenerationError {
    GenerationError::new(GenerationErrorKind::Upstream { episode, reason })
}
