//! Batch Refiner: single-pass rewrite of flagged episodes.

use crate::{
    PipelineConfig, clean_model_text, parse_episode_body, refine_prompt, title_prompt,
};
use shakescript_core::{EpisodeDraft, Feedback, PriorEpisode, Story};
use shakescript_error::ShakescriptResult;
use shakescript_interface::ShakescriptDriver;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Rewrites flagged episodes, passing the rest through untouched.
#[derive(Clone)]
pub struct BatchRefiner {
    driver: Arc<dyn ShakescriptDriver>,
    config: PipelineConfig,
}

/// Group feedback by episode, joining multiple notes with newlines.
pub fn feedback_by_episode(feedback: &[Feedback]) -> BTreeMap<u32, String> {
    let mut grouped: BTreeMap<u32, String> = BTreeMap::new();
    for entry in feedback {
        grouped
            .entry(entry.episode_number)
            .and_modify(|notes| {
                notes.push('\n');
                notes.push_str(&entry.feedback);
            })
            .or_insert_with(|| entry.feedback.clone());
    }
    grouped
}

impl BatchRefiner {
    /// Create a refiner.
    pub fn new(driver: Arc<dyn ShakescriptDriver>, config: PipelineConfig) -> Self {
        Self { driver, config }
    }

    /// Refine a batch once.
    ///
    /// Returns a batch of the same size and episode numbers. Episodes with
    /// no feedback are cloned verbatim. A failed refine call is an error; a
    /// failed title call keeps the old title.
    #[instrument(skip(self, story, batch, prior, feedback), fields(story_id = story.id, flagged = tracing::field::Empty))]
    pub async fn refine(
        &self,
        story: &Story,
        batch: &[EpisodeDraft],
        prior: &[PriorEpisode],
        feedback: &[Feedback],
    ) -> ShakescriptResult<Vec<EpisodeDraft>> {
        let notes = feedback_by_episode(feedback);
        tracing::Span::current().record("flagged", notes.len());

        let mut refined = Vec::with_capacity(batch.len());
        for (index, episode) in batch.iter().enumerate() {
            let Some(note) = notes.get(&episode.episode_number) else {
                refined.push(episode.clone());
                continue;
            };

            let before = self.context_before(story, batch, index, prior);
            let after = self.context_after(story, batch, index);
            let prompt = refine_prompt(
                episode.episode_number,
                &episode.episode_content,
                &before,
                &after,
                note,
            );
            let request = self.config.sampling().refine().request(prompt);
            let response = self.driver.generate(&request).await?;

            let content = if response.text.contains("\"episode_content\"") {
                parse_episode_body(&response.text, episode.episode_number)
                    .0
                    .episode_content
            } else {
                clean_model_text(&response.text)
            };

            let mut updated = episode.clone();
            if content.is_empty() {
                warn!(episode = episode.episode_number, "Refinement came back empty, keeping original");
            } else {
                updated.episode_content = content;
            }

            if note.to_lowercase().contains("title") {
                self.retitle(&mut updated).await;
            }

            debug!(episode = episode.episode_number, "Refined episode");
            refined.push(updated);
        }

        info!(refined = notes.len(), "Refinement pass complete");
        Ok(refined)
    }

    fn context_before(
        &self,
        story: &Story,
        batch: &[EpisodeDraft],
        index: usize,
        prior: &[PriorEpisode],
    ) -> String {
        let episode_number = batch[index].episode_number;
        if episode_number == 1 {
            let names = story
                .characters()
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let setting = story
                .metadata
                .setting
                .iter()
                .map(|(place, description)| format!("{place}: {description}"))
                .collect::<Vec<_>>()
                .join("; ");
            return format!(
                "STORY BEGINNING CONTEXT:\nTitle: {}\nSetting: {}\nMain Characters: {}",
                story.title(),
                setting,
                names
            );
        }
        if index > 0 {
            let previous = &batch[index - 1];
            return format!(
                "PREVIOUS EPISODE IN BATCH (#{}): {}",
                previous.episode_number, previous.episode_content
            );
        }
        prior
            .iter()
            .rev()
            .find(|p| p.episode_number + 1 == episode_number)
            .map(|p| format!("PREVIOUS EPISODE (#{}): {}", p.episode_number, p.content))
            .unwrap_or_default()
    }

    fn context_after(&self, story: &Story, batch: &[EpisodeDraft], index: usize) -> String {
        let episode_number = batch[index].episode_number;
        if let Some(next) = batch.get(index + 1) {
            return format!(
                "NEXT EPISODE IN BATCH (#{}): {}",
                next.episode_number, next.episode_content
            );
        }
        if episode_number >= story.num_episodes {
            return "NOTE: This is the final episode of the story and should provide appropriate closure."
                .to_string();
        }
        let mut note = "NOTE: This is the last episode in the current batch. Future episodes will continue the story."
            .to_string();
        if let Some(segment) = story
            .metadata
            .story_outline
            .iter()
            .find(|segment| segment.contains(episode_number + 1))
        {
            note.push_str(&format!(
                "\nUPCOMING STORY POINTS ({}): {}",
                segment.phase_name, segment.description
            ));
        }
        note
    }

    async fn retitle(&self, episode: &mut EpisodeDraft) {
        let request = self
            .config
            .sampling()
            .title()
            .request(title_prompt(&episode.episode_content));
        match self.driver.generate(&request).await {
            Ok(response) => {
                let title = response
                    .text
                    .trim()
                    .trim_matches(|c: char| c == '"' || c == '*' || c == '\'')
                    .trim()
                    .to_string();
                if !title.is_empty() {
                    episode.episode_title = title;
                }
            }
            Err(e) => {
                warn!(episode = episode.episode_number, error = %e, "Title regeneration failed, keeping title");
            }
        }
    }
}
