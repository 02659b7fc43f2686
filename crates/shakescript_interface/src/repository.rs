//! Persistence and retrieval collaborator traits.

use async_trait::async_trait;
use shakescript_core::{
    Episode, EpisodeDraft, GenerationState, RelevantChunk, Story, StoryId, StoryMetadata,
    StorySummary,
};
use shakescript_error::ShakescriptResult;

/// Durable store for stories, episodes and characters.
///
/// Implementations can use databases or in-memory structures. Callers
/// must not run two batches for the same story concurrently.
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Persist a newly planned story and return its id.
    ///
    /// The story starts with `current_episode = 1` and an empty draft.
    async fn create_story(
        &self,
        prompt: &str,
        metadata: &StoryMetadata,
        num_episodes: u32,
        is_hinglish: bool,
    ) -> ShakescriptResult<StoryId>;

    /// Load a story with roster, ledger and generation state.
    ///
    /// Returns a not-found story error when the id is unknown.
    async fn load_story(&self, id: StoryId) -> ShakescriptResult<Story>;

    /// All stories, newest first.
    async fn list_stories(&self) -> ShakescriptResult<Vec<StorySummary>>;

    /// Delete a story with its episodes, characters and chunks.
    async fn delete_story(&self, id: StoryId) -> ShakescriptResult<()>;

    /// Write cursor and draft buffer in one unit.
    async fn save_generation_state(
        &self,
        id: StoryId,
        state: &GenerationState,
    ) -> ShakescriptResult<()>;

    /// Durably finalize one episode.
    ///
    /// Upserts the episode on (story, episode_number), merges character
    /// deltas by name and folds key events, timeline and setting deltas
    /// into the story, all in one unit. Does not move the cursor.
    async fn finalize_episode(
        &self,
        id: StoryId,
        draft: &EpisodeDraft,
    ) -> ShakescriptResult<Episode>;

    /// Finalized episodes with numbers in `start..=end`, ascending.
    async fn episodes_in_range(
        &self,
        id: StoryId,
        start: u32,
        end: u32,
    ) -> ShakescriptResult<Vec<Episode>>;

    /// Every finalized episode, ascending.
    async fn episodes(&self, id: StoryId) -> ShakescriptResult<Vec<Episode>>;

    /// Store the teaser summary.
    async fn update_summary(&self, id: StoryId, summary: &str) -> ShakescriptResult<()>;
}

/// Chunk store with relevance ranking.
#[async_trait]
pub trait RelevanceIndex: Send + Sync {
    /// Chunk and embed a finalized episode, replacing earlier chunks of
    /// the same episode. Returns the number of chunks written.
    async fn index_episode(&self, story: &Story, episode: &Episode) -> ShakescriptResult<usize>;

    /// Up to `k` chunks relevant to `query`, most relevant first.
    ///
    /// Foundational chunks (episode 1 and the story midpoint) are always
    /// candidates alongside the similarity-ranked ones.
    async fn relevant_chunks(
        &self,
        story_id: StoryId,
        query: &str,
        k: usize,
    ) -> ShakescriptResult<Vec<RelevantChunk>>;

    /// Drop every chunk of a story.
    async fn remove_story(&self, story_id: StoryId) -> ShakescriptResult<()>;
}
