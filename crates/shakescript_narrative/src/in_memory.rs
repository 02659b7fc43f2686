//! In-memory story repository and relevance index for testing.
//!
//! Everything lives in HashMaps behind RwLocks; all data is lost when the
//! values are dropped.

use crate::{HashedEmbedder, PipelineConfig};
use async_trait::async_trait;
use shakescript_core::{
    Chunk, Episode, EpisodeDraft, GenerationState, RelevantChunk, Story, StoryId, StoryMetadata,
    StorySummary, chunk_episode, rank_chunks,
};
use shakescript_error::{ShakescriptResult, StoryError, StoryErrorKind};
use shakescript_interface::{Embeddings, RelevanceIndex, StoryRepository};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

fn not_found(id: StoryId) -> StoryError {
    StoryError::new(StoryErrorKind::NotFound(id))
}

/// In-memory [`StoryRepository`].
///
/// # Example
/// ```
/// use shakescript_core::StoryMetadata;
/// use shakescript_interface::StoryRepository;
/// use shakescript_narrative::InMemoryStoryRepository;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let repo = InMemoryStoryRepository::new();
/// let id = repo.create_story("a heist", &StoryMetadata::default(), 4, false).await?;
/// assert_eq!(repo.load_story(id).await?.state.current_episode, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryStoryRepository {
    stories: Arc<RwLock<HashMap<StoryId, Story>>>,
    episodes: Arc<RwLock<HashMap<StoryId, BTreeMap<u32, Episode>>>>,
    next_story_id: Arc<RwLock<StoryId>>,
    next_episode_id: Arc<RwLock<i32>>,
}

impl InMemoryStoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self {
            stories: Arc::new(RwLock::new(HashMap::new())),
            episodes: Arc::new(RwLock::new(HashMap::new())),
            next_story_id: Arc::new(RwLock::new(1)),
            next_episode_id: Arc::new(RwLock::new(1)),
        }
    }

    /// Number of stored stories (for testing).
    pub async fn len(&self) -> usize {
        self.stories.read().await.len()
    }

    /// Check if the repository is empty (for testing).
    pub async fn is_empty(&self) -> bool {
        self.stories.read().await.is_empty()
    }

    /// Number of finalized episodes for a story (for testing).
    pub async fn episode_count(&self, id: StoryId) -> usize {
        self.episodes
            .read()
            .await
            .get(&id)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Insert a fully built story, replacing any with the same id (for testing).
    pub async fn insert_story(&self, story: Story) {
        let mut next = self.next_story_id.write().await;
        *next = (*next).max(story.id + 1);
        drop(next);
        self.stories.write().await.insert(story.id, story);
    }
}

impl Default for InMemoryStoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoryRepository for InMemoryStoryRepository {
    async fn create_story(
        &self,
        prompt: &str,
        metadata: &StoryMetadata,
        num_episodes: u32,
        is_hinglish: bool,
    ) -> ShakescriptResult<StoryId> {
        let mut next_id_guard = self.next_story_id.write().await;
        let id = *next_id_guard;
        *next_id_guard += 1;
        drop(next_id_guard);

        let story = Story::new(id, prompt, metadata.clone(), num_episodes, is_hinglish);
        self.stories.write().await.insert(id, story);
        Ok(id)
    }

    async fn load_story(&self, id: StoryId) -> ShakescriptResult<Story> {
        let stories = self.stories.read().await;
        stories
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id).into())
    }

    async fn list_stories(&self) -> ShakescriptResult<Vec<StorySummary>> {
        let stories = self.stories.read().await;
        let mut rows: Vec<StorySummary> = stories.values().map(Story::summary_row).collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }

    async fn delete_story(&self, id: StoryId) -> ShakescriptResult<()> {
        let mut stories = self.stories.write().await;
        if stories.remove(&id).is_none() {
            return Err(not_found(id).into());
        }
        self.episodes.write().await.remove(&id);
        Ok(())
    }

    async fn save_generation_state(
        &self,
        id: StoryId,
        state: &GenerationState,
    ) -> ShakescriptResult<()> {
        let mut stories = self.stories.write().await;
        let story = stories.get_mut(&id).ok_or_else(|| not_found(id))?;
        story.state = state.clone();
        Ok(())
    }

    async fn finalize_episode(
        &self,
        id: StoryId,
        draft: &EpisodeDraft,
    ) -> ShakescriptResult<Episode> {
        let mut stories = self.stories.write().await;
        let story = stories.get_mut(&id).ok_or_else(|| not_found(id))?;
        let mut episodes = self.episodes.write().await;
        let by_number = episodes.entry(id).or_default();

        let episode_id = match by_number.get(&draft.episode_number) {
            Some(existing) => existing.id,
            None => {
                let mut next = self.next_episode_id.write().await;
                let episode_id = *next;
                *next += 1;
                episode_id
            }
        };

        let episode = Episode::from_draft(episode_id, id, draft);
        by_number.insert(draft.episode_number, episode.clone());
        story.absorb_episode(draft);
        Ok(episode)
    }

    async fn episodes_in_range(
        &self,
        id: StoryId,
        start: u32,
        end: u32,
    ) -> ShakescriptResult<Vec<Episode>> {
        if start > end {
            return Ok(Vec::new());
        }
        let episodes = self.episodes.read().await;
        Ok(episodes
            .get(&id)
            .map(|by_number| by_number.range(start..=end).map(|(_, e)| e.clone()).collect())
            .unwrap_or_default())
    }

    async fn episodes(&self, id: StoryId) -> ShakescriptResult<Vec<Episode>> {
        let episodes = self.episodes.read().await;
        Ok(episodes
            .get(&id)
            .map(|by_number| by_number.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn update_summary(&self, id: StoryId, summary: &str) -> ShakescriptResult<()> {
        let mut stories = self.stories.write().await;
        let story = stories.get_mut(&id).ok_or_else(|| not_found(id))?;
        story.summary = Some(summary.to_string());
        Ok(())
    }
}

/// In-memory [`RelevanceIndex`] over an [`Embeddings`] backend.
#[derive(Clone)]
pub struct InMemoryRelevanceIndex {
    chunks: Arc<RwLock<HashMap<StoryId, Vec<Chunk>>>>,
    midpoints: Arc<RwLock<HashMap<StoryId, u32>>>,
    embedder: Arc<dyn Embeddings>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl InMemoryRelevanceIndex {
    /// Create an empty index.
    pub fn new(embedder: Arc<dyn Embeddings>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunks: Arc::new(RwLock::new(HashMap::new())),
            midpoints: Arc::new(RwLock::new(HashMap::new())),
            embedder,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Index using the hashed embedder and chunk sizes from `config`.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            Arc::new(HashedEmbedder::new(*config.embedding_dimensions())),
            *config.chunk_size(),
            *config.chunk_overlap(),
        )
    }

    /// Stored chunks for a story (for testing).
    pub async fn chunks(&self, story_id: StoryId) -> Vec<Chunk> {
        self.chunks
            .read()
            .await
            .get(&story_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RelevanceIndex for InMemoryRelevanceIndex {
    async fn index_episode(&self, story: &Story, episode: &Episode) -> ShakescriptResult<usize> {
        let mut fresh = chunk_episode(story, episode, self.chunk_size, self.chunk_overlap);
        let texts: Vec<String> = fresh.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        for (chunk, embedding) in fresh.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }
        let written = fresh.len();

        let mut chunks = self.chunks.write().await;
        let stored = chunks.entry(story.id).or_default();
        stored.retain(|c| c.episode_number != episode.episode_number);
        stored.extend(fresh);
        drop(chunks);

        self.midpoints
            .write()
            .await
            .insert(story.id, story.midpoint_episode());
        Ok(written)
    }

    async fn relevant_chunks(
        &self,
        story_id: StoryId,
        query: &str,
        k: usize,
    ) -> ShakescriptResult<Vec<RelevantChunk>> {
        let stored = self.chunks(story_id).await;
        if stored.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();
        let midpoint = self
            .midpoints
            .read()
            .await
            .get(&story_id)
            .copied()
            .unwrap_or_default();
        Ok(rank_chunks(&stored, &query_embedding, midpoint, k))
    }

    async fn remove_story(&self, story_id: StoryId) -> ShakescriptResult<()> {
        self.chunks.write().await.remove(&story_id);
        self.midpoints.write().await.remove(&story_id);
        Ok(())
    }
}
