//! Retrieval chunks cut from finalized episodes.

use crate::StoryId;
use serde::{Deserialize, Serialize};

/// A segment of finalized episode content with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Owning story
    pub story_id: StoryId,
    /// Episode the text came from
    pub episode_number: u32,
    /// Position within the episode, from 1
    pub chunk_number: u32,
    /// Chunk text
    pub content: String,
    /// Known character names mentioned in the text
    pub characters: Vec<String>,
    /// Embedding vector
    pub embedding: Vec<f32>,
    /// Heuristic weight used when ranking retrieval results
    pub importance_score: f32,
}

/// What retrieval hands back to the context assembler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevantChunk {
    /// Episode the text came from
    pub episode_number: u32,
    /// Position within the episode
    pub chunk_number: u32,
    /// Chunk text
    pub content: String,
}

impl From<&Chunk> for RelevantChunk {
    fn from(chunk: &Chunk) -> Self {
        Self {
            episode_number: chunk.episode_number,
            chunk_number: chunk.chunk_number,
            content: chunk.content.clone(),
        }
    }
}
