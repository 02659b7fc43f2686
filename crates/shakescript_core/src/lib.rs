//! Core data types for the Shakescript story pipeline.
//!
//! Stories own their outline, roster, key-event ledger and generation
//! state (cursor plus draft buffer). Episodes exist first as
//! [`EpisodeDraft`]s and become [`Episode`]s once finalized.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod character;
mod chunk;
mod chunking;
mod episode;
mod feedback;
mod lenient;
mod outline;
mod request;
mod role;
mod state;
mod story;
mod telemetry;

pub use character::{
    Character, CharacterDelta, DEFAULT_DESCRIPTION, DEFAULT_EMOTIONAL_STATE, DEFAULT_ROLE,
    MAX_MILESTONES, Milestone, merge_character, truncate_milestones, upsert_character,
};
pub use chunk::{Chunk, RelevantChunk};
pub use chunking::{
    characters_mentioned, chunk_episode, chunk_text, cosine_similarity, importance_score,
    rank_chunks, split_sentences,
};
pub use episode::{Episode, EpisodeDraft, EventTier, KeyEvent, PriorEpisode};
pub use feedback::Feedback;
pub use outline::OutlineSegment;
pub use request::{GenerateRequest, GenerateRequestBuilder, GenerateResponse, Message};
pub use role::Role;
pub use state::{BatchPhase, GenerationState};
pub use story::{Protagonist, Story, StoryId, StoryMetadata, StorySummary, TimelineEntry};
pub use telemetry::{init_telemetry, shutdown_telemetry};
