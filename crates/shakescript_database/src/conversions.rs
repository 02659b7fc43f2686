//! Conversions between domain types and database rows.

use crate::{
    CharacterRow, ChunkRow, DatabaseResult, EpisodeRow, GenerationStateChangeset, NewCharacterRow,
    NewChunkRow, NewEpisodeRow, StoryLedgerChangeset, StoryRow,
};
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shakescript_core::{
    Character, Chunk, Episode, EpisodeDraft, GenerationState, KeyEvent, Story, StoryMetadata,
};
use shakescript_error::{DatabaseError, DatabaseErrorKind};

/// Encode a value for a JSONB column.
pub fn to_json<T: Serialize>(value: &T) -> DatabaseResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Serialization(e.to_string())))
}

/// Decode a JSONB column.
pub fn from_json<T: DeserializeOwned>(column: &str, value: Value) -> DatabaseResult<T> {
    serde_json::from_value(value).map_err(|e| {
        DatabaseError::new(DatabaseErrorKind::Serialization(format!("{}: {}", column, e)))
    })
}

/// Story metadata without the roster, which lives in its own table.
pub fn metadata_column(metadata: &StoryMetadata) -> DatabaseResult<Value> {
    let mut stored = metadata.clone();
    stored.characters.clear();
    to_json(&stored)
}

/// Rebuild a story from its row and roster rows.
pub fn rows_to_story(row: StoryRow, characters: Vec<CharacterRow>) -> DatabaseResult<Story> {
    let mut metadata: StoryMetadata = from_json("metadata", row.metadata)?;
    metadata.characters = characters
        .into_iter()
        .map(row_to_character)
        .collect::<DatabaseResult<Vec<_>>>()?;

    Ok(Story {
        id: row.id,
        prompt: row.prompt,
        metadata,
        key_events: from_json("key_events", row.key_events)?,
        timeline: from_json("timeline", row.timeline)?,
        num_episodes: row.num_episodes as u32,
        is_hinglish: row.is_hinglish,
        summary: row.summary,
        state: GenerationState {
            current_episode: row.current_episode as u32,
            draft: from_json("draft", row.draft)?,
            refine_rounds: row.refine_rounds as u32,
        },
    })
}

/// Ledger columns for a story after an episode was absorbed.
pub fn story_to_ledger(story: &Story) -> DatabaseResult<StoryLedgerChangeset> {
    Ok(StoryLedgerChangeset {
        metadata: metadata_column(&story.metadata)?,
        key_events: to_json(&story.key_events)?,
        timeline: to_json(&story.timeline)?,
        updated_at: Utc::now().naive_utc(),
    })
}

/// Cursor and draft columns.
pub fn state_to_changeset(state: &GenerationState) -> DatabaseResult<GenerationStateChangeset> {
    Ok(GenerationStateChangeset {
        current_episode: state.current_episode as i32,
        draft: to_json(&state.draft)?,
        refine_rounds: state.refine_rounds as i32,
        updated_at: Utc::now().naive_utc(),
    })
}

/// Convert a roster row to a character.
pub fn row_to_character(row: CharacterRow) -> DatabaseResult<Character> {
    Ok(Character {
        name: row.name,
        role: row.role,
        description: row.description,
        relationships: from_json("relationships", row.relationships)?,
        is_active: row.is_active,
        emotional_state: row.emotional_state,
        milestones: from_json("milestones", row.milestones)?,
        last_episode_appearance: row.last_episode_appearance as u32,
    })
}

/// Convert a character to a roster row.
pub fn character_to_new_row(story_id: i32, character: &Character) -> DatabaseResult<NewCharacterRow> {
    Ok(NewCharacterRow {
        story_id,
        name: character.name.clone(),
        role: character.role.clone(),
        description: character.description.clone(),
        relationships: to_json(&character.relationships)?,
        is_active: character.is_active,
        emotional_state: character.emotional_state.clone(),
        milestones: to_json(&character.milestones)?,
        last_episode_appearance: character.last_episode_appearance as i32,
    })
}

/// Convert a finalized draft to an episode row.
pub fn draft_to_new_row(story_id: i32, draft: &EpisodeDraft) -> DatabaseResult<NewEpisodeRow> {
    Ok(NewEpisodeRow {
        story_id,
        episode_number: draft.episode_number as i32,
        title: draft.episode_title.clone(),
        content: draft.episode_content.clone(),
        summary: draft.episode_summary.clone(),
        emotional_state: draft.episode_emotional_state.clone(),
        key_events: to_json(&draft.key_events)?,
    })
}

/// Convert an episode row to an episode.
pub fn row_to_episode(row: EpisodeRow) -> DatabaseResult<Episode> {
    let key_events: Vec<KeyEvent> = from_json("key_events", row.key_events)?;
    Ok(Episode {
        id: row.id,
        story_id: row.story_id,
        episode_number: row.episode_number as u32,
        title: row.title,
        content: row.content,
        summary: row.summary,
        emotional_state: row.emotional_state,
        key_events,
    })
}

/// Convert an embedded chunk to a row.
pub fn chunk_to_new_row(chunk: &Chunk) -> DatabaseResult<NewChunkRow> {
    Ok(NewChunkRow {
        story_id: chunk.story_id,
        episode_number: chunk.episode_number as i32,
        chunk_number: chunk.chunk_number as i32,
        content: chunk.content.clone(),
        characters: to_json(&chunk.characters)?,
        embedding: chunk.embedding.clone(),
        importance_score: chunk.importance_score,
    })
}

/// Convert a chunk row to a chunk.
pub fn row_to_chunk(row: ChunkRow) -> DatabaseResult<Chunk> {
    Ok(Chunk {
        story_id: row.story_id,
        episode_number: row.episode_number as u32,
        chunk_number: row.chunk_number as u32,
        content: row.content,
        characters: from_json("characters", row.characters)?,
        embedding: row.embedding,
        importance_score: row.importance_score,
    })
}
