//! Diesel row types for the story tables.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde_json::Value;

/// Database row for the stories table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = crate::schema::stories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StoryRow {
    pub id: i32,
    pub prompt: String,
    pub title: String,
    pub metadata: Value,
    pub key_events: Value,
    pub timeline: Value,
    pub num_episodes: i32,
    pub is_hinglish: bool,
    pub summary: Option<String>,
    pub current_episode: i32,
    pub draft: Value,
    pub refine_rounds: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Insertable struct for the stories table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::stories)]
pub struct NewStoryRow {
    pub prompt: String,
    pub title: String,
    pub metadata: Value,
    pub num_episodes: i32,
    pub is_hinglish: bool,
}

/// Ledger columns rewritten when an episode is finalized.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::stories)]
pub struct StoryLedgerChangeset {
    pub metadata: Value,
    pub key_events: Value,
    pub timeline: Value,
    pub updated_at: NaiveDateTime,
}

/// Cursor and draft buffer columns.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::stories)]
pub struct GenerationStateChangeset {
    pub current_episode: i32,
    pub draft: Value,
    pub refine_rounds: i32,
    pub updated_at: NaiveDateTime,
}

/// Database row for the episodes table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Associations)]
#[diesel(belongs_to(StoryRow, foreign_key = story_id))]
#[diesel(table_name = crate::schema::episodes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EpisodeRow {
    pub id: i32,
    pub story_id: i32,
    pub episode_number: i32,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub emotional_state: String,
    pub key_events: Value,
    pub created_at: NaiveDateTime,
}

/// Insertable struct for the episodes table, also used as the upsert changeset.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::episodes)]
pub struct NewEpisodeRow {
    pub story_id: i32,
    pub episode_number: i32,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub emotional_state: String,
    pub key_events: Value,
}

/// Database row for the characters table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Associations)]
#[diesel(belongs_to(StoryRow, foreign_key = story_id))]
#[diesel(table_name = crate::schema::characters)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CharacterRow {
    pub id: i32,
    pub story_id: i32,
    pub name: String,
    pub role: String,
    pub description: String,
    pub relationships: Value,
    pub is_active: bool,
    pub emotional_state: String,
    pub milestones: Value,
    pub last_episode_appearance: i32,
}

/// Insertable struct for the characters table, also used as the upsert changeset.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::characters)]
pub struct NewCharacterRow {
    pub story_id: i32,
    pub name: String,
    pub role: String,
    pub description: String,
    pub relationships: Value,
    pub is_active: bool,
    pub emotional_state: String,
    pub milestones: Value,
    pub last_episode_appearance: i32,
}

/// Database row for the chunks table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = crate::schema::chunks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChunkRow {
    pub id: i32,
    pub story_id: i32,
    pub episode_number: i32,
    pub chunk_number: i32,
    pub content: String,
    pub characters: Value,
    pub embedding: Vec<f32>,
    pub importance_score: f32,
}

/// Insertable struct for the chunks table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::chunks)]
pub struct NewChunkRow {
    pub story_id: i32,
    pub episode_number: i32,
    pub chunk_number: i32,
    pub content: String,
    pub characters: Value,
    pub embedding: Vec<f32>,
    pub importance_score: f32,
}
