//! PostgreSQL persistence for Shakescript.
//!
//! This crate provides the schema, row models and repository
//! implementations that back the story pipeline with a database.
//!
//! # Features
//!
//! - Diesel-based PostgreSQL integration with embedded migrations
//! - [`PostgresStoryRepository`]: stories, episodes, characters and the
//!   generation state, with transactional episode finalization
//! - [`PostgresRelevanceIndex`]: chunk storage and relevance ranking
//!
//! # Example
//!
//! ```rust,ignore
//! use shakescript_database::{
//!     PostgresRelevanceIndex, PostgresStoryRepository, establish_connection, run_migrations,
//! };
//! use shakescript_narrative::HashedEmbedder;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut conn = establish_connection()?;
//! run_migrations(&mut conn)?;
//! let repository = PostgresStoryRepository::new(conn);
//! let index = PostgresRelevanceIndex::new(
//!     repository.connection(),
//!     Arc::new(HashedEmbedder::new(384)),
//!     500,
//!     100,
//! );
//! # Ok(())
//! # }
//! ```

mod chunk_index;
mod connection;
mod conversions;
mod models;
mod story_repository;

pub mod schema;

pub use chunk_index::PostgresRelevanceIndex;
pub use connection::{establish_connection, run_migrations};
pub use models::{
    CharacterRow, ChunkRow, EpisodeRow, GenerationStateChangeset, NewCharacterRow, NewChunkRow,
    NewEpisodeRow, NewStoryRow, StoryLedgerChangeset, StoryRow,
};
pub use story_repository::PostgresStoryRepository;

use shakescript_error::DatabaseError;

/// Result type for database operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;
