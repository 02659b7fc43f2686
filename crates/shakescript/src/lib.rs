//! Shakescript - Multi-Episode Story Generation
//!
//! Shakescript plans a story from a prompt and writes it episode by episode
//! through a language model. Episodes are drafted in batches; each batch is
//! checked for continuity and quality, refined, and only then finalized into
//! the story's ledger.
//!
//! # Features
//!
//! - **Story Planning**: Title, setting, cast and a phase-tagged outline from one prompt
//! - **Batch Pipeline**: Generate, validate, refine and finalize with a cursor per story
//! - **AI or Human Review**: Automatic refinement rounds, or a draft buffer awaiting feedback
//! - **Tolerant Parsing**: A tiered parser chain for model replies that drift from JSON
//! - **Retrieval**: Chunked episodes ranked by similarity, importance and story position
//! - **Database Integration**: PostgreSQL persistence for stories, episodes and chunks
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use shakescript::{
//!     GeminiClient, HashedEmbedder, InMemoryRelevanceIndex, InMemoryStoryRepository,
//!     PipelineConfig, RefinementMode, StoryService,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::load()?;
//!     let driver = Arc::new(GeminiClient::with_model(config.model())?);
//!     let repository = Arc::new(InMemoryStoryRepository::new());
//!     let index = Arc::new(InMemoryRelevanceIndex::new(
//!         Arc::new(HashedEmbedder::new(*config.embedding_dimensions())),
//!         *config.chunk_size(),
//!         *config.chunk_overlap(),
//!     ));
//!
//!     let service = StoryService::new(driver, repository, index, config);
//!     let story = service.create_story("A lighthouse keeper's last winter", 6, false).await?;
//!     let outcome = service
//!         .generate_batch(story.id, None, false, RefinementMode::Ai)
//!         .await?;
//!     println!("{}", outcome.message);
//!     Ok(())
//! }
//! ```
//!
//! # Cargo Features
//!
//! - `gemini` - Google Gemini API support
//! - `database` - PostgreSQL database integration
//! - `all` - Enable all features
//!
//! The `shakescript` binary requires both `gemini` and `database`.
//!
//! # Architecture
//!
//! Shakescript is organized as a workspace with focused crates:
//!
//! - `shakescript_error` - Error types
//! - `shakescript_core` - Story, episode, character and chunk types
//! - `shakescript_interface` - Driver, embedding, repository and index traits
//! - `shakescript_models` - LLM provider implementations
//! - `shakescript_narrative` - The batch pipeline and story service
//! - `shakescript_database` - PostgreSQL integration
//!
//! This crate (`shakescript`) re-exports everything for convenience.

// Re-export core crates (always available)
pub use shakescript_core::*;
pub use shakescript_error::*;
pub use shakescript_interface::*;
pub use shakescript_narrative::*;

// Re-export optional crates
#[cfg(feature = "gemini")]
pub use shakescript_models::{DEFAULT_GEMINI_MODEL, GeminiClient, GeminiResult};

#[cfg(feature = "database")]
pub use shakescript_database::{
    DatabaseResult, PostgresRelevanceIndex, PostgresStoryRepository, establish_connection,
    run_migrations,
};
