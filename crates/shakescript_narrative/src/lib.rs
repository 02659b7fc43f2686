//! Batch episode generation for Shakescript.
//!
//! Stories are written a batch at a time: the [`EpisodeGenerator`] drafts
//! each episode from context built by the [`ContextAssembler`], the
//! [`BatchValidator`] judges continuity and quality, the [`BatchRefiner`]
//! rewrites flagged episodes, and the [`BatchOrchestrator`] runs the loop,
//! persisting the draft buffer and cursor through a
//! [`StoryRepository`](shakescript_interface::StoryRepository).
//!
//! # Example
//!
//! ```rust,ignore
//! use shakescript_models::GeminiClient;
//! use shakescript_narrative::{
//!     InMemoryRelevanceIndex, InMemoryStoryRepository, PipelineConfig, RefinementMode,
//!     StoryService,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::load()?;
//! let service = StoryService::new(
//!     Arc::new(GeminiClient::new()?),
//!     Arc::new(InMemoryStoryRepository::new()),
//!     Arc::new(InMemoryRelevanceIndex::from_config(&config)),
//!     config,
//! );
//! let story = service.create_story("A lighthouse keeper finds a map", 6, false).await?;
//! let outcome = service.generate_batch(story.id, None, false, RefinementMode::Ai).await?;
//! println!("{} episodes", outcome.episodes.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod embedding;
mod extraction;
mod generator;
mod in_memory;
mod orchestrator;
mod phases;
mod planner;
mod prompts;
mod refiner;
mod service;
mod validator;

pub use config::{PipelineConfig, Sampling, SamplingTable};
pub use context::{
    ContextAssembler, EpisodeContext, PhaseLocation, character_snapshot, digest_text,
    key_event_digest, locate_phase, phase_guidance, previous_episodes_text, settings_text,
};
pub use embedding::HashedEmbedder;
pub use extraction::{
    FALLBACK_EMOTIONAL_STATE, ParseTier, ParserChain, SUMMARY_UNAVAILABLE, clean_model_text,
    extract_from_code_block, parse_episode_body, parse_episode_details, parse_structured,
    repair_json,
};
pub use generator::{EpisodeGenerator, EpisodeRequest};
pub use in_memory::{InMemoryRelevanceIndex, InMemoryStoryRepository};
pub use orchestrator::{BatchOrchestrator, BatchOutcome, BatchStatus, RefinementMode};
pub use phases::{StoryPhase, phase_description, transition_between, transition_guide};
pub use planner::{StoryPlanner, clean_prompt};
pub use prompts::{
    content_prompt, continuity_prompt, details_prompt, localization_prompt, planning_prompt,
    quality_prompt, refine_prompt, teaser_prompt, title_prompt,
};
pub use refiner::{BatchRefiner, feedback_by_episode};
pub use service::StoryService;
pub use validator::{BatchValidator, CONTINUITY_FEEDBACK, TIMELINE_FEEDBACK, ValidationOutcome};
