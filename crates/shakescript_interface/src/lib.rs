//! Collaborator traits for the Shakescript pipeline.
//!
//! The pipeline depends on three outside services: a language model
//! ([`ShakescriptDriver`]), a durable store ([`StoryRepository`]) and a
//! retrieval index ([`RelevanceIndex`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod repository;
mod traits;

pub use repository::{RelevanceIndex, StoryRepository};
pub use traits::{Embeddings, ShakescriptDriver};
