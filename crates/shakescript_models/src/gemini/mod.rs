//! Google Gemini REST client.

mod client;

pub use client::{DEFAULT_GEMINI_MODEL, GeminiClient};

/// Result type for Gemini operations.
pub type GeminiResult<T> = Result<T, shakescript_error::GeminiError>;
