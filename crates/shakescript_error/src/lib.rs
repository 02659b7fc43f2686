//! Error types for the Shakescript story pipeline.
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use shakescript_error::{ShakescriptResult, StoryError, StoryErrorKind};
//!
//! fn load(id: i32) -> ShakescriptResult<String> {
//!     Err(StoryError::new(StoryErrorKind::NotFound(id)))?
//! }
//!
//! let err = load(4).unwrap_err();
//! assert!(err.is_not_found());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod builder;
mod config;
#[cfg(feature = "database")]
mod database;
mod error;
mod gemini;
mod generation;
mod json;
mod story;

pub use backend::BackendError;
pub use builder::{BuilderError, BuilderErrorKind};
pub use config::ConfigError;
#[cfg(feature = "database")]
pub use database::{DatabaseError, DatabaseErrorKind};
pub use error::{ErrorPayload, ShakescriptError, ShakescriptErrorKind, ShakescriptResult};
pub use gemini::{GeminiError, GeminiErrorKind, RetryableError};
pub use generation::{GenerationError, GenerationErrorKind};
pub use json::JsonError;
pub use story::{StoryError, StoryErrorKind};
