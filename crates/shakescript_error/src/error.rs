//! Top-level error wrapper types.

use crate::{
    BackendError, BuilderError, ConfigError, GeminiError, GenerationError, JsonError, StoryError,
};
#[cfg(feature = "database")]
use crate::DatabaseError;
use serde::{Deserialize, Serialize};

/// Every failure the pipeline can report.
///
/// # Examples
///
/// ```
/// use shakescript_error::{ShakescriptError, JsonError};
///
/// let json_err = JsonError::new("unexpected end of input");
/// let err: ShakescriptError = json_err.into();
/// assert!(format!("{}", err).contains("JSON Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ShakescriptErrorKind {
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Generic backend error
    #[from(BackendError)]
    Backend(BackendError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
    /// Gemini provider error
    #[from(GeminiError)]
    Gemini(GeminiError),
    /// Database error
    #[cfg(feature = "database")]
    #[from(DatabaseError)]
    Database(DatabaseError),
    /// Story precondition error
    #[from(StoryError)]
    Story(StoryError),
    /// Episode generation error
    #[from(GenerationError)]
    Generation(GenerationError),
}

/// Shakescript error with kind discrimination.
///
/// # Examples
///
/// ```
/// use shakescript_error::{ShakescriptResult, ConfigError};
///
/// fn might_fail() -> ShakescriptResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Shakescript Error: {}", _0)]
pub struct ShakescriptError(Box<ShakescriptErrorKind>);

impl ShakescriptError {
    /// Create a new error from a kind.
    pub fn new(kind: ShakescriptErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ShakescriptErrorKind {
        &self.0
    }

    /// The addressed story or draft does not exist.
    pub fn is_not_found(&self) -> bool {
        match self.kind() {
            ShakescriptErrorKind::Story(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// The request was rejected before any work was done.
    pub fn is_bad_request(&self) -> bool {
        match self.kind() {
            ShakescriptErrorKind::Story(e) => !e.is_not_found(),
            ShakescriptErrorKind::Json(_) | ShakescriptErrorKind::Builder(_) => true,
            _ => false,
        }
    }

    /// Human-readable reason without source location.
    pub fn reason(&self) -> String {
        match self.kind() {
            ShakescriptErrorKind::Json(e) => e.message.clone(),
            ShakescriptErrorKind::Backend(e) => e.message.clone(),
            ShakescriptErrorKind::Config(e) => e.message.clone(),
            ShakescriptErrorKind::Builder(e) => e.kind().to_string(),
            ShakescriptErrorKind::Gemini(e) => e.kind.to_string(),
            #[cfg(feature = "database")]
            ShakescriptErrorKind::Database(e) => e.kind.to_string(),
            ShakescriptErrorKind::Story(e) => e.kind.to_string(),
            ShakescriptErrorKind::Generation(e) => e.kind.to_string(),
        }
    }
}

// Generic From implementation for any type that converts to ShakescriptErrorKind
impl<T> From<T> for ShakescriptError
where
    T: Into<ShakescriptErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Shakescript operations.
pub type ShakescriptResult<T> = std::result::Result<T, ShakescriptError>;

/// The error shape handed across the service boundary.
///
/// # Examples
///
/// ```
/// use shakescript_error::{ErrorPayload, ShakescriptError, StoryError, StoryErrorKind};
///
/// let err: ShakescriptError = StoryError::new(StoryErrorKind::NotFound(3)).into();
/// let payload = ErrorPayload::from(&err);
/// assert_eq!(payload.error, "Story 3 not found");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Reason the operation failed
    pub error: String,
}

impl From<&ShakescriptError> for ErrorPayload {
    fn from(err: &ShakescriptError) -> Self {
        Self {
            error: err.reason(),
        }
    }
}
