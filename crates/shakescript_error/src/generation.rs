//! Episode generation errors.

/// Unrecoverable generation failures.
///
/// Parse failures never produce these; the parser chain always yields a
/// usable record. Only missing content or an unreachable model does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum GenerationErrorKind {
    /// The model produced no narrative prose
    #[display("Episode {} came back with empty content", _0)]
    EmptyContent(u32),
    /// The model could not be reached
    #[display("Model unavailable while generating episode {}: {}", episode, reason)]
    Upstream {
        /// Episode being generated
        episode: u32,
        /// Provider failure text
        reason: String,
    },
}

/// Generation error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The kind of error that occurred
    pub kind: GenerationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new GenerationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
