//! Story lifecycle errors.
//!
//! These are the precondition failures of the batch pipeline. They are
//! never retried and map onto not-found / bad-request responses at the
//! service boundary.

/// Story precondition violations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum StoryErrorKind {
    /// No story with this id exists
    #[display("Story {} not found", _0)]
    NotFound(i32),
    /// The draft buffer is empty
    #[display("No batch found to validate or refine for story {}", _0)]
    NoDraft(i32),
    /// A draft batch is still waiting for validation
    #[display("Story {} has a pending draft batch; validate it first", _0)]
    DraftPending(i32),
    /// Every episode has already been finalized
    #[display("All {} episodes of story {} have been generated", num_episodes, story_id)]
    EpisodesExhausted {
        /// Story identifier
        story_id: i32,
        /// Target episode count
        num_episodes: u32,
    },
    /// Batch size below one
    #[display("Invalid batch size: {}", _0)]
    InvalidBatchSize(u32),
    /// Story length below one
    #[display("A story needs at least one episode, got {}", _0)]
    InvalidEpisodeCount(u32),
    /// Feedback names an episode that is not in the draft
    #[display("Episode {} is not part of the pending draft", _0)]
    UnknownEpisode(u32),
    /// Story has no finalized episodes to work from
    #[display("Story {} has no finalized episodes", _0)]
    NoEpisodes(i32),
}

/// Story error with source location tracking.
///
/// # Examples
///
/// ```
/// use shakescript_error::{StoryError, StoryErrorKind};
///
/// let err = StoryError::new(StoryErrorKind::NoDraft(7));
/// assert!(format!("{}", err).contains("No batch found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Story Error: {} at line {} in {}", kind, line, file)]
pub struct StoryError {
    /// The kind of error that occurred
    pub kind: StoryErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StoryError {
    /// Create a new StoryError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StoryErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// True when the failure means the addressed record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, StoryErrorKind::NotFound(_) | StoryErrorKind::NoDraft(_))
    }
}
