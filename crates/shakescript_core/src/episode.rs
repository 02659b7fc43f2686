//! Episodes: the in-flight draft record and the finalized row.

use crate::{CharacterDelta, StoryId, lenient};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How much a key event matters to the rest of the story.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(from = "String", into = "String")]
pub enum EventTier {
    /// Shapes the premise; carried in the story's key-event list
    #[strum(serialize = "foundational")]
    Foundational,
    /// Changes who a character is; carried in the key-event list
    #[strum(serialize = "character-defining")]
    CharacterDefining,
    /// Moves the plot between situations
    #[strum(serialize = "transitional")]
    Transitional,
    /// Background detail
    #[default]
    #[strum(serialize = "contextual")]
    Contextual,
}

impl EventTier {
    /// Foundational and character-defining events are kept on the story.
    pub fn is_story_defining(self) -> bool {
        matches!(self, EventTier::Foundational | EventTier::CharacterDefining)
    }
}

impl From<String> for EventTier {
    fn from(raw: String) -> Self {
        raw.trim()
            .to_lowercase()
            .replace(['_', ' '], "-")
            .parse()
            .unwrap_or_default()
    }
}

impl From<EventTier> for String {
    fn from(tier: EventTier) -> Self {
        tier.to_string()
    }
}

/// A tagged plot event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawKeyEvent")]
pub struct KeyEvent {
    /// What happened
    pub event: String,
    /// How much it matters
    pub tier: EventTier,
}

impl KeyEvent {
    /// Create a key event.
    pub fn new(event: impl Into<String>, tier: EventTier) -> Self {
        Self {
            event: event.into(),
            tier,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawKeyEvent {
    Plain(String),
    Tagged {
        #[serde(default, deserialize_with = "lenient::text")]
        event: String,
        #[serde(default)]
        tier: EventTier,
    },
}

impl From<RawKeyEvent> for KeyEvent {
    fn from(raw: RawKeyEvent) -> Self {
        match raw {
            RawKeyEvent::Plain(event) => KeyEvent::new(event, EventTier::default()),
            RawKeyEvent::Tagged { event, tier } => KeyEvent::new(event, tier),
        }
    }
}

/// The canonical episode record produced by the generator and held in
/// the draft buffer until finalization.
///
/// Field names follow the extraction prompt so a model answer can be
/// deserialized directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeDraft {
    /// 1-indexed position in the story
    #[serde(default)]
    pub episode_number: u32,
    /// Title
    #[serde(default, deserialize_with = "lenient::text")]
    pub episode_title: String,
    /// Narrative prose
    #[serde(default, deserialize_with = "lenient::text")]
    pub episode_content: String,
    /// Short summary
    #[serde(default, deserialize_with = "lenient::text")]
    pub episode_summary: String,
    /// Emotional label for the episode
    #[serde(default, deserialize_with = "lenient::text")]
    pub episode_emotional_state: String,
    /// Character updates observed in this episode
    #[serde(default, deserialize_with = "lenient::tolerant_list")]
    pub characters_featured: Vec<CharacterDelta>,
    /// Tagged key events
    #[serde(
        rename = "Key Events",
        alias = "key_events",
        default,
        deserialize_with = "lenient::tolerant_list"
    )]
    pub key_events: Vec<KeyEvent>,
    /// Place → new or changed description
    #[serde(
        rename = "Settings",
        alias = "settings_delta",
        default,
        deserialize_with = "lenient::string_map"
    )]
    pub settings_delta: BTreeMap<String, String>,
}

impl EpisodeDraft {
    /// An empty draft for `episode_number`.
    pub fn new(episode_number: u32) -> Self {
        Self {
            episode_number,
            episode_title: String::new(),
            episode_content: String::new(),
            episode_summary: String::new(),
            episode_emotional_state: String::new(),
            characters_featured: Vec::new(),
            key_events: Vec::new(),
            settings_delta: BTreeMap::new(),
        }
    }
}

/// A finalized episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Row identity
    pub id: i32,
    /// Owning story
    pub story_id: StoryId,
    /// Unique per story
    pub episode_number: u32,
    /// Title
    pub title: String,
    /// Narrative prose
    pub content: String,
    /// Short summary
    pub summary: String,
    /// Emotional label
    pub emotional_state: String,
    /// Tagged key events
    pub key_events: Vec<KeyEvent>,
}

impl Episode {
    /// The finalized form of a draft.
    pub fn from_draft(id: i32, story_id: StoryId, draft: &EpisodeDraft) -> Self {
        Self {
            id,
            story_id,
            episode_number: draft.episode_number,
            title: draft.episode_title.clone(),
            content: draft.episode_content.clone(),
            summary: draft.episode_summary.clone(),
            emotional_state: draft.episode_emotional_state.clone(),
            key_events: draft.key_events.clone(),
        }
    }
}

/// The slice of an episode used as context for later episodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorEpisode {
    /// Episode number
    pub episode_number: u32,
    /// Title
    pub title: String,
    /// Narrative prose
    pub content: String,
}

impl From<&Episode> for PriorEpisode {
    fn from(episode: &Episode) -> Self {
        Self {
            episode_number: episode.episode_number,
            title: episode.title.clone(),
            content: episode.content.clone(),
        }
    }
}

impl From<&EpisodeDraft> for PriorEpisode {
    fn from(draft: &EpisodeDraft) -> Self {
        Self {
            episode_number: draft.episode_number,
            title: draft.episode_title.clone(),
            content: draft.episode_content.clone(),
        }
    }
}
