//! Characters and the name-keyed merge applied when an episode is finalized.

use crate::lenient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Milestones kept per character; older shifts fall off the front.
pub const MAX_MILESTONES: usize = 5;

/// Role given to a character first seen without one.
pub const DEFAULT_ROLE: &str = "Unknown";
/// Description given to a character first seen without one.
pub const DEFAULT_DESCRIPTION: &str = "No description";
/// Emotional state given to a character first seen without one.
pub const DEFAULT_EMOTIONAL_STATE: &str = "neutral";

/// An emotional-state change and the episode it happened in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// What changed, e.g. `Shift to hopeful`
    pub event: String,
    /// Episode number of the change
    pub episode: u32,
}

/// A story character. Identity is the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Unique per story
    #[serde(alias = "Name", deserialize_with = "lenient::text")]
    pub name: String,
    /// Narrative role
    #[serde(alias = "Role", default = "default_role", deserialize_with = "lenient::text")]
    pub role: String,
    /// Short description
    #[serde(
        alias = "Description",
        default = "default_description",
        deserialize_with = "lenient::text"
    )]
    pub description: String,
    /// Other character name → relationship
    #[serde(alias = "Relationship", default, deserialize_with = "lenient::string_map")]
    pub relationships: BTreeMap<String, String>,
    /// Still part of the story
    #[serde(alias = "role_active", default = "default_active")]
    pub is_active: bool,
    /// Current emotional state
    #[serde(
        alias = "Emotional_State",
        default = "default_emotional_state",
        deserialize_with = "lenient::text"
    )]
    pub emotional_state: String,
    /// Recent emotional-state changes, oldest first
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    /// Last episode the character appeared in
    #[serde(default)]
    pub last_episode_appearance: u32,
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

fn default_active() -> bool {
    true
}

fn default_emotional_state() -> String {
    DEFAULT_EMOTIONAL_STATE.to_string()
}

impl Character {
    /// A character with defaults for everything but the name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: default_role(),
            description: default_description(),
            relationships: BTreeMap::new(),
            is_active: true,
            emotional_state: default_emotional_state(),
            milestones: Vec::new(),
            last_episode_appearance: 0,
        }
    }
}

/// Changes to one character reported by the extraction call.
///
/// Every field but the name is optional; absent fields leave the stored
/// character untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterDelta {
    /// Character to update or insert
    #[serde(alias = "Name", deserialize_with = "lenient::text")]
    pub name: String,
    /// New role
    #[serde(alias = "Role", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// New description
    #[serde(alias = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Relationship entries to add or overwrite
    #[serde(
        alias = "Relationship",
        default,
        deserialize_with = "lenient::optional_string_map",
        skip_serializing_if = "Option::is_none"
    )]
    pub relationships: Option<BTreeMap<String, String>>,
    /// Active flag
    #[serde(
        alias = "role_active",
        default,
        deserialize_with = "lenient::optional_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_active: Option<bool>,
    /// Emotional state at the end of the episode
    #[serde(alias = "Emotional_State", default, skip_serializing_if = "Option::is_none")]
    pub emotional_state: Option<String>,
}

impl CharacterDelta {
    /// A delta that only names the character.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: None,
            description: None,
            relationships: None,
            is_active: None,
            emotional_state: None,
        }
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Apply `delta` observed in `episode` to the stored character, if any.
///
/// Relationships merge key-wise, scalar fields are overwritten when
/// present, and a change of emotional state appends a milestone. The
/// milestone log is not truncated here; see [`truncate_milestones`].
///
/// # Examples
///
/// ```
/// use shakescript_core::{merge_character, Character, CharacterDelta};
///
/// let mut delta = CharacterDelta::named("Asha");
/// delta.emotional_state = Some("hopeful".into());
///
/// let fresh = merge_character(None, &delta, 1);
/// assert_eq!(fresh.role, "Unknown");
/// assert!(fresh.milestones.is_empty());
///
/// delta.emotional_state = Some("grieving".into());
/// let shifted = merge_character(Some(&fresh), &delta, 2);
/// assert_eq!(shifted.milestones[0].event, "Shift to grieving");
/// assert_eq!(shifted.milestones[0].episode, 2);
/// ```
pub fn merge_character(
    existing: Option<&Character>,
    delta: &CharacterDelta,
    episode: u32,
) -> Character {
    let Some(current) = existing else {
        let mut fresh = Character::named(delta.name.trim());
        if let Some(role) = present(&delta.role) {
            fresh.role = role.to_string();
        }
        if let Some(description) = present(&delta.description) {
            fresh.description = description.to_string();
        }
        if let Some(relationships) = &delta.relationships {
            fresh.relationships = relationships.clone();
        }
        if let Some(active) = delta.is_active {
            fresh.is_active = active;
        }
        if let Some(state) = present(&delta.emotional_state) {
            fresh.emotional_state = state.to_string();
        }
        fresh.last_episode_appearance = episode;
        return fresh;
    };

    let mut merged = current.clone();
    if let Some(role) = present(&delta.role) {
        merged.role = role.to_string();
    }
    if let Some(description) = present(&delta.description) {
        merged.description = description.to_string();
    }
    if let Some(relationships) = &delta.relationships {
        merged
            .relationships
            .extend(relationships.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    if let Some(active) = delta.is_active {
        merged.is_active = active;
    }
    if let Some(state) = present(&delta.emotional_state)
        && state != current.emotional_state
    {
        merged.milestones.push(Milestone {
            event: format!("Shift to {}", state),
            episode,
        });
        merged.emotional_state = state.to_string();
    }
    merged.last_episode_appearance = current.last_episode_appearance.max(episode);
    merged
}

/// Keep only the [`MAX_MILESTONES`] most recent milestones.
pub fn truncate_milestones(mut character: Character) -> Character {
    let excess = character.milestones.len().saturating_sub(MAX_MILESTONES);
    character.milestones.drain(..excess);
    character
}

/// Merge followed by milestone truncation.
pub fn upsert_character(
    existing: Option<&Character>,
    delta: &CharacterDelta,
    episode: u32,
) -> Character {
    truncate_milestones(merge_character(existing, delta, episode))
}
