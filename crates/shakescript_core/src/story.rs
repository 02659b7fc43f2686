//! The story aggregate and the metadata a planner produces for it.

use crate::{
    Character, EpisodeDraft, GenerationState, OutlineSegment, lenient, upsert_character,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Story row identity.
pub type StoryId = i32;

/// A protagonist as described by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Protagonist {
    /// Name
    #[serde(alias = "Name", default, deserialize_with = "lenient::text")]
    pub name: String,
    /// What drives them
    #[serde(alias = "Motivation", default, deserialize_with = "lenient::text")]
    pub motivation: String,
    /// What they dread
    #[serde(alias = "Fear", default, deserialize_with = "lenient::text")]
    pub fear: String,
}

/// One entry of the story's chronological timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// What happened
    pub event: String,
    /// Episode it happened in
    pub episode: u32,
    /// Whether the event is settled story fact
    pub resolved: bool,
}

/// What the planner extracts from a user prompt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoryMetadata {
    /// Story title
    #[serde(alias = "Title", default, deserialize_with = "lenient::text")]
    pub title: String,
    /// Place → description
    #[serde(alias = "Settings", default, deserialize_with = "lenient::string_map")]
    pub setting: BTreeMap<String, String>,
    /// Main characters with motivation and fear
    #[serde(alias = "Protagonist", default, deserialize_with = "lenient::tolerant_list")]
    pub protagonists: Vec<Protagonist>,
    /// Starting cast
    #[serde(alias = "Characters", default, deserialize_with = "lenient::tolerant_list")]
    pub characters: Vec<Character>,
    /// Theme
    #[serde(alias = "Theme", default, deserialize_with = "lenient::text")]
    pub theme: String,
    /// Ordered phase segments
    #[serde(alias = "Story Outline", default, deserialize_with = "lenient::tolerant_list")]
    pub story_outline: Vec<OutlineSegment>,
    /// Standing instructions for every episode
    #[serde(alias = "Special Instructions", default, deserialize_with = "lenient::text")]
    pub special_instructions: String,
}

/// A story with its roster, ledger and generation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    /// Row identity
    pub id: StoryId,
    /// Prompt the story was planned from
    pub prompt: String,
    /// Planned metadata
    pub metadata: StoryMetadata,
    /// Story-defining key events, insertion-ordered and unique
    pub key_events: Vec<String>,
    /// Every key event with the episode it happened in
    pub timeline: Vec<TimelineEntry>,
    /// Target episode count
    pub num_episodes: u32,
    /// Localize episodes into Hinglish by default
    pub is_hinglish: bool,
    /// Teaser summary, once generated
    pub summary: Option<String>,
    /// Cursor and draft buffer
    pub state: GenerationState,
}

impl Story {
    /// A freshly planned story with the cursor at episode 1.
    pub fn new(
        id: StoryId,
        prompt: impl Into<String>,
        metadata: StoryMetadata,
        num_episodes: u32,
        is_hinglish: bool,
    ) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            metadata,
            key_events: Vec::new(),
            timeline: Vec::new(),
            num_episodes,
            is_hinglish,
            summary: None,
            state: GenerationState::default(),
        }
    }

    /// Story title.
    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    /// Current roster.
    pub fn characters(&self) -> &[Character] {
        &self.metadata.characters
    }

    /// Look a character up by name.
    pub fn character(&self, name: &str) -> Option<&Character> {
        self.metadata.characters.iter().find(|c| c.name == name)
    }

    /// Episode treated as the story's midpoint for retrieval weighting.
    pub fn midpoint_episode(&self) -> u32 {
        self.num_episodes / 2
    }

    /// True once the cursor is past the last episode.
    pub fn is_complete(&self) -> bool {
        self.state.current_episode > self.num_episodes
    }

    /// Fold a finalized episode into the roster and the story ledger.
    ///
    /// Characters are upserted by name and story-defining key events are
    /// appended without duplicates. Every event lands on the timeline once
    /// per episode, so folding the same episode twice changes nothing.
    /// Setting deltas overwrite place descriptions.
    pub fn absorb_episode(&mut self, draft: &EpisodeDraft) {
        let episode = draft.episode_number;

        for delta in &draft.characters_featured {
            let name = delta.name.trim();
            if name.is_empty() {
                continue;
            }
            let roster = &mut self.metadata.characters;
            match roster.iter().position(|c| c.name == name) {
                Some(index) => {
                    let merged = upsert_character(Some(&roster[index]), delta, episode);
                    roster[index] = merged;
                }
                None => roster.push(upsert_character(None, delta, episode)),
            }
        }

        for key_event in &draft.key_events {
            let text = key_event.event.trim();
            if text.is_empty() {
                continue;
            }
            if key_event.tier.is_story_defining() && !self.key_events.iter().any(|e| e == text) {
                self.key_events.push(text.to_string());
            }
            if !self
                .timeline
                .iter()
                .any(|entry| entry.episode == episode && entry.event == text)
            {
                self.timeline.push(TimelineEntry {
                    event: text.to_string(),
                    episode,
                    resolved: key_event.tier.is_story_defining(),
                });
            }
        }

        self.metadata.setting.extend(
            draft
                .settings_delta
                .iter()
                .map(|(place, description)| (place.clone(), description.clone())),
        );
    }

    /// Listing view.
    pub fn summary_row(&self) -> StorySummary {
        StorySummary {
            id: self.id,
            title: self.metadata.title.clone(),
            num_episodes: self.num_episodes,
            current_episode: self.state.current_episode,
            has_draft: self.state.has_draft(),
        }
    }
}

/// One line of a story listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorySummary {
    /// Row identity
    pub id: StoryId,
    /// Title
    pub title: String,
    /// Target episode count
    pub num_episodes: u32,
    /// Next episode to generate
    pub current_episode: u32,
    /// A batch is waiting for validation
    pub has_draft: bool,
}
