//! Per-episode generation context.
//!
//! Everything here is a pure function of the story, the episode number and
//! the prior-episode window, except the relevant chunks, which come from
//! the [`RelevanceIndex`].

use crate::{PipelineConfig, phase_description, transition_between};
use shakescript_core::{Character, OutlineSegment, PriorEpisode, RelevantChunk, Story};
use shakescript_interface::RelevanceIndex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const ESCALATION_MARKERS: [&str; 3] = ["crucial", "major", "important"];

/// Outline terms shorter than this are ignored when matching events.
const MIN_TERM_LEN: usize = 4;

/// Where an episode sits in the outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseLocation {
    /// Phase label of the containing segment, empty if none matched
    pub phase_name: String,
    /// Phase label of the following segment; equals `phase_name` at the end
    pub next_phase: String,
    /// First episode of the segment
    pub start: u32,
    /// Last episode of the segment
    pub end: u32,
    /// What the outline says should happen in the segment
    pub brief: String,
}

impl PhaseLocation {
    /// True when this episode closes its phase and a different one follows.
    pub fn is_transition(&self, episode_number: u32) -> bool {
        episode_number == self.end
            && !self.next_phase.is_empty()
            && self.next_phase != self.phase_name
    }
}

/// Find the outline segment containing `episode_number`.
///
/// Without a match the whole story is one unnamed segment.
///
/// # Examples
///
/// ```
/// use shakescript_core::OutlineSegment;
/// use shakescript_narrative::locate_phase;
///
/// let outline = vec![
///     OutlineSegment::new("Ep 1-2", "Meet Asha", "Exposition"),
///     OutlineSegment::new("Ep 3", "The flood", "Inciting Incident"),
/// ];
/// let location = locate_phase(&outline, 2, 6);
/// assert_eq!(location.phase_name, "Exposition");
/// assert_eq!(location.next_phase, "Inciting Incident");
/// assert!(location.is_transition(2));
///
/// let unknown = locate_phase(&outline, 5, 6);
/// assert_eq!((unknown.start, unknown.end), (1, 6));
/// assert!(unknown.phase_name.is_empty());
/// ```
pub fn locate_phase(
    outline: &[OutlineSegment],
    episode_number: u32,
    num_episodes: u32,
) -> PhaseLocation {
    for (index, segment) in outline.iter().enumerate() {
        if let Some((start, end)) = segment.episode_range()
            && (start..=end).contains(&episode_number)
        {
            let next_phase = outline
                .get(index + 1)
                .map(|next| next.phase_name.clone())
                .unwrap_or_else(|| segment.phase_name.clone());
            return PhaseLocation {
                phase_name: segment.phase_name.clone(),
                next_phase,
                start,
                end,
                brief: segment.description.clone(),
            };
        }
    }

    PhaseLocation {
        phase_name: String::new(),
        next_phase: String::new(),
        start: 1,
        end: num_episodes.max(1),
        brief: String::new(),
    }
}

/// Transition brief on the last episode of a phase, otherwise the
/// in-phase description.
pub fn phase_guidance(location: &PhaseLocation, episode_number: u32) -> String {
    if location.is_transition(episode_number) {
        let guide = transition_between(&location.phase_name, &location.next_phase)
            .unwrap_or("- Close this phase and set up the next one.");
        format!(
            "This is the last episode of this phase, so transition smoothly into {}:\n{}",
            location.next_phase, guide
        )
    } else {
        format!(
            "Things you can follow in this phase:\n{}",
            phase_description(&location.phase_name)
        )
    }
}

/// Story key events worth repeating to the model.
///
/// Events carrying an escalation marker come first, then events naming a
/// known character or a term from the phase brief. At most `cap` events.
///
/// # Examples
///
/// ```
/// use shakescript_core::Character;
/// use shakescript_narrative::key_event_digest;
///
/// let events = vec![
///     "Ravi buys bread".to_string(),
///     "A crucial letter arrives".to_string(),
///     "Weather turns".to_string(),
/// ];
/// let digest = key_event_digest(&events, &[Character::named("Ravi")], "", 10);
/// assert_eq!(digest, vec!["A crucial letter arrives", "Ravi buys bread"]);
/// ```
pub fn key_event_digest(
    events: &[String],
    characters: &[Character],
    brief: &str,
    cap: usize,
) -> Vec<String> {
    let names: Vec<String> = characters
        .iter()
        .map(|c| c.name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    let terms: Vec<String> = brief
        .to_lowercase()
        .split_whitespace()
        .map(|term| term.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|term| term.chars().count() >= MIN_TERM_LEN)
        .collect();

    let mut escalated: Vec<&String> = Vec::new();
    let mut related: Vec<&String> = Vec::new();
    for event in events {
        if escalated.contains(&event) || related.contains(&event) {
            continue;
        }
        let lower = event.to_lowercase();
        if ESCALATION_MARKERS.iter().any(|m| lower.contains(m)) {
            escalated.push(event);
        } else if names.iter().any(|n| lower.contains(n.as_str()))
            || terms.iter().any(|t| lower.contains(t.as_str()))
        {
            related.push(event);
        }
    }

    escalated
        .into_iter()
        .chain(related)
        .take(cap)
        .cloned()
        .collect()
}

/// Render a digest for the prompt.
pub fn digest_text(digest: &[String]) -> String {
    if digest.is_empty() {
        "No key events yet.".to_string()
    } else {
        format!("Key Story Events: {}", digest.join("; "))
    }
}

/// One line per character.
pub fn character_snapshot(characters: &[Character]) -> String {
    if characters.is_empty() {
        return "No characters introduced yet.".to_string();
    }
    characters
        .iter()
        .map(|c| {
            format!(
                "Name: {}, Role: {}, Description: {}, Relationships: {}, Active: {}, Emotional State: {}",
                c.name,
                c.role,
                c.description,
                serde_json::to_string(&c.relationships).unwrap_or_default(),
                if c.is_active { "Yes" } else { "No" },
                c.emotional_state
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `place: description` lines.
pub fn settings_text(setting: &BTreeMap<String, String>) -> String {
    if setting.is_empty() {
        return "No settings provided. Build your own.".to_string();
    }
    setting
        .iter()
        .map(|(place, description)| format!("{place}: {description}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The last `window` prior episodes as prompt blocks.
pub fn previous_episodes_text(prior: &[PriorEpisode], window: usize) -> String {
    let start = prior.len().saturating_sub(window);
    let blocks: Vec<String> = prior[start..]
        .iter()
        .map(|episode| {
            format!(
                "EPISODE {}\nTITLE: {}\nCONTENT: {}",
                episode.episode_number, episode.title, episode.content
            )
        })
        .collect();
    if blocks.is_empty() {
        "First episode".to_string()
    } else {
        blocks.join("\n\n")
    }
}

/// Everything the content prompt needs for one episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeContext {
    /// Episode being generated
    pub episode_number: u32,
    /// Target episode count
    pub num_episodes: u32,
    /// Outline position
    pub phase: PhaseLocation,
    /// Transition brief or in-phase description
    pub phase_guidance: String,
    /// Filtered key events
    pub key_events: Vec<String>,
    /// Rendered roster
    pub character_snapshot: String,
    /// Rendered settings
    pub settings: String,
    /// Rendered prior-episode window
    pub previous_episodes: String,
    /// Retrieved prior passages
    pub relevant_chunks: Vec<RelevantChunk>,
    /// Caller feedback, applied as a hard constraint
    pub feedback: Option<String>,
}

impl EpisodeContext {
    /// Build a context from already-retrieved chunks.
    pub fn build(
        story: &Story,
        episode_number: u32,
        prior: &[PriorEpisode],
        feedback: Option<&str>,
        relevant_chunks: Vec<RelevantChunk>,
        config: &PipelineConfig,
    ) -> Self {
        let phase = locate_phase(
            &story.metadata.story_outline,
            episode_number,
            story.num_episodes,
        );
        let key_events = key_event_digest(
            &story.key_events,
            story.characters(),
            &phase.brief,
            *config.key_event_cap(),
        );
        Self {
            episode_number,
            num_episodes: story.num_episodes,
            phase_guidance: phase_guidance(&phase, episode_number),
            phase,
            key_events,
            character_snapshot: character_snapshot(story.characters()),
            settings: settings_text(&story.metadata.setting),
            previous_episodes: previous_episodes_text(prior, *config.prompt_episode_window()),
            relevant_chunks,
            feedback: feedback
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string),
        }
    }

    /// Retrieved passages as prompt text.
    pub fn chunks_text(&self) -> String {
        self.relevant_chunks
            .iter()
            .map(|chunk| format!("RELEVANT CONTEXT: {}", chunk.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Builds [`EpisodeContext`] values, querying the index for passages.
#[derive(Clone)]
pub struct ContextAssembler {
    index: Arc<dyn RelevanceIndex>,
    config: PipelineConfig,
}

impl ContextAssembler {
    /// Create an assembler over a relevance index.
    pub fn new(index: Arc<dyn RelevanceIndex>, config: PipelineConfig) -> Self {
        Self { index, config }
    }

    /// Assemble context for one episode.
    ///
    /// Retrieval failures are logged and treated as no passages.
    #[instrument(skip(self, story, prior, feedback), fields(story_id = story.id, episode = episode_number))]
    pub async fn assemble(
        &self,
        story: &Story,
        episode_number: u32,
        prior: &[PriorEpisode],
        feedback: Option<&str>,
    ) -> EpisodeContext {
        let window = *self.config.prompt_episode_window();
        let start = prior.len().saturating_sub(window);
        let query = if prior[start..].is_empty() {
            character_snapshot(story.characters())
        } else {
            prior[start..]
                .iter()
                .map(|episode| episode.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let chunks = match self
            .index
            .relevant_chunks(story.id, &query, *self.config.relevant_chunk_count())
            .await
        {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(error = %e, "Relevant chunk retrieval failed, continuing without");
                Vec::new()
            }
        };
        debug!(chunks = chunks.len(), "Retrieved relevant chunks");

        EpisodeContext::build(story, episode_number, prior, feedback, chunks, &self.config)
    }
}
