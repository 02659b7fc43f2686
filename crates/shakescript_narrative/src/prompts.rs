//! Prompt text for every model call in the pipeline.

use crate::{EpisodeContext, PipelineConfig, StoryPhase, digest_text};
use shakescript_core::Story;
use strum::IntoEnumIterator;

/// Characters of episode content shown to the title call.
const TITLE_EXCERPT_CHARS: usize = 500;

/// First call: title and prose.
pub fn content_prompt(story: &Story, context: &EpisodeContext, config: &PipelineConfig) -> String {
    let mut prompt = format!(
        r#"You are writing episode {episode} of {total} of the story "{title}" for engaging narration.
Target length: up to {words} words.
This is prose, not stagecraft: never describe camera moves or stage directions such as "the scene shifts to the forest".
Vary the opening line with an action, a line of dialogue or an unexpected event; do not reuse the openings of earlier episodes, and avoid repetitive weather references unless they matter to the plot.

<SETTINGS>
{settings}
</SETTINGS>

CURRENT PHASE: {phase}
What should happen in this phase: {brief}
<PHASE_INFORMATION>
{guidance}
</PHASE_INFORMATION>

GENERAL POINTS:
- Track arcs and relationships from the character snapshot, but give a secondary character or subplot focus at least once.
- Introduce new characters with their backstory and role; show the impact when a character leaves.
- Show, don't tell. Dramatize events as scenes instead of summarizing days at a time.
- Keep dialogue natural and paced to the situation.

SPECIAL INSTRUCTIONS: {special}

<PREVIOUS_EPISODES (use sparingly)>
{previous}
</PREVIOUS_EPISODES>
<RELEVANT_CONTEXT (integrate creatively, not as a template)>
{chunks}
</RELEVANT_CONTEXT>
<CHARACTER_SNAPSHOT>
{snapshot}
</CHARACTER_SNAPSHOT>
<KEY_EVENTS>
{events}
</KEY_EVENTS>

Output STRICTLY a valid JSON object with no additional text:
{{"episode_title": "A descriptive, pronounceable title", "episode_content": "The full episode prose"}}"#,
        episode = context.episode_number,
        total = context.num_episodes,
        title = story.title(),
        words = config.target_word_count(),
        settings = context.settings,
        phase = context.phase.phase_name,
        brief = context.phase.brief,
        guidance = context.phase_guidance,
        special = story.metadata.special_instructions,
        previous = context.previous_episodes,
        chunks = context.chunks_text(),
        snapshot = context.character_snapshot,
        events = digest_text(&context.key_events),
    );
    if let Some(feedback) = &context.feedback {
        prompt.push_str(&format!(
            "\n\nHARD CONSTRAINT: this episode is being rewritten. Apply the following feedback exactly:\n{feedback}"
        ));
    }
    prompt
}

/// Second call: structured details over the finished prose.
pub fn details_prompt(story: &Story, title: &str, content: &str, context: &EpisodeContext) -> String {
    format!(
        r#"Extract structured details from episode {episode} of the story "{story_title}" so that the next episode can be written from them alone.

TITLE: {title}
CONTENT:
{content}

GUIDELINES:
- Update each featured character (emotional state, relationships, whether they are still active).
- Identify 1-3 key events; tag an event "foundational" if it shifts the story significantly, "character-defining" if it develops a character, otherwise "transitional" or "contextual".
- Summarize the episode in 50-70 vivid words.
- Give the emotional state of the episode in one or two words.
- Describe any new or changed places.

CHARACTER SNAPSHOT:
{snapshot}

Output STRICTLY a valid JSON object with no additional text:
{{
  "episode_summary": "string",
  "episode_emotional_state": "string",
  "characters_featured": [{{"Name": "string", "Role": "string", "Description": "string", "Relationship": {{"Character_Name": "Relation"}}, "role_active": true, "Emotional_State": "string"}}],
  "Key Events": [{{"event": "string", "tier": "foundational/character-defining/transitional/contextual"}}],
  "Settings": {{"Place": "Description"}}
}}"#,
        episode = context.episode_number,
        story_title = story.title(),
        snapshot = context.character_snapshot,
    )
}

/// Optional third call: Hinglish rewrite.
pub fn localization_prompt(title: &str, content: &str) -> String {
    format!(
        r#"Rewrite the following episode in Hinglish (romanized Hindi mixed with English).
Translate both title and content. Keep every event, character and line of meaning exactly as it is; only the language changes. Use English words only where Hinglish has no natural equivalent.

EPISODE TITLE:
{title}
EPISODE CONTENT:
{content}

Output STRICTLY a valid JSON object with no additional text:
{{"episode_title": "string", "episode_content": "string"}}"#
    )
}

/// Binary continuity judgment between adjacent episodes.
pub fn continuity_prompt(previous: &str, current: &str) -> String {
    format!(
        r#"Analyze these two consecutive story episodes for narrative consistency.

PREVIOUS EPISODE: {previous}

CURRENT EPISODE: {current}

Check character locations, timeline of events, what each character knows, and plot progression.
Answer with only TRUE if they are consistent or FALSE if they are not."#
    )
}

/// Quality critique; the sentinel GOOD means no issues.
pub fn quality_prompt(story: &Story, content: &str) -> String {
    let setting = story
        .metadata
        .setting
        .iter()
        .map(|(place, description)| format!("{place}: {description}"))
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        r#"Review the quality of this story episode.

STORY TITLE: {title}
SETTING: {setting}
EPISODE: {content}

Check alignment with setting and tone, character consistency, engaging narrative, natural dialogue and descriptive quality.
If there are issues, describe them in 1-2 sentences. If there are none, respond with exactly GOOD."#,
        title = story.title(),
    )
}

/// Single-pass rewrite of one flagged episode.
pub fn refine_prompt(
    episode_number: u32,
    content: &str,
    before: &str,
    after: &str,
    feedback: &str,
) -> String {
    format!(
        r#"Refine episode {episode_number} while keeping narrative continuity with its neighbours.

{before}

CURRENT EPISODE (#{episode_number}): {content}

{after}

REFINEMENT INSTRUCTIONS: {feedback}

NON-NEGOTIABLE CONSTRAINTS. Do NOT change:
- the core events that happen in this episode
- where characters are or who is present
- key decisions or discoveries
- the timing of events relative to other episodes

Only writing style, emotional tone, descriptiveness and dialogue may change.
Reply with the refined episode prose only, with no preamble."#
    )
}

/// Short title over refined content.
pub fn title_prompt(content: &str) -> String {
    let excerpt: String = content.chars().take(TITLE_EXCERPT_CHARS).collect();
    format!(
        "Write a 2-6 word title for this story episode. Reply with the title only.\n\n{excerpt}..."
    )
}

/// Story metadata for a new story.
pub fn planning_prompt(idea: &str, num_episodes: u32, localize: bool) -> String {
    let phases = StoryPhase::iter()
        .map(|phase| format!("{phase}:\n{}", phase.description()))
        .collect::<Vec<_>>()
        .join("\n\n");
    let language = if localize {
        "\nWrite every field in Hinglish (e.g. \"Arjun ka dar\", not \"Arjun's fear\").\n"
    } else {
        ""
    };
    format!(
        r#"Plan a {num_episodes}-episode story from this idea.
<IDEA>
{idea}
</IDEA>
{language}
Extract with care:
- Title: expresses the feel and theme of the story.
- Settings: locations with vivid descriptions, as a map of place to description.
- Protagonist: main characters with motivation and fear.
- Characters: every character with a proper name, role, initial description, relationships and emotional state.
- Theme: the guiding theme.
- Story Outline: the phases in this order (Exposition, Inciting Incident, Rising Action, Dilemma, Climax, Denouement, Final Episode), merging phases if the story is short, dividing the {num_episodes} episodes among them for a smooth pace. Every episode from 1 to {num_episodes} must fall in exactly one segment.
- Special Instructions: tone and style notes.

Phase guidance:
<PHASES>
{phases}
</PHASES>

Output STRICTLY a valid JSON object with no additional text:
{{
  "Title": "string",
  "Settings": {{"Place": "Description"}},
  "Protagonist": [{{"Name": "string", "Motivation": "string", "Fear": "string"}}],
  "Characters": [{{"Name": "string", "Role": "string", "Description": "string", "Relationship": {{"Character_Name": "Relation"}}, "Emotional_State": "string"}}],
  "Theme": "string",
  "Story Outline": [{{"Ep 1-2": "Description", "Phase_name": "Exposition"}}],
  "Special Instructions": "string"
}}"#
    )
}

/// Spoiler-free teaser over episode summaries.
pub fn teaser_prompt(title: &str, summaries: &[String]) -> String {
    let numbered = summaries
        .iter()
        .enumerate()
        .map(|(i, summary)| format!("Episode {}: {}", i + 1, summary))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"Write a 150-200 word teaser for the story "{title}" from these episode summaries.
Hook the reader with the premise and the stakes without revealing the ending.

{numbered}

Reply with the teaser text only."#
    )
}
