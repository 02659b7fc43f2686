//! Tiered parsing of model output.
//!
//! Model responses are unreliable: JSON may be fenced, wrapped in prose,
//! truncated, or absent. Each parser here is an ordered chain of attempts
//! ending in a placeholder, so a bad response degrades the record instead
//! of failing the pipeline.

use regex::Regex;
use serde::de::DeserializeOwned;
use shakescript_core::{EpisodeDraft, KeyEvent};
use shakescript_error::{JsonError, ShakescriptResult};

/// Marker written into the summary when extraction failed.
pub const SUMMARY_UNAVAILABLE: &str = "[parse failure] Summary unavailable for this episode.";

/// Emotional state used when extraction failed.
pub const FALLBACK_EMOTIONAL_STATE: &str = "neutral";

/// Which attempt in a parser chain produced the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ParseTier {
    /// The whole response was valid JSON
    Direct,
    /// JSON inside a markdown code fence
    Fenced,
    /// A JSON object embedded in surrounding text
    Embedded,
    /// Individual known fields pulled out by pattern
    Fields,
    /// Nothing parsed; synthesized record
    Placeholder,
}

type Attempt<T> = Box<dyn Fn(&str) -> Option<T> + Send + Sync>;

/// Ordered list of fallible parsers.
///
/// # Examples
///
/// ```
/// use shakescript_narrative::{ParseTier, ParserChain};
///
/// let chain = ParserChain::new()
///     .then(ParseTier::Direct, |text| text.trim().parse::<u32>().ok());
/// assert_eq!(chain.run(" 42 "), Some((42, ParseTier::Direct)));
/// assert_eq!(chain.run_or("forty-two", || 0), (0, ParseTier::Placeholder));
/// ```
pub struct ParserChain<T> {
    attempts: Vec<(ParseTier, Attempt<T>)>,
}

impl<T> Default for ParserChain<T> {
    fn default() -> Self {
        Self {
            attempts: Vec::new(),
        }
    }
}

impl<T> ParserChain<T> {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attempt.
    pub fn then<F>(mut self, tier: ParseTier, attempt: F) -> Self
    where
        F: Fn(&str) -> Option<T> + Send + Sync + 'static,
    {
        self.attempts.push((tier, Box::new(attempt)));
        self
    }

    /// First successful attempt, if any.
    pub fn run(&self, text: &str) -> Option<(T, ParseTier)> {
        for (tier, attempt) in &self.attempts {
            if let Some(value) = attempt(text) {
                tracing::debug!(tier = %tier, "Parsed model output");
                return Some((value, *tier));
            }
        }
        None
    }

    /// First successful attempt, or the placeholder.
    pub fn run_or(&self, text: &str, placeholder: impl FnOnce() -> T) -> (T, ParseTier) {
        self.run(text).unwrap_or_else(|| {
            tracing::warn!(
                response_length = text.len(),
                "No parser matched model output, using placeholder"
            );
            (placeholder(), ParseTier::Placeholder)
        })
    }
}

impl<T: DeserializeOwned + 'static> ParserChain<T> {
    /// Direct, fenced and embedded JSON attempts.
    ///
    /// `required_keys` locate the embedded object; `accept` rejects
    /// values that decoded but carry nothing usable.
    pub fn json(required_keys: &'static [&'static str], accept: fn(&T) -> bool) -> Self {
        Self::new()
            .then(ParseTier::Direct, move |text| decode(text.trim(), accept))
            .then(ParseTier::Fenced, move |text| {
                extract_from_code_block(text).and_then(|block| decode(&block, accept))
            })
            .then(ParseTier::Embedded, move |text| {
                embedded_objects(text, required_keys)
                    .into_iter()
                    .find_map(|object| decode(&object, accept))
            })
    }
}

fn decode<T: DeserializeOwned>(candidate: &str, accept: fn(&T) -> bool) -> Option<T> {
    let value = serde_json::from_str::<T>(candidate)
        .ok()
        .or_else(|| serde_json::from_str::<T>(&repair_json(candidate)).ok())?;
    accept(&value).then_some(value)
}

/// Extract content from a markdown code block.
///
/// A missing closing fence (truncated response) yields everything after
/// the opening fence.
pub fn extract_from_code_block(response: &str) -> Option<String> {
    let start = response.find("```")?;
    let content_start = start + 3;
    // Skip to next newline (in case there's a language specifier)
    let skip_to = response[content_start..]
        .find('\n')
        .map(|n| content_start + n + 1)
        .unwrap_or(content_start);

    match response[skip_to..].find("```") {
        Some(end) => Some(response[skip_to..skip_to + end].trim().to_string()),
        None => Some(response[skip_to..].trim().to_string()),
    }
}

/// Extract content between balanced delimiters, honouring JSON strings.
fn extract_balanced(response: &str, open: char, close: char) -> Option<String> {
    let start = response.find(open)?;
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(response[start..start + i + 1].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

/// Objects that open with one of the expected keys, outermost first.
fn embedded_objects(text: &str, keys: &[&str]) -> Vec<String> {
    let mut objects = Vec::new();
    if let Some(first) = extract_balanced(text, '{', '}')
        && keys.iter().any(|key| first.contains(&format!("\"{key}\"")))
    {
        objects.push(first);
    }

    let alternatives = keys
        .iter()
        .map(|key| regex::escape(key))
        .collect::<Vec<_>>()
        .join("|");
    let Ok(pattern) = Regex::new(&format!(r#"\{{\s*"(?:{alternatives})""#)) else {
        return objects;
    };
    for found in pattern.find_iter(text) {
        if let Some(object) = extract_balanced(&text[found.start()..], '{', '}')
            && !objects.contains(&object)
        {
            objects.push(object);
        }
    }
    objects
}

/// Patch the common ways models break JSON.
///
/// Smart quotes become ASCII, raw control characters inside strings are
/// escaped, trailing commas are dropped, and single-quoted JSON with no
/// double quotes at all is requoted.
pub fn repair_json(raw: &str) -> String {
    let mut text: String = raw
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    if !text.contains('"') && text.contains('\'') {
        text = text.replace('\'', "\"");
    }

    let mut repaired = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escape_next = false;
    for ch in text.chars() {
        if escape_next {
            escape_next = false;
            repaired.push(ch);
            continue;
        }
        match ch {
            '\\' => {
                escape_next = true;
                repaired.push(ch);
            }
            '"' => {
                in_string = !in_string;
                repaired.push(ch);
            }
            '\n' if in_string => repaired.push_str("\\n"),
            '\t' if in_string => repaired.push_str("\\t"),
            '\r' if in_string => {}
            c if c.is_control() && !matches!(c, '\n' | '\t' | '\r') => {}
            c => repaired.push(c),
        }
    }

    match Regex::new(r",\s*([}\]])") {
        Ok(trailing) => trailing.replace_all(&repaired, "$1").into_owned(),
        Err(_) => repaired,
    }
}

/// Drop code fences and surrounding whitespace.
pub fn clean_model_text(text: &str) -> String {
    if text.contains("```")
        && let Some(block) = extract_from_code_block(text)
    {
        return block;
    }
    text.trim().to_string()
}

/// Pull a string field by name, tolerating a missing closing quote.
fn string_field(text: &str, key: &str) -> Option<String> {
    let pattern = format!(r#"(?s)"{}"\s*:\s*"((?:[^"\\]|\\.)*)"#, regex::escape(key));
    let captures = Regex::new(&pattern).ok()?.captures(text)?;
    // an unterminated value runs on into the object's closing brace
    let raw = captures
        .get(1)?
        .as_str()
        .trim_end_matches(|c: char| c == '}' || c.is_whitespace());
    let value = serde_json::from_str::<String>(&format!("\"{raw}\""))
        .unwrap_or_else(|_| raw.replace("\\n", "\n").replace("\\\"", "\""));
    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Title and prose from the content call.
///
/// Never fails: if no tier yields content, the cleaned response text is
/// treated as the prose. An empty result is left for the caller to reject.
pub fn parse_episode_body(text: &str, episode_number: u32) -> (EpisodeDraft, ParseTier) {
    let chain = ParserChain::<EpisodeDraft>::json(&["episode_title", "episode_content"], |d| {
        !d.episode_content.trim().is_empty()
    })
    .then(ParseTier::Fields, |text| {
        let content = string_field(text, "episode_content")?;
        let mut draft = EpisodeDraft::new(0);
        draft.episode_title = string_field(text, "episode_title").unwrap_or_default();
        draft.episode_content = content;
        Some(draft)
    });

    let (mut draft, tier) = chain.run_or(text, || {
        let mut draft = EpisodeDraft::new(episode_number);
        let cleaned = clean_model_text(text);
        // structured reply with nothing usable in it: no prose
        if !cleaned.contains("\"episode_content\"") {
            draft.episode_content = cleaned;
        }
        draft
    });
    draft.episode_number = episode_number;
    draft.episode_title = draft.episode_title.trim().to_string();
    draft.episode_content = draft.episode_content.trim().to_string();
    if draft.episode_title.is_empty() {
        draft.episode_title = format!("Episode {episode_number}");
    }
    (draft, tier)
}

/// Summary, tagged events, character and setting deltas from the
/// extraction call.
///
/// On total failure the record carries [`SUMMARY_UNAVAILABLE`], a neutral
/// emotional state and no key events.
pub fn parse_episode_details(text: &str, episode_number: u32) -> (EpisodeDraft, ParseTier) {
    let chain = ParserChain::<EpisodeDraft>::json(
        &["episode_summary", "Key Events", "characters_featured"],
        |d| {
            !d.episode_summary.trim().is_empty()
                || !d.key_events.is_empty()
                || !d.characters_featured.is_empty()
        },
    )
    .then(ParseTier::Fields, |text| {
        let summary = string_field(text, "episode_summary")?;
        let mut draft = EpisodeDraft::new(0);
        draft.episode_summary = summary;
        draft.episode_emotional_state =
            string_field(text, "episode_emotional_state").unwrap_or_default();
        draft.key_events = key_event_field(text).unwrap_or_default();
        Some(draft)
    });

    let (mut draft, tier) = chain.run_or(text, || {
        let mut draft = EpisodeDraft::new(episode_number);
        draft.episode_summary = SUMMARY_UNAVAILABLE.to_string();
        draft
    });
    draft.episode_number = episode_number;
    if draft.episode_summary.trim().is_empty() {
        draft.episode_summary = SUMMARY_UNAVAILABLE.to_string();
    }
    if draft.episode_emotional_state.trim().is_empty() {
        draft.episode_emotional_state = FALLBACK_EMOTIONAL_STATE.to_string();
    }
    (draft, tier)
}

fn key_event_field(text: &str) -> Option<Vec<KeyEvent>> {
    let pattern = Regex::new(r#"(?s)"(?:Key Events|key_events)"\s*:\s*"#).ok()?;
    let found = pattern.find(text)?;
    let list = extract_balanced(&text[found.end()..], '[', ']')?;
    let values: Vec<serde_json::Value> = serde_json::from_str(&repair_json(&list)).ok()?;
    Some(
        values
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect(),
    )
}

/// Parse a structured response, failing with a JSON error when no tier
/// matches.
///
/// # Examples
///
/// ```
/// use shakescript_narrative::parse_structured;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Plan {
///     title: String,
/// }
///
/// let plan: Plan = parse_structured("Sure!\n{\"title\": \"Monsoon\"}", &["title"]).unwrap();
/// assert_eq!(plan.title, "Monsoon");
/// ```
pub fn parse_structured<T>(text: &str, required_keys: &'static [&'static str]) -> ShakescriptResult<T>
where
    T: DeserializeOwned + 'static,
{
    ParserChain::<T>::json(required_keys, |_| true)
        .run(text)
        .map(|(value, _)| value)
        .ok_or_else(|| {
            let preview: String = text.chars().take(100).collect();
            tracing::error!(json_preview = %preview, "Structured response could not be parsed");
            JsonError::new(format!(
                "Failed to parse structured model response (length: {})",
                text.len()
            ))
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakescript_core::EventTier;

    #[test]
    fn direct_json_body() {
        let (draft, tier) = parse_episode_body(
            r#"{"episode_title": "Rain", "episode_content": "It rained."}"#,
            3,
        );
        assert_eq!(tier, ParseTier::Direct);
        assert_eq!(draft.episode_number, 3);
        assert_eq!(draft.episode_title, "Rain");
    }

    #[test]
    fn fenced_json_body() {
        let text = "Here you go:\n```json\n{\"episode_title\": \"Rain\", \"episode_content\": \"It rained.\"}\n```";
        let (draft, tier) = parse_episode_body(text, 1);
        assert_eq!(tier, ParseTier::Fenced);
        assert_eq!(draft.episode_content, "It rained.");
    }

    #[test]
    fn embedded_json_with_raw_newlines() {
        let text = "Sure. {\"episode_title\": \"Rain\", \"episode_content\": \"Line one.\nLine two.\",} Enjoy!";
        let (draft, tier) = parse_episode_body(text, 1);
        assert_eq!(tier, ParseTier::Embedded);
        assert_eq!(draft.episode_content, "Line one.\nLine two.");
    }

    #[test]
    fn truncated_body_falls_to_fields() {
        let text = r#"{"episode_title": "Rain", "episode_content": "It rained all night and"#;
        let (draft, tier) = parse_episode_body(text, 2);
        assert_eq!(tier, ParseTier::Fields);
        assert_eq!(draft.episode_title, "Rain");
        assert_eq!(draft.episode_content, "It rained all night and");
    }

    #[test]
    fn truncated_body_keeps_closing_dialogue_quote() {
        let text = r#"{"episode_title": "Rain", "episode_content": "He said \"Go!\"}"#;
        let (draft, tier) = parse_episode_body(text, 2);
        assert_eq!(tier, ParseTier::Fields);
        assert_eq!(draft.episode_content, "He said \"Go!\"");
    }

    #[test]
    fn prose_body_becomes_placeholder_content() {
        let (draft, tier) = parse_episode_body("The river rose.", 4);
        assert_eq!(tier, ParseTier::Placeholder);
        assert_eq!(draft.episode_title, "Episode 4");
        assert_eq!(draft.episode_content, "The river rose.");
    }

    #[test]
    fn structured_reply_without_prose_is_empty() {
        let (draft, tier) =
            parse_episode_body(r#"{"episode_title": "Rain", "episode_content": ""}"#, 2);
        assert_eq!(tier, ParseTier::Placeholder);
        assert!(draft.episode_content.is_empty());
    }

    #[test]
    fn garbage_details_yield_placeholder() {
        let (draft, tier) = parse_episode_details("%%% not json at all", 5);
        assert_eq!(tier, ParseTier::Placeholder);
        assert_eq!(draft.episode_summary, SUMMARY_UNAVAILABLE);
        assert_eq!(draft.episode_emotional_state, FALLBACK_EMOTIONAL_STATE);
        assert!(draft.key_events.is_empty());
    }

    #[test]
    fn details_fields_tier_reads_events() {
        let text = r#"{"episode_summary": "Asha flees.", "episode_emotional_state": "tense", "Key Events": [{"event": "Asha flees", "tier": "foundational"}], "characters_featured": [ {"Name": "Asha", "#;
        let (draft, tier) = parse_episode_details(text, 1);
        assert_eq!(tier, ParseTier::Fields);
        assert_eq!(draft.episode_summary, "Asha flees.");
        assert_eq!(draft.key_events.len(), 1);
        assert_eq!(draft.key_events[0].tier, EventTier::Foundational);
    }

    #[test]
    fn repair_handles_smart_quotes_and_trailing_commas() {
        let repaired = repair_json("{\u{201c}a\u{201d}: [1, 2,],}");
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["a"][1], 2);
    }

    #[test]
    fn structured_parse_failure_is_an_error() {
        let result: ShakescriptResult<serde_json::Value> = parse_structured("no json", &["title"]);
        assert!(result.is_err());
    }
}
