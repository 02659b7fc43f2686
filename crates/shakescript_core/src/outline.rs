//! Story outline segments.
//!
//! The planner emits each segment as a one-entry object keyed by the
//! episode label plus a `Phase_name` entry:
//!
//! ```json
//! {"Ep 3-5": "The rival arrives", "Phase_name": "Rising Action"}
//! ```

use crate::lenient::value_to_text;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const PHASE_KEY: &str = "Phase_name";

/// One arc segment of the story outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct OutlineSegment {
    /// Episode label such as `Ep 5` or `Ep 5-9`
    pub label: String,
    /// What happens in this segment
    pub description: String,
    /// Phase label such as `Rising Action`
    pub phase_name: String,
}

impl OutlineSegment {
    /// Create a segment.
    pub fn new(
        label: impl Into<String>,
        description: impl Into<String>,
        phase_name: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            phase_name: phase_name.into(),
        }
    }

    /// Inclusive episode range named by the label.
    ///
    /// # Examples
    ///
    /// ```
    /// use shakescript_core::OutlineSegment;
    ///
    /// assert_eq!(OutlineSegment::new("Ep 5", "", "").episode_range(), Some((5, 5)));
    /// assert_eq!(OutlineSegment::new("Ep 5-9", "", "").episode_range(), Some((5, 9)));
    /// assert_eq!(OutlineSegment::new("Finale", "", "").episode_range(), None);
    /// ```
    pub fn episode_range(&self) -> Option<(u32, u32)> {
        let numbers = self
            .label
            .trim()
            .trim_start_matches(|c: char| c.is_alphabetic() || c == '.')
            .trim();
        let mut bounds = numbers.splitn(2, '-').map(str::trim);
        let start: u32 = bounds.next()?.parse().ok()?;
        let end: u32 = match bounds.next() {
            Some(end) => end.parse().ok()?,
            None => start,
        };
        (start <= end).then_some((start, end))
    }

    /// Whether `episode` falls inside this segment's range.
    pub fn contains(&self, episode: u32) -> bool {
        self.episode_range()
            .is_some_and(|(start, end)| (start..=end).contains(&episode))
    }
}

impl TryFrom<Map<String, Value>> for OutlineSegment {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut phase_name = String::new();
        let mut entry = None;
        for (key, value) in &map {
            if key.eq_ignore_ascii_case(PHASE_KEY) {
                phase_name = value_to_text(value);
            } else if entry.is_none() {
                entry = Some((key.clone(), value_to_text(value)));
            }
        }
        let (label, description) =
            entry.ok_or_else(|| "outline segment has no episode label".to_string())?;
        Ok(Self {
            label,
            description,
            phase_name,
        })
    }
}

impl From<OutlineSegment> for Map<String, Value> {
    fn from(segment: OutlineSegment) -> Self {
        let mut map = Map::new();
        map.insert(segment.label, Value::String(segment.description));
        map.insert(PHASE_KEY.to_string(), Value::String(segment.phase_name));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_planner_shape() {
        let segment: OutlineSegment =
            serde_json::from_str(r#"{"Ep 3-5": "The rival arrives", "Phase_name": "Rising Action"}"#)
                .unwrap();
        assert_eq!(segment.label, "Ep 3-5");
        assert_eq!(segment.description, "The rival arrives");
        assert_eq!(segment.phase_name, "Rising Action");
        assert!(segment.contains(4));
        assert!(!segment.contains(6));
    }

    #[test]
    fn rejects_segment_without_label() {
        let parsed: Result<OutlineSegment, _> =
            serde_json::from_str(r#"{"Phase_name": "Climax"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn tolerates_spacing_and_long_prefix() {
        assert_eq!(
            OutlineSegment::new("Episode 2 - 4", "", "").episode_range(),
            Some((2, 4))
        );
        assert_eq!(OutlineSegment::new("Ep. 7", "", "").episode_range(), Some((7, 7)));
        assert_eq!(OutlineSegment::new("Ep 9-3", "", "").episode_range(), None);
    }
}
