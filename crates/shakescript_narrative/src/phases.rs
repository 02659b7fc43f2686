//! Narrative phases and the writing guidance attached to each.

use strum::IntoEnumIterator;

/// A named arc segment of the story outline.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::AsRefStr,
)]
pub enum StoryPhase {
    /// Normal world, protagonist introduced
    Exposition,
    /// The status quo breaks
    #[strum(serialize = "Inciting Incident")]
    IncitingIncident,
    /// Obstacles escalate
    #[strum(serialize = "Rising Action")]
    RisingAction,
    /// A choice with no easy answer
    Dilemma,
    /// Decisive confrontation
    Climax,
    /// Consequences and closure
    Denouement,
    /// Settling the world for good
    #[strum(serialize = "Final Episode")]
    FinalEpisode,
}

impl StoryPhase {
    /// In-phase writing guidance.
    pub fn description(self) -> &'static str {
        match self {
            StoryPhase::Exposition => {
                "- Set the scene with vivid sensory details (sight, sound, smell) and atmosphere.\n\
                 - Introduce the protagonist via actions and thoughts, showing their normal world and backstory.\n\
                 - Highlight strengths, flaws, and routines through interactions.\n\
                 - Subtly hint at tensions or themes to come."
            }
            StoryPhase::IncitingIncident => {
                "- Disrupt the status quo with a mysterious, tense, or unexpected event.\n\
                 - Hook with a moment demanding the protagonist's response.\n\
                 - Plant seeds of the central conflict without full reveal."
            }
            StoryPhase::RisingAction => {
                "- Escalate obstacles testing the protagonist's values and skills.\n\
                 - Deepen character bonds or conflicts through shared challenges.\n\
                 - Reveal backstory and complications for characters.\n\
                 - Build tension with pacing and a mini-cliffhanger raising stakes."
            }
            StoryPhase::Dilemma => {
                "- Present a multi-layered obstacle (emotional, moral, physical) with no easy solution.\n\
                 - Force a pivotal choice revealing the protagonist's core beliefs.\n\
                 - Heighten stakes with conflicting goals and mutual reliance.\n\
                 - End with urgency pushing toward a critical decision."
            }
            StoryPhase::Climax => {
                "- Peak tension as conflicts collide in a decisive confrontation.\n\
                 - Force the protagonist to face the central challenge or antagonist.\n\
                 - Reveal a final twist or surprise recontextualizing the struggle.\n\
                 - Start the final struggle."
            }
            StoryPhase::Denouement => {
                "- Resolve all conflicts with emotional and narrative closure.\n\
                 - Properly end the final struggle.\n\
                 - Show consequences of the climax for characters and world.\n\
                 - Reflect growth and themes via dialogue, imagery, or realization."
            }
            StoryPhase::FinalEpisode => {
                "- Conclude the journey with a definitive settling of the world and characters' lives.\n\
                 - Depict the protagonist actively shaping their future, cementing their growth.\n\
                 - End with a poignant, grounded moment that echoes the story's heart and leaves no ambiguity."
            }
        }
    }

    /// Every phase whose name appears in `label`, case-insensitively.
    ///
    /// Planners sometimes merge phases into one label ("Climax/Denouement").
    pub fn matching(label: &str) -> Vec<StoryPhase> {
        let label = label.to_lowercase();
        StoryPhase::iter()
            .filter(|phase| label.contains(&phase.as_ref().to_lowercase()))
            .collect()
    }

    /// The phase that follows this one.
    pub fn successor(self) -> Option<StoryPhase> {
        StoryPhase::iter().skip_while(|p| *p != self).nth(1)
    }
}

/// Guidance for the last episode of a phase, bridging into the next.
pub fn transition_guide(from: StoryPhase, to: StoryPhase) -> Option<&'static str> {
    use StoryPhase::*;
    let guide = match (from, to) {
        (Exposition, IncitingIncident) => {
            "- Bridge the normal world to the inciting event with subtle foreshadowing.\n\
             - Show the protagonist's routine or worldview just before disruption.\n\
             - Create contrast between the before and after states.\n\
             - Use sensory details that hint at the coming change."
        }
        (IncitingIncident, RisingAction) => {
            "- Show the protagonist's immediate emotional reaction to the inciting event.\n\
             - Illustrate their decision to engage with the new situation.\n\
             - Introduce secondary characters who will aid or hinder progress.\n\
             - Begin complicating the initial problem with new obstacles."
        }
        (RisingAction, Dilemma) => {
            "- Escalate stakes to force a critical decision point.\n\
             - Create a situation where the protagonist's old methods fail.\n\
             - Bring conflicting values or goals into direct opposition.\n\
             - Reveal new information that changes the protagonist's understanding."
        }
        (Dilemma, Climax) => {
            "- Show the resolution of the dilemma through a meaningful choice.\n\
             - Accelerate pacing with shorter sentences and immediate action.\n\
             - Bring key characters into direct confrontation.\n\
             - Create a point of no return that commits to resolution."
        }
        (Climax, Denouement) => {
            "- Show immediate aftermath and emotional impact of the climax.\n\
             - Begin resolving secondary conflicts and character arcs.\n\
             - Reflect on how the protagonist has changed from beginning to end.\n\
             - Create symmetry with the opening through mirrored imagery or situations."
        }
        (Denouement, FinalEpisode) => FinalEpisode.description(),
        _ => return None,
    };
    Some(guide)
}

/// In-phase guidance for an outline label, possibly naming several phases.
pub fn phase_description(label: &str) -> String {
    StoryPhase::matching(label)
        .into_iter()
        .map(StoryPhase::description)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Transition guidance between two outline labels.
///
/// Uses the last phase named in `from` and the first named in `to`.
pub fn transition_between(from: &str, to: &str) -> Option<&'static str> {
    let from = StoryPhase::matching(from).into_iter().last()?;
    let to = StoryPhase::matching(to).into_iter().next()?;
    transition_guide(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_labels_match_each_phase() {
        assert_eq!(
            StoryPhase::matching("Climax/Denouement"),
            vec![StoryPhase::Climax, StoryPhase::Denouement]
        );
        assert!(StoryPhase::matching("Prologue").is_empty());
    }

    #[test]
    fn only_adjacent_phases_have_transitions() {
        assert!(transition_between("rising action", "Dilemma").is_some());
        assert!(transition_between("Exposition", "Climax").is_none());
        assert_eq!(StoryPhase::Denouement.successor(), Some(StoryPhase::FinalEpisode));
        assert_eq!(StoryPhase::FinalEpisode.successor(), None);
    }

    #[test]
    fn unknown_label_has_no_description() {
        assert!(phase_description("Interlude").is_empty());
        assert!(phase_description("Exposition").contains("sensory"));
    }
}
