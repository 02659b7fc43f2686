//! Shared fixtures: a prompt-routed mock driver and story builders.

#![allow(dead_code)]

use async_trait::async_trait;
use shakescript_core::{
    Character, GenerateRequest, GenerateResponse, OutlineSegment, StoryId, StoryMetadata,
};
use shakescript_error::{BackendError, ShakescriptResult};
use shakescript_interface::{ShakescriptDriver, StoryRepository};
use shakescript_narrative::{
    InMemoryRelevanceIndex, InMemoryStoryRepository, PipelineConfig, StoryService,
};
use std::sync::{Arc, Mutex};

/// Which pipeline call a prompt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Content(u32),
    Details(u32),
    Localization,
    Continuity,
    Quality,
    Refine(u32),
    Title,
    Planning,
    Teaser,
    Unknown,
}

fn number_after(prompt: &str, marker: &str) -> u32 {
    prompt
        .find(marker)
        .map(|i| &prompt[i + marker.len()..])
        .and_then(|rest| {
            rest.split(|c: char| !c.is_ascii_digit())
                .next()
                .and_then(|n| n.parse().ok())
        })
        .unwrap_or(0)
}

pub fn classify(prompt: &str) -> Call {
    if prompt.starts_with("You are writing episode ") {
        Call::Content(number_after(prompt, "You are writing episode "))
    } else if prompt.starts_with("Extract structured details from episode ") {
        Call::Details(number_after(prompt, "Extract structured details from episode "))
    } else if prompt.starts_with("Rewrite the following episode in Hinglish") {
        Call::Localization
    } else if prompt.contains("Answer with only TRUE") {
        Call::Continuity
    } else if prompt.starts_with("Review the quality") {
        Call::Quality
    } else if prompt.starts_with("Refine episode ") {
        Call::Refine(number_after(prompt, "Refine episode "))
    } else if prompt.starts_with("Write a 2-6 word title") {
        Call::Title
    } else if prompt.starts_with("Plan a ") {
        Call::Planning
    } else if prompt.starts_with("Write a 150-200 word teaser") {
        Call::Teaser
    } else {
        Call::Unknown
    }
}

type Responder = dyn Fn(Call, &str) -> Result<String, String> + Send + Sync;

/// Driver that answers from a closure and records every prompt.
pub struct MockDriver {
    responder: Box<Responder>,
    calls: Mutex<Vec<String>>,
}

impl MockDriver {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(Call, &str) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Well-formed answers everywhere; continuity and quality replies given.
    pub fn scripted(continuity: &'static str, quality: &'static str) -> Self {
        Self::new(move |call, _| match call {
            Call::Continuity => Ok(continuity.to_string()),
            Call::Quality => Ok(quality.to_string()),
            other => default_reply(other),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.prompts().iter().map(|p| classify(p)).collect()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(c)).count()
    }
}

pub fn content_reply(episode: u32) -> String {
    format!(
        r#"{{"episode_title": "Title {episode}", "episode_content": "Draft prose for episode {episode}. Asha walks to the harbor. Ravi waits."}}"#
    )
}

pub fn details_reply(episode: u32) -> String {
    format!(
        r#"```json
{{
  "episode_summary": "Summary of episode {episode}.",
  "episode_emotional_state": "tense",
  "characters_featured": [{{"Name": "Asha", "Emotional_State": "mood {episode}"}}],
  "Key Events": [{{"event": "Event {episode}", "tier": "foundational"}}],
  "Settings": {{"Harbor": "Fog over the docks"}}
}}
```"#
    )
}

pub const PLAN_REPLY: &str = r#"Here is the plan:
{
  "Title": "Monsoon Letters",
  "Settings": {"Harbor": "A busy harbor town"},
  "Protagonist": [{"Name": "Asha", "Motivation": "Find her brother", "Fear": "The sea"}],
  "Characters": [
    {"Name": "Asha", "Role": "Protagonist", "Description": "A clerk", "Relationship": {"Ravi": "Brother"}, "Emotional_State": "hopeful"},
    {"Name": "Ravi", "Role": "Brother", "Description": "A sailor", "Emotional_State": "lost"}
  ],
  "Theme": "Family",
  "Story Outline": [
    {"Ep 1-2": "Asha finds a letter", "Phase_name": "Exposition"},
    {"Ep 3-4": "The search begins", "Phase_name": "Inciting Incident"}
  ],
  "Special Instructions": "Warm and suspenseful"
}"#;

pub fn default_reply(call: Call) -> Result<String, String> {
    Ok(match call {
        Call::Content(n) => content_reply(n),
        Call::Details(n) => details_reply(n),
        Call::Localization => {
            r#"{"episode_title": "Hinglish Title", "episode_content": "Asha harbor ki taraf chali."}"#
                .to_string()
        }
        Call::Continuity => "TRUE".to_string(),
        Call::Quality => "GOOD".to_string(),
        Call::Refine(n) => format!("Refined prose for episode {n}."),
        Call::Title => "\"A New Dawn\"".to_string(),
        Call::Planning => PLAN_REPLY.to_string(),
        Call::Teaser => "A letter arrives and a sister goes searching.".to_string(),
        Call::Unknown => return Err("unrecognised prompt".to_string()),
    })
}

#[async_trait]
impl ShakescriptDriver for MockDriver {
    async fn generate(&self, req: &GenerateRequest) -> ShakescriptResult<GenerateResponse> {
        let prompt = req.prompt();
        self.calls.lock().unwrap().push(prompt.clone());
        (self.responder)(classify(&prompt), &prompt)
            .map(GenerateResponse::new)
            .map_err(|message| BackendError::new(message).into())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

pub fn metadata() -> StoryMetadata {
    let mut asha = Character::named("Asha");
    asha.role = "Protagonist".to_string();
    StoryMetadata {
        title: "Monsoon Letters".to_string(),
        characters: vec![asha, Character::named("Ravi")],
        story_outline: vec![
            OutlineSegment::new("Ep 1-2", "Asha finds a letter", "Exposition"),
            OutlineSegment::new("Ep 3-4", "The search begins", "Inciting Incident"),
        ],
        ..Default::default()
    }
}

/// Service over in-memory collaborators.
pub struct Harness {
    pub driver: Arc<MockDriver>,
    pub repository: Arc<InMemoryStoryRepository>,
    pub index: Arc<InMemoryRelevanceIndex>,
    pub service: StoryService,
}

impl Harness {
    pub fn new(driver: MockDriver) -> Self {
        Self::with_config(driver, PipelineConfig::default())
    }

    pub fn with_config(driver: MockDriver, config: PipelineConfig) -> Self {
        let driver = Arc::new(driver);
        let repository = Arc::new(InMemoryStoryRepository::new());
        let index = Arc::new(InMemoryRelevanceIndex::from_config(&config));
        let service = StoryService::new(
            driver.clone(),
            repository.clone(),
            index.clone(),
            config,
        );
        Self {
            driver,
            repository,
            index,
            service,
        }
    }

    pub async fn story(&self, num_episodes: u32) -> StoryId {
        self.repository
            .create_story("A sister searches for her brother", &metadata(), num_episodes, false)
            .await
            .unwrap()
    }

    /// Cursor must sit right after the highest finalized episode.
    pub async fn assert_cursor_consistent(&self, story_id: StoryId) {
        let story = self.service.story(story_id).await.unwrap();
        let episodes = self.service.episodes(story_id).await.unwrap();
        let highest = episodes.iter().map(|e| e.episode_number).max().unwrap_or(0);
        assert_eq!(story.state.current_episode, highest + 1);
        assert!(story.state.current_episode <= story.num_episodes + 1);
    }
}

/// A story value that never touched a repository.
pub fn detached_story(num_episodes: u32) -> shakescript_core::Story {
    shakescript_core::Story::new(1, "A sister searches for her brother", metadata(), num_episodes, false)
}

pub fn draft(episode_number: u32, content: &str) -> shakescript_core::EpisodeDraft {
    let mut draft = shakescript_core::EpisodeDraft::new(episode_number);
    draft.episode_title = format!("Title {episode_number}");
    draft.episode_content = content.to_string();
    draft
}
