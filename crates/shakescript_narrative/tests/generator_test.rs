//! Tests for episode generation and its parse fallbacks.

mod common;

use common::{Call, MockDriver, classify, default_reply, detached_story};
use shakescript_core::{EventTier, PriorEpisode};
use shakescript_narrative::{
    ContextAssembler, EpisodeGenerator, EpisodeRequest, FALLBACK_EMOTIONAL_STATE,
    InMemoryRelevanceIndex, PipelineConfig, SUMMARY_UNAVAILABLE,
};
use std::sync::Arc;

fn generator(driver: MockDriver) -> (Arc<MockDriver>, EpisodeGenerator) {
    let config = PipelineConfig::default();
    let driver = Arc::new(driver);
    let index = Arc::new(InMemoryRelevanceIndex::from_config(&config));
    let assembler = ContextAssembler::new(index, config.clone());
    let generator = EpisodeGenerator::new(driver.clone(), assembler, config);
    (driver, generator)
}

fn content_prompt(driver: &MockDriver) -> String {
    driver
        .prompts()
        .into_iter()
        .find(|p| matches!(classify(p), Call::Content(_)))
        .unwrap()
}

#[tokio::test]
async fn test_generates_canonical_draft() {
    let (driver, generator) = generator(MockDriver::scripted("TRUE", "GOOD"));
    let story = detached_story(4);

    let draft = generator
        .generate(EpisodeRequest::new(&story, 1, &[]))
        .await
        .unwrap();

    assert_eq!(draft.episode_number, 1);
    assert_eq!(draft.episode_title, "Title 1");
    assert!(draft.episode_content.starts_with("Draft prose for episode 1."));
    assert_eq!(draft.episode_summary, "Summary of episode 1.");
    assert_eq!(draft.episode_emotional_state, "tense");
    assert_eq!(draft.key_events.len(), 1);
    assert_eq!(draft.key_events[0].tier, EventTier::Foundational);
    assert_eq!(draft.characters_featured[0].name, "Asha");
    assert_eq!(draft.settings_delta["Harbor"], "Fog over the docks");
    assert_eq!(driver.calls(), vec![Call::Content(1), Call::Details(1)]);

    let prompt = content_prompt(&driver);
    assert!(prompt.contains("You are writing episode 1 of 4"));
    assert!(prompt.contains("First episode"));
    assert!(prompt.contains("CURRENT PHASE: Exposition"));
}

#[tokio::test]
async fn test_unparseable_details_degrade_to_placeholder() {
    let driver = MockDriver::new(|call, _| match call {
        Call::Details(_) => Ok("I'm sorry, I can't produce that format.".to_string()),
        other => default_reply(other),
    });
    let (_, generator) = generator(driver);
    let story = detached_story(2);

    let draft = generator
        .generate(EpisodeRequest::new(&story, 1, &[]))
        .await
        .unwrap();

    assert!(!draft.episode_content.is_empty());
    assert_eq!(draft.episode_summary, SUMMARY_UNAVAILABLE);
    assert_eq!(draft.episode_emotional_state, FALLBACK_EMOTIONAL_STATE);
    assert!(draft.key_events.is_empty());
    assert!(draft.characters_featured.is_empty());
}

#[tokio::test]
async fn test_prose_reply_becomes_content() {
    let driver = MockDriver::new(|call, _| match call {
        Call::Content(_) => Ok("Asha woke before dawn and ran to the docks.".to_string()),
        other => default_reply(other),
    });
    let (_, generator) = generator(driver);
    let story = detached_story(2);

    let draft = generator
        .generate(EpisodeRequest::new(&story, 2, &[]))
        .await
        .unwrap();

    assert_eq!(draft.episode_title, "Episode 2");
    assert_eq!(draft.episode_content, "Asha woke before dawn and ran to the docks.");
}

#[tokio::test]
async fn test_unreachable_model_is_an_error() {
    let driver = MockDriver::new(|call, _| match call {
        Call::Details(_) => Err("connection reset".to_string()),
        other => default_reply(other),
    });
    let (_, generator) = generator(driver);
    let story = detached_story(2);

    let err = generator
        .generate(EpisodeRequest::new(&story, 1, &[]))
        .await
        .unwrap_err();
    assert!(err.reason().contains("connection reset"));
    assert!(!err.is_bad_request());
}

#[tokio::test]
async fn test_localization_failure_keeps_original() {
    let driver = MockDriver::new(|call, _| match call {
        Call::Localization => Err("unavailable".to_string()),
        other => default_reply(other),
    });
    let (_, generator) = generator(driver);
    let story = detached_story(2);

    let draft = generator
        .generate(EpisodeRequest::new(&story, 1, &[]).localized(true))
        .await
        .unwrap();
    assert_eq!(draft.episode_title, "Title 1");
}

#[tokio::test]
async fn test_unparseable_localization_keeps_original() {
    let driver = MockDriver::new(|call, _| match call {
        Call::Localization => Ok("Sorry, I can only answer in English.".to_string()),
        other => default_reply(other),
    });
    let (driver, generator) = generator(driver);
    let story = detached_story(2);

    let draft = generator
        .generate(EpisodeRequest::new(&story, 1, &[]).localized(true))
        .await
        .unwrap();
    assert!(draft.episode_content.starts_with("Draft prose for episode 1."));
    assert_eq!(
        driver.calls(),
        vec![Call::Content(1), Call::Localization, Call::Details(1)]
    );
}

#[tokio::test]
async fn test_feedback_is_a_hard_constraint() {
    let (driver, generator) = generator(MockDriver::scripted("TRUE", "GOOD"));
    let story = detached_story(2);

    generator
        .generate(EpisodeRequest::new(&story, 1, &[]).with_feedback(Some("Open on the ferry")))
        .await
        .unwrap();

    let prompt = content_prompt(&driver);
    assert!(prompt.contains("HARD CONSTRAINT"));
    assert!(prompt.contains("Open on the ferry"));
}

#[tokio::test]
async fn test_prior_episodes_feed_the_prompt() {
    let (driver, generator) = generator(MockDriver::scripted("TRUE", "GOOD"));
    let story = detached_story(4);
    let prior = vec![PriorEpisode {
        episode_number: 2,
        title: "The Letter".to_string(),
        content: "Asha reads the letter twice.".to_string(),
    }];

    generator
        .generate(EpisodeRequest::new(&story, 3, &prior))
        .await
        .unwrap();

    let prompt = content_prompt(&driver);
    assert!(prompt.contains("TITLE: The Letter"));
    assert!(prompt.contains("Asha reads the letter twice."));
    assert!(prompt.contains("CURRENT PHASE: Inciting Incident"));
}
