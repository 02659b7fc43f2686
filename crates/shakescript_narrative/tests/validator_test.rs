//! Tests for continuity and quality validation.

mod common;

use common::{Call, MockDriver, default_reply, detached_story, draft};
use shakescript_core::{Feedback, PriorEpisode};
use shakescript_narrative::{
    BatchValidator, CONTINUITY_FEEDBACK, PipelineConfig, TIMELINE_FEEDBACK, ValidationOutcome,
};
use std::sync::Arc;

fn prior(episode_number: u32, content: &str) -> PriorEpisode {
    PriorEpisode {
        episode_number,
        title: format!("Title {episode_number}"),
        content: content.to_string(),
    }
}

fn validator(driver: MockDriver) -> (Arc<MockDriver>, BatchValidator) {
    let driver = Arc::new(driver);
    let validator = BatchValidator::new(driver.clone(), PipelineConfig::default());
    (driver, validator)
}

#[tokio::test]
async fn test_consistent_batch_passes() {
    let (driver, validator) = validator(MockDriver::scripted("TRUE", "GOOD"));
    let story = detached_story(4);
    let batch = vec![draft(3, "Three"), draft(4, "Four")];

    let outcome = validator
        .validate(&story, &batch, &[prior(2, "Two")])
        .await;

    assert!(outcome.is_success());
    assert!(outcome.feedback().is_empty());
    assert_eq!(driver.count(|c| *c == Call::Continuity), 2);
    assert_eq!(driver.count(|c| *c == Call::Quality), 2);
}

#[tokio::test]
async fn test_first_batch_skips_opening_continuity() {
    let (driver, validator) = validator(MockDriver::scripted("TRUE", "GOOD"));
    let story = detached_story(2);
    let batch = vec![draft(1, "One")];

    assert!(validator.validate(&story, &batch, &[]).await.is_success());
    assert_eq!(driver.count(|c| *c == Call::Continuity), 0);
}

#[tokio::test]
async fn test_continuity_fails_closed() {
    let (_, validator) = validator(MockDriver::scripted("Maybe, hard to say", "GOOD"));
    let story = detached_story(4);
    let batch = vec![draft(3, "Three"), draft(4, "Four")];

    let outcome = validator
        .validate(&story, &batch, &[prior(2, "Two")])
        .await;

    assert_eq!(
        outcome,
        ValidationOutcome::NeedsRefinement(vec![
            Feedback::new(3, TIMELINE_FEEDBACK),
            Feedback::new(4, CONTINUITY_FEEDBACK),
        ])
    );
}

#[tokio::test]
async fn test_failed_continuity_call_counts_as_inconsistent() {
    let driver = MockDriver::new(|call, _| match call {
        Call::Continuity => Err("timeout".to_string()),
        other => default_reply(other),
    });
    let (_, validator) = validator(driver);
    let story = detached_story(2);
    let batch = vec![draft(1, "One"), draft(2, "Two")];

    let outcome = validator.validate(&story, &batch, &[]).await;
    assert_eq!(outcome.feedback(), &[Feedback::new(2, CONTINUITY_FEEDBACK)]);
}

#[tokio::test]
async fn test_continuity_answer_is_case_insensitive() {
    let (_, validator) = validator(MockDriver::scripted("true", "good"));
    let story = detached_story(2);
    let batch = vec![draft(1, "One"), draft(2, "Two")];

    assert!(validator.validate(&story, &batch, &[]).await.is_success());
}

#[tokio::test]
async fn test_quality_critique_and_continuity_stack_in_order() {
    let driver = MockDriver::new(|call, prompt| match call {
        Call::Continuity => Ok("FALSE".to_string()),
        Call::Quality if prompt.contains("EPISODE: Two") => Ok("Pacing drags in the middle.".to_string()),
        Call::Quality if prompt.contains("EPISODE: One") => Ok(String::new()),
        other => default_reply(other),
    });
    let (_, validator) = validator(driver);
    let story = detached_story(2);
    let batch = vec![draft(1, "One"), draft(2, "Two")];

    let outcome = validator.validate(&story, &batch, &[]).await;
    assert_eq!(
        outcome.feedback(),
        &[
            Feedback::new(2, CONTINUITY_FEEDBACK),
            Feedback::new(2, "Pacing drags in the middle."),
        ]
    );
}

#[tokio::test]
async fn test_failed_quality_call_is_skipped() {
    let driver = MockDriver::new(|call, _| match call {
        Call::Quality => Err("rate limited".to_string()),
        other => default_reply(other),
    });
    let (_, validator) = validator(driver);
    let story = detached_story(2);
    let batch = vec![draft(1, "One"), draft(2, "Two")];

    assert!(validator.validate(&story, &batch, &[]).await.is_success());
}
