//! Tests for single-pass refinement of flagged episodes.

mod common;

use common::{Call, MockDriver, classify, default_reply, detached_story, draft};
use shakescript_core::{Feedback, PriorEpisode};
use shakescript_narrative::{BatchRefiner, PipelineConfig};
use std::sync::Arc;

fn refiner(driver: MockDriver) -> (Arc<MockDriver>, BatchRefiner) {
    let driver = Arc::new(driver);
    let refiner = BatchRefiner::new(driver.clone(), PipelineConfig::default());
    (driver, refiner)
}

fn refine_prompt_for(driver: &MockDriver, episode_number: u32) -> String {
    driver
        .prompts()
        .into_iter()
        .find(|p| classify(p) == Call::Refine(episode_number))
        .unwrap()
}

#[tokio::test]
async fn test_unflagged_episodes_pass_through() {
    let (driver, refiner) = refiner(MockDriver::scripted("TRUE", "GOOD"));
    let story = detached_story(4);
    let batch = vec![draft(1, "One"), draft(2, "Two"), draft(3, "Three")];

    let refined = refiner
        .refine(&story, &batch, &[], &[Feedback::new(2, "More dialogue")])
        .await
        .unwrap();

    assert_eq!(refined.len(), 3);
    assert_eq!(refined[0], batch[0]);
    assert_eq!(refined[2], batch[2]);
    assert_eq!(refined[1].episode_number, 2);
    assert_eq!(refined[1].episode_content, "Refined prose for episode 2.");
    assert_eq!(refined[1].episode_title, "Title 2");
    assert_eq!(driver.count(|c| matches!(c, Call::Refine(_))), 1);
    assert_eq!(driver.count(|c| *c == Call::Title), 0);
}

#[tokio::test]
async fn test_notes_for_one_episode_share_a_call() {
    let (driver, refiner) = refiner(MockDriver::scripted("TRUE", "GOOD"));
    let story = detached_story(2);
    let batch = vec![draft(1, "One"), draft(2, "Two")];

    refiner
        .refine(
            &story,
            &batch,
            &[],
            &[Feedback::new(2, "Fix the timeline"), Feedback::new(2, "Warmer tone")],
        )
        .await
        .unwrap();

    assert_eq!(driver.count(|c| *c == Call::Refine(2)), 1);
    let prompt = refine_prompt_for(&driver, 2);
    assert!(prompt.contains("Fix the timeline\nWarmer tone"));
}

#[tokio::test]
async fn test_title_feedback_regenerates_title() {
    let (driver, refiner) = refiner(MockDriver::scripted("TRUE", "GOOD"));
    let story = detached_story(2);
    let batch = vec![draft(1, "One")];

    let refined = refiner
        .refine(&story, &batch, &[], &[Feedback::new(1, "The Title is too long")])
        .await
        .unwrap();

    assert_eq!(refined[0].episode_title, "A New Dawn");
    assert_eq!(driver.count(|c| *c == Call::Title), 1);
}

#[tokio::test]
async fn test_failed_title_call_keeps_title() {
    let driver = MockDriver::new(|call, _| match call {
        Call::Title => Err("unavailable".to_string()),
        other => default_reply(other),
    });
    let (_, refiner) = refiner(driver);
    let story = detached_story(2);
    let batch = vec![draft(1, "One")];

    let refined = refiner
        .refine(&story, &batch, &[], &[Feedback::new(1, "New title please")])
        .await
        .unwrap();

    assert_eq!(refined[0].episode_title, "Title 1");
    assert_eq!(refined[0].episode_content, "Refined prose for episode 1.");
}

#[tokio::test]
async fn test_failed_refine_call_is_an_error() {
    let driver = MockDriver::new(|call, _| match call {
        Call::Refine(_) => Err("overloaded".to_string()),
        other => default_reply(other),
    });
    let (_, refiner) = refiner(driver);
    let story = detached_story(2);
    let batch = vec![draft(1, "One")];

    let result = refiner
        .refine(&story, &batch, &[], &[Feedback::new(1, "Tighter")])
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_empty_refinement_keeps_original() {
    let driver = MockDriver::new(|call, _| match call {
        Call::Refine(_) => Ok("   ".to_string()),
        other => default_reply(other),
    });
    let (_, refiner) = refiner(driver);
    let story = detached_story(2);
    let batch = vec![draft(1, "One")];

    let refined = refiner
        .refine(&story, &batch, &[], &[Feedback::new(1, "Tighter")])
        .await
        .unwrap();
    assert_eq!(refined[0].episode_content, "One");
}

#[tokio::test]
async fn test_structured_refinement_is_unwrapped() {
    let driver = MockDriver::new(|call, _| match call {
        Call::Refine(_) => Ok(
            r#"{"episode_title": "Ignored", "episode_content": "Unwrapped prose."}"#.to_string(),
        ),
        other => default_reply(other),
    });
    let (_, refiner) = refiner(driver);
    let story = detached_story(2);
    let batch = vec![draft(1, "One")];

    let refined = refiner
        .refine(&story, &batch, &[], &[Feedback::new(1, "Tighter")])
        .await
        .unwrap();
    assert_eq!(refined[0].episode_content, "Unwrapped prose.");
    assert_eq!(refined[0].episode_title, "Title 1");
}

#[tokio::test]
async fn test_refine_prompt_carries_neighbours() {
    let (driver, refiner) = refiner(MockDriver::scripted("TRUE", "GOOD"));
    let story = detached_story(6);
    let prior = vec![PriorEpisode {
        episode_number: 2,
        title: "Title 2".to_string(),
        content: "Two".to_string(),
    }];
    let batch = vec![draft(3, "Three"), draft(4, "Four")];

    refiner
        .refine(
            &story,
            &batch,
            &prior,
            &[Feedback::new(3, "Sharper"), Feedback::new(4, "Sharper")],
        )
        .await
        .unwrap();

    let third = refine_prompt_for(&driver, 3);
    assert!(third.contains("PREVIOUS EPISODE (#2): Two"));
    assert!(third.contains("NEXT EPISODE IN BATCH (#4): Four"));

    let fourth = refine_prompt_for(&driver, 4);
    assert!(fourth.contains("PREVIOUS EPISODE IN BATCH (#3): Three"));
    assert!(fourth.contains("last episode in the current batch"));
}

#[tokio::test]
async fn test_story_edges_use_opening_and_closing_context() {
    let (driver, refiner) = refiner(MockDriver::scripted("TRUE", "GOOD"));
    let story = detached_story(1);
    let batch = vec![draft(1, "One")];

    refiner
        .refine(&story, &batch, &[], &[Feedback::new(1, "Sharper")])
        .await
        .unwrap();

    let prompt = refine_prompt_for(&driver, 1);
    assert!(prompt.contains("STORY BEGINNING CONTEXT"));
    assert!(prompt.contains("Main Characters: Asha, Ravi"));
    assert!(prompt.contains("final episode of the story"));
}

#[tokio::test]
async fn test_batch_end_previews_next_phase() {
    let (driver, refiner) = refiner(MockDriver::scripted("TRUE", "GOOD"));
    let story = detached_story(4);
    let batch = vec![draft(2, "Two")];

    refiner
        .refine(&story, &batch, &[], &[Feedback::new(2, "Sharper")])
        .await
        .unwrap();

    let prompt = refine_prompt_for(&driver, 2);
    assert!(prompt.contains("UPCOMING STORY POINTS (Inciting Incident): The search begins"));
}
