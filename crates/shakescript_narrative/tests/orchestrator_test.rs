//! Tests for the batch orchestrator's AI and human modes.
//!
//! Every test runs the full pipeline against the in-memory repository and
//! relevance index with a prompt-routed mock model.

mod common;

use common::{Call, Harness, MockDriver, default_reply, metadata};
use shakescript_core::Feedback;
use shakescript_interface::StoryRepository;
use shakescript_narrative::{BatchStatus, PipelineConfig, RefinementMode};

#[tokio::test]
async fn test_ai_mode_runs_story_to_completion() {
    let harness = Harness::new(MockDriver::scripted("TRUE", "GOOD"));
    let story_id = harness.story(4).await;

    let outcome = harness
        .service
        .generate_batch(story_id, Some(2), false, RefinementMode::Ai)
        .await
        .unwrap();

    assert_eq!(outcome.status, BatchStatus::Complete);
    assert_eq!(outcome.current_episode, 5);
    assert!(outcome.warnings.is_empty());
    let numbers: Vec<u32> = outcome.episodes.iter().map(|e| e.episode_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert_eq!(outcome.episodes[2].title, "Title 3");
    assert_eq!(outcome.episodes[2].summary, "Summary of episode 3.");

    let story = harness.service.story(story_id).await.unwrap();
    assert!(story.is_complete());
    assert!(story.state.draft.is_empty());
    assert_eq!(story.key_events.len(), 4);
    harness.assert_cursor_consistent(story_id).await;

    // episode 1 has no predecessor; 2, 3 and 4 are each checked once
    assert_eq!(harness.driver.count(|c| *c == Call::Continuity), 3);
    assert_eq!(harness.driver.count(|c| *c == Call::Quality), 4);
    assert_eq!(harness.driver.count(|c| matches!(c, Call::Refine(_))), 0);
}

#[tokio::test]
async fn test_ai_mode_clamps_batch_to_remaining_episodes() {
    let harness = Harness::new(MockDriver::scripted("TRUE", "GOOD"));
    let story_id = harness.story(3).await;

    let outcome = harness
        .service
        .generate_batch(story_id, Some(5), false, RefinementMode::Ai)
        .await
        .unwrap();

    assert_eq!(outcome.status, BatchStatus::Complete);
    assert_eq!(outcome.episodes.len(), 3);
    assert_eq!(outcome.current_episode, 4);

    // one batch: every episode is drafted before validation starts
    let calls = harness.driver.calls();
    let last_content = calls
        .iter()
        .rposition(|c| matches!(c, Call::Content(_)))
        .unwrap();
    let first_check = calls.iter().position(|c| *c == Call::Continuity).unwrap();
    assert!(last_content < first_check);
    assert_eq!(harness.driver.count(|c| matches!(c, Call::Content(_))), 3);
}

#[tokio::test]
async fn test_later_episodes_see_previous_prose() {
    let harness = Harness::new(MockDriver::scripted("TRUE", "GOOD"));
    let story_id = harness.story(3).await;

    harness
        .service
        .generate_batch(story_id, Some(1), false, RefinementMode::Ai)
        .await
        .unwrap();

    let prompts = harness.driver.prompts();
    let first = prompts
        .iter()
        .find(|p| matches!(common::classify(p), Call::Content(1)))
        .unwrap();
    let third = prompts
        .iter()
        .find(|p| matches!(common::classify(p), Call::Content(3)))
        .unwrap();
    assert!(first.contains("First episode"));
    assert!(third.contains("Draft prose for episode 2."));
}

#[tokio::test]
async fn test_human_mode_refine_then_validate() {
    let harness = Harness::new(MockDriver::scripted("TRUE", "GOOD"));
    let story_id = harness.story(4).await;

    let pending = harness
        .service
        .generate_batch(story_id, Some(2), false, RefinementMode::Human)
        .await
        .unwrap();
    assert_eq!(pending.status, BatchStatus::Pending);
    assert_eq!(pending.current_episode, 1);
    assert_eq!(pending.draft.len(), 2);
    assert!(pending.episodes.is_empty());
    // no automatic checks in human mode
    assert_eq!(harness.driver.count(|c| *c == Call::Continuity), 0);

    let refined = harness
        .service
        .refine_batch(story_id, &[Feedback::new(2, "Make the ending sharper")])
        .await
        .unwrap();
    assert_eq!(refined.status, BatchStatus::Refined);
    assert_eq!(refined.current_episode, 1);
    assert_eq!(refined.draft[0], pending.draft[0]);
    assert_eq!(refined.draft[1].episode_content, "Refined prose for episode 2.");
    assert_eq!(refined.draft[1].episode_title, pending.draft[1].episode_title);
    assert_eq!(harness.driver.count(|c| *c == Call::Refine(2)), 1);
    assert_eq!(harness.driver.count(|c| *c == Call::Refine(1)), 0);

    let story = harness.service.story(story_id).await.unwrap();
    assert_eq!(story.state.refine_rounds, 1);
    assert_eq!(story.state.draft, refined.draft);

    let finalized = harness.service.validate_batch(story_id).await.unwrap();
    assert_eq!(finalized.status, BatchStatus::Finalized);
    assert_eq!(finalized.current_episode, 3);
    assert_eq!(finalized.episodes.len(), 2);
    assert_eq!(finalized.episodes[1].content, "Refined prose for episode 2.");

    let chunks = harness.index.chunks(story_id).await;
    assert!(chunks.iter().any(|c| c.episode_number == 1));
    assert!(chunks.iter().any(|c| c.episode_number == 2));
    harness.assert_cursor_consistent(story_id).await;
}

#[tokio::test]
async fn test_human_mode_next_batch_starts_after_cursor() {
    let harness = Harness::new(MockDriver::scripted("TRUE", "GOOD"));
    let story_id = harness.story(3).await;

    harness
        .service
        .generate_batch(story_id, Some(2), false, RefinementMode::Human)
        .await
        .unwrap();
    harness.service.validate_batch(story_id).await.unwrap();

    let pending = harness
        .service
        .generate_batch(story_id, Some(2), false, RefinementMode::Human)
        .await
        .unwrap();
    let numbers: Vec<u32> = pending.draft.iter().map(|d| d.episode_number).collect();
    assert_eq!(numbers, vec![3]);

    let finalized = harness.service.validate_batch(story_id).await.unwrap();
    assert_eq!(finalized.current_episode, 4);

    let err = harness
        .service
        .generate_batch(story_id, Some(1), false, RefinementMode::Human)
        .await
        .unwrap_err();
    assert!(err.is_bad_request());
}

#[tokio::test]
async fn test_unresolved_feedback_is_finalized_with_warning() {
    let harness = Harness::new(MockDriver::scripted("FALSE", "GOOD"));
    let story_id = harness.story(2).await;

    let outcome = harness
        .service
        .generate_batch(story_id, Some(2), false, RefinementMode::Ai)
        .await
        .unwrap();

    assert_eq!(outcome.status, BatchStatus::Complete);
    assert_eq!(outcome.episodes.len(), 2);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("after 3 refinement attempts"));
    assert_eq!(harness.driver.count(|c| *c == Call::Refine(2)), 3);
    assert_eq!(outcome.episodes[1].content, "Refined prose for episode 2.");
    harness.assert_cursor_consistent(story_id).await;
}

#[tokio::test]
async fn test_refinement_budget_comes_from_config() {
    let config = PipelineConfig::default().with_max_refinement_attempts(1);
    let harness = Harness::with_config(MockDriver::scripted("FALSE", "GOOD"), config);
    let story_id = harness.story(2).await;

    let outcome = harness
        .service
        .generate_batch(story_id, None, false, RefinementMode::Ai)
        .await
        .unwrap();

    assert_eq!(harness.driver.count(|c| matches!(c, Call::Refine(_))), 1);
    assert!(outcome.warnings[0].contains("after 1 refinement attempts"));
}

#[tokio::test]
async fn test_quality_critique_drives_refinement() {
    let driver = MockDriver::new(|call, prompt| match call {
        Call::Quality if prompt.contains("Draft prose for episode 1.") => {
            Ok("The dialogue feels flat.".to_string())
        }
        other => default_reply(other),
    });
    let harness = Harness::new(driver);
    let story_id = harness.story(2).await;

    let outcome = harness
        .service
        .generate_batch(story_id, Some(2), false, RefinementMode::Ai)
        .await
        .unwrap();

    assert!(outcome.warnings.is_empty());
    assert_eq!(harness.driver.count(|c| *c == Call::Refine(1)), 1);
    assert_eq!(outcome.episodes[0].content, "Refined prose for episode 1.");
    assert_eq!(outcome.episodes[1].content, "Draft prose for episode 2. Asha walks to the harbor. Ravi waits.");
}

#[tokio::test]
async fn test_generation_failure_halts_without_persisting() {
    let driver = MockDriver::new(|call, _| match call {
        Call::Content(2) => Err("model overloaded".to_string()),
        other => default_reply(other),
    });
    let harness = Harness::new(driver);
    let story_id = harness.story(3).await;

    let outcome = harness
        .service
        .generate_batch(story_id, Some(3), false, RefinementMode::Human)
        .await
        .unwrap();

    assert_eq!(outcome.status, BatchStatus::Halted);
    assert_eq!(outcome.current_episode, 1);
    assert_eq!(outcome.draft.len(), 1);
    assert_eq!(outcome.draft[0].episode_number, 1);
    let payload = outcome.error.unwrap();
    assert!(payload.error.contains("model overloaded"));
    // episode 3 is never attempted
    assert_eq!(harness.driver.count(|c| *c == Call::Content(3)), 0);

    let story = harness.service.story(story_id).await.unwrap();
    assert!(story.state.draft.is_empty());
    assert_eq!(story.state.current_episode, 1);
    assert!(harness.service.episodes(story_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ai_halt_keeps_earlier_batches() {
    let driver = MockDriver::new(|call, _| match call {
        Call::Content(3) => Err("quota exhausted".to_string()),
        other => default_reply(other),
    });
    let harness = Harness::new(driver);
    let story_id = harness.story(4).await;

    let outcome = harness
        .service
        .generate_batch(story_id, Some(2), false, RefinementMode::Ai)
        .await
        .unwrap();

    assert_eq!(outcome.status, BatchStatus::Halted);
    assert_eq!(outcome.current_episode, 3);
    assert_eq!(outcome.episodes.len(), 2);
    assert!(outcome.draft.is_empty());
    harness.assert_cursor_consistent(story_id).await;

    // the story can resume where it stopped
    let story = harness.service.story(story_id).await.unwrap();
    assert!(!story.state.has_draft());
}

#[tokio::test]
async fn test_empty_content_halts_batch() {
    let driver = MockDriver::new(|call, _| match call {
        Call::Content(1) => Ok(r#"{"episode_title": "Nothing", "episode_content": ""}"#.to_string()),
        other => default_reply(other),
    });
    let harness = Harness::new(driver);
    let story_id = harness.story(2).await;

    let outcome = harness
        .service
        .generate_batch(story_id, Some(2), false, RefinementMode::Ai)
        .await
        .unwrap();

    assert_eq!(outcome.status, BatchStatus::Halted);
    assert!(outcome.draft.is_empty());
    assert!(outcome.error.unwrap().error.contains("empty content"));
    assert_eq!(harness.driver.count(|c| matches!(c, Call::Details(_))), 0);
}

#[tokio::test]
async fn test_precondition_failures() {
    let harness = Harness::new(MockDriver::scripted("TRUE", "GOOD"));
    let story_id = harness.story(2).await;

    let err = harness
        .service
        .generate_batch(story_id, Some(0), false, RefinementMode::Ai)
        .await
        .unwrap_err();
    assert!(err.is_bad_request());
    assert!(err.reason().contains("Invalid batch size"));

    let err = harness
        .service
        .generate_batch(99, Some(1), false, RefinementMode::Ai)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = harness.service.validate_batch(story_id).await.unwrap_err();
    assert!(err.reason().contains("No batch found"));

    let err = harness
        .service
        .refine_batch(story_id, &[Feedback::new(1, "More tension")])
        .await
        .unwrap_err();
    assert!(err.reason().contains("No batch found"));

    harness
        .service
        .generate_batch(story_id, Some(1), false, RefinementMode::Human)
        .await
        .unwrap();

    let err = harness
        .service
        .generate_batch(story_id, Some(1), false, RefinementMode::Human)
        .await
        .unwrap_err();
    assert!(err.reason().contains("pending draft"));

    let err = harness
        .service
        .refine_batch(story_id, &[Feedback::new(2, "Not drafted yet")])
        .await
        .unwrap_err();
    assert!(err.is_bad_request());
    assert!(err.reason().contains("Episode 2"));

    // a rejected refine leaves the draft untouched
    let story = harness.service.story(story_id).await.unwrap();
    assert_eq!(story.state.draft.len(), 1);
    assert_eq!(story.state.refine_rounds, 0);
}

#[tokio::test]
async fn test_complete_story_rejects_new_batches() {
    let harness = Harness::new(MockDriver::scripted("TRUE", "GOOD"));
    let story_id = harness.story(1).await;

    harness
        .service
        .generate_batch(story_id, None, false, RefinementMode::Ai)
        .await
        .unwrap();

    let err = harness
        .service
        .generate_batch(story_id, None, false, RefinementMode::Ai)
        .await
        .unwrap_err();
    assert!(err.reason().contains("have been generated"));
}

#[tokio::test]
async fn test_localized_batch_uses_rewrite() {
    let harness = Harness::new(MockDriver::scripted("TRUE", "GOOD"));
    let story_id = harness.story(1).await;

    let outcome = harness
        .service
        .generate_batch(story_id, None, true, RefinementMode::Human)
        .await
        .unwrap();

    assert_eq!(harness.driver.count(|c| *c == Call::Localization), 1);
    assert_eq!(outcome.draft[0].episode_title, "Hinglish Title");
    assert_eq!(outcome.draft[0].episode_content, "Asha harbor ki taraf chali.");
}

#[tokio::test]
async fn test_hinglish_story_localizes_every_batch() {
    let harness = Harness::new(MockDriver::scripted("TRUE", "GOOD"));
    let story_id = harness
        .repository
        .create_story("A sister searches for her brother", &metadata(), 2, true)
        .await
        .unwrap();

    let outcome = harness
        .service
        .generate_batch(story_id, Some(2), false, RefinementMode::Human)
        .await
        .unwrap();

    assert_eq!(harness.driver.count(|c| *c == Call::Localization), 2);
    assert!(outcome.draft.iter().all(|d| d.episode_title == "Hinglish Title"));
}
