//! Tests against a live PostgreSQL database.
//!
//! Run with `--features database` and `DATABASE_URL` pointing at a scratch
//! database; the tests skip themselves when the variable is unset.

#![cfg(feature = "database")]

use shakescript_core::{
    Character, CharacterDelta, EpisodeDraft, EventTier, KeyEvent, OutlineSegment, StoryMetadata,
};
use shakescript_database::{
    PostgresRelevanceIndex, PostgresStoryRepository, establish_connection, run_migrations,
};
use shakescript_interface::{RelevanceIndex, StoryRepository};
use shakescript_narrative::HashedEmbedder;
use std::sync::Arc;

fn repository() -> Option<PostgresStoryRepository> {
    let _ = dotenvy::dotenv();
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    }
    let mut conn = establish_connection().unwrap();
    run_migrations(&mut conn).unwrap();
    Some(PostgresStoryRepository::new(conn))
}

fn metadata() -> StoryMetadata {
    StoryMetadata {
        title: "Monsoon Letters".to_string(),
        characters: vec![Character::named("Asha")],
        story_outline: vec![OutlineSegment::new("Ep 1-2", "Asha finds a letter", "Exposition")],
        ..Default::default()
    }
}

fn draft(episode_number: u32) -> EpisodeDraft {
    let mut draft = EpisodeDraft::new(episode_number);
    draft.episode_title = format!("Title {episode_number}");
    draft.episode_content = "Asha reads the letter. Ravi is far away at sea.".to_string();
    draft.episode_summary = "A letter arrives.".to_string();
    draft.key_events = vec![KeyEvent::new("The letter arrives", EventTier::Foundational)];
    let mut delta = CharacterDelta::named("Asha");
    delta.emotional_state = Some("hopeful".to_string());
    draft.characters_featured = vec![delta, CharacterDelta::named("Ravi")];
    draft
}

#[tokio::test]
async fn test_finalize_is_idempotent_and_merges_roster() {
    let Some(repo) = repository() else { return };
    let id = repo.create_story("prompt", &metadata(), 2, false).await.unwrap();

    let first = repo.finalize_episode(id, &draft(1)).await.unwrap();
    let again = repo.finalize_episode(id, &draft(1)).await.unwrap();
    assert_eq!(first.id, again.id);

    let story = repo.load_story(id).await.unwrap();
    assert_eq!(story.key_events, vec!["The letter arrives".to_string()]);
    assert_eq!(story.timeline.len(), 1);
    assert_eq!(story.character("Asha").unwrap().emotional_state, "hopeful");
    assert_eq!(story.character("Ravi").unwrap().role, "Unknown");
    assert_eq!(repo.episodes(id).await.unwrap().len(), 1);
    // finalizing does not move the cursor
    assert_eq!(story.state.current_episode, 1);

    repo.delete_story(id).await.unwrap();
}

#[tokio::test]
async fn test_generation_state_round_trips() {
    let Some(repo) = repository() else { return };
    let id = repo.create_story("prompt", &metadata(), 3, false).await.unwrap();

    let mut story = repo.load_story(id).await.unwrap();
    story.state.stage_draft(vec![draft(1), draft(2)]);
    story.state.replace_draft(vec![draft(1), draft(2)]);
    repo.save_generation_state(id, &story.state).await.unwrap();

    let loaded = repo.load_story(id).await.unwrap();
    assert_eq!(loaded.state, story.state);
    assert_eq!(loaded.state.refine_rounds, 1);
    let listed = repo.list_stories().await.unwrap();
    assert!(listed.iter().any(|row| row.id == id && row.has_draft));

    repo.delete_story(id).await.unwrap();
    assert!(repo.load_story(id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_reindexing_replaces_chunks() {
    let Some(repo) = repository() else { return };
    let index = PostgresRelevanceIndex::new(
        repo.connection(),
        Arc::new(HashedEmbedder::new(64)),
        40,
        10,
    );
    let id = repo.create_story("prompt", &metadata(), 2, false).await.unwrap();
    let episode = repo.finalize_episode(id, &draft(1)).await.unwrap();
    let story = repo.load_story(id).await.unwrap();

    let written = index.index_episode(&story, &episode).await.unwrap();
    assert!(written > 0);
    index.index_episode(&story, &episode).await.unwrap();
    assert_eq!(index.chunks(id).await.unwrap().len(), written);

    let relevant = index.relevant_chunks(id, "letter", 3).await.unwrap();
    assert!(!relevant.is_empty());
    assert_eq!(relevant[0].episode_number, 1);

    repo.delete_story(id).await.unwrap();
    assert!(index.chunks(id).await.unwrap().is_empty());
}
