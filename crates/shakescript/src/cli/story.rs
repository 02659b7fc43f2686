//! Story command handlers.

use super::commands::Commands;
use serde::Serialize;
use serde_json::json;
use shakescript::{
    BatchOutcome, Episode, ErrorPayload, GeminiClient, HashedEmbedder, JsonError, PipelineConfig,
    PostgresRelevanceIndex, PostgresStoryRepository, ShakescriptError, ShakescriptResult,
    Story, StoryService, establish_connection, run_migrations,
};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Serialize)]
struct StoryView<'a> {
    story: &'a Story,
    episodes: &'a [Episode],
}

/// Handle a story command against PostgreSQL and Gemini.
pub async fn handle_story_command(cmd: Commands, json: bool) -> ShakescriptResult<()> {
    let service = connect()?;

    match cmd {
        Commands::Create {
            prompt,
            episodes,
            hinglish,
        } => {
            let story = service.create_story(&prompt, episodes, hinglish).await?;
            if json {
                print_json(&story)?;
            } else {
                println!(
                    "Created story {}: {} ({} episodes)",
                    story.id,
                    story.title(),
                    story.num_episodes
                );
            }
        }

        Commands::List => {
            let stories = service.list_stories().await?;
            if json {
                print_json(&stories)?;
            } else {
                println!("{:<6} {:<40} {:>9} {:>6}", "ID", "TITLE", "PROGRESS", "DRAFT");
                println!("{:-<64}", "");
                for story in &stories {
                    let finalized = story.current_episode.saturating_sub(1);
                    println!(
                        "{:<6} {:<40} {:>9} {:>6}",
                        story.id,
                        story.title,
                        format!("{}/{}", finalized, story.num_episodes),
                        if story.has_draft { "yes" } else { "" }
                    );
                }
                println!("Total: {} stories", stories.len());
            }
        }

        Commands::Show { id } => {
            let story = service.story(id).await?;
            let episodes = service.episodes(id).await?;
            if json {
                print_json(&StoryView {
                    story: &story,
                    episodes: &episodes,
                })?;
            } else {
                println!("{} (story {})", story.title(), story.id);
                println!("{:-<80}", "");
                println!("Theme: {}", story.metadata.theme);
                println!(
                    "Progress: episode {} of {}",
                    story.state.current_episode, story.num_episodes
                );
                if !story.state.draft.is_empty() {
                    println!(
                        "Pending draft: {} episodes (refined {} times)",
                        story.state.draft.len(),
                        story.state.refine_rounds
                    );
                }
                if let Some(summary) = &story.summary {
                    println!("\n{}", summary);
                }
                println!("{:-<80}", "");
                for episode in &episodes {
                    println!("Episode {}: {}", episode.episode_number, episode.title);
                    println!("  {}", episode.summary);
                }
            }
        }

        Commands::Generate {
            id,
            batch_size,
            mode,
            hinglish,
        } => {
            let outcome = service
                .generate_batch(id, batch_size, hinglish, mode.into())
                .await?;
            print_outcome(&outcome, json)?;
        }

        Commands::Validate { id } => {
            let outcome = service.validate_batch(id).await?;
            print_outcome(&outcome, json)?;
        }

        Commands::Refine { id, feedback } => {
            let outcome = service.refine_batch(id, &feedback).await?;
            print_outcome(&outcome, json)?;
        }

        Commands::Summary { id } => {
            let summary = service.summarize_story(id).await?;
            if json {
                print_json(&json!({ "story_id": id, "summary": summary }))?;
            } else {
                println!("{}", summary);
            }
        }

        Commands::Delete { id } => {
            service.delete_story(id).await?;
            if json {
                print_json(&json!({ "story_id": id, "deleted": true }))?;
            } else {
                println!("Deleted story {}", id);
            }
        }
    }

    Ok(())
}

/// Print an error the way the output mode expects.
pub fn report_error(err: &ShakescriptError, json: bool) {
    if json {
        let payload = ErrorPayload::from(err);
        match serde_json::to_string_pretty(&payload) {
            Ok(body) => println!("{}", body),
            Err(_) => eprintln!("Error: {}", payload.error),
        }
    } else {
        eprintln!("Error: {}", err.reason());
    }
}

fn connect() -> ShakescriptResult<StoryService> {
    let config = PipelineConfig::load()?;
    debug!(model = %config.model(), "Loaded pipeline configuration");

    let driver = Arc::new(GeminiClient::with_model(config.model())?);

    let mut conn = establish_connection()?;
    run_migrations(&mut conn)?;
    let repository = PostgresStoryRepository::new(conn);
    let index = PostgresRelevanceIndex::new(
        repository.connection(),
        Arc::new(HashedEmbedder::new(*config.embedding_dimensions())),
        *config.chunk_size(),
        *config.chunk_overlap(),
    );

    info!("Connected to database");
    Ok(StoryService::new(
        driver,
        Arc::new(repository),
        Arc::new(index),
        config,
    ))
}

fn print_outcome(outcome: &BatchOutcome, json: bool) -> ShakescriptResult<()> {
    if json {
        return print_json(outcome);
    }

    println!("[{}] {}", outcome.status, outcome.message);
    for episode in &outcome.episodes {
        println!("  Episode {}: {}", episode.episode_number, episode.title);
    }
    if !outcome.draft.is_empty() {
        println!("Draft:");
        for draft in &outcome.draft {
            println!("  Episode {}: {}", draft.episode_number, draft.episode_title);
        }
    }
    for warning in &outcome.warnings {
        println!("Warning: {}", warning);
    }
    if let Some(error) = &outcome.error {
        println!("Error: {}", error.error);
    }
    println!("Next episode: {}", outcome.current_episode);
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> ShakescriptResult<()> {
    let body =
        serde_json::to_string_pretty(value).map_err(|e| JsonError::new(e.to_string()))?;
    println!("{}", body);
    Ok(())
}
