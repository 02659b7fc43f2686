//! PostgreSQL implementation of StoryRepository.

use crate::conversions::{
    character_to_new_row, draft_to_new_row, metadata_column, row_to_episode, rows_to_story,
    state_to_changeset, story_to_ledger,
};
use crate::schema::{characters, episodes, stories};
use crate::{CharacterRow, DatabaseResult, EpisodeRow, NewCharacterRow, NewStoryRow, StoryRow};

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use shakescript_core::{
    Episode, EpisodeDraft, GenerationState, Story, StoryId, StoryMetadata, StorySummary,
};
use shakescript_error::{
    DatabaseError, ShakescriptError, ShakescriptResult, StoryError, StoryErrorKind,
};
use shakescript_interface::StoryRepository;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// PostgreSQL implementation of [`StoryRepository`] using Diesel ORM.
///
/// Stories, episodes, characters and chunks live in four tables; the draft
/// buffer, key events and timeline are JSONB columns on `stories`.
///
/// # Example
/// ```no_run
/// use shakescript_database::{PostgresStoryRepository, establish_connection, run_migrations};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut conn = establish_connection()?;
/// run_migrations(&mut conn)?;
/// let repo = PostgresStoryRepository::new(conn);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PostgresStoryRepository {
    /// Single connection shared behind an async mutex.
    conn: Arc<Mutex<PgConnection>>,
}

impl PostgresStoryRepository {
    /// Create a repository that owns a connection.
    pub fn new(conn: PgConnection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Create a repository from a shared connection.
    pub fn from_arc(conn: Arc<Mutex<PgConnection>>) -> Self {
        Self { conn }
    }

    /// The shared connection, e.g. for a [`PostgresRelevanceIndex`](crate::PostgresRelevanceIndex).
    pub fn connection(&self) -> Arc<Mutex<PgConnection>> {
        self.conn.clone()
    }
}

fn not_found(id: StoryId) -> ShakescriptError {
    StoryError::new(StoryErrorKind::NotFound(id)).into()
}

fn load(conn: &mut PgConnection, id: StoryId) -> ShakescriptResult<Story> {
    let row: Option<StoryRow> = stories::table
        .find(id)
        .select(StoryRow::as_select())
        .first(conn)
        .optional()
        .map_err(DatabaseError::from)?;
    let Some(row) = row else {
        return Err(not_found(id));
    };

    let roster: Vec<CharacterRow> = characters::table
        .filter(characters::story_id.eq(id))
        .order(characters::id.asc())
        .select(CharacterRow::as_select())
        .load(conn)
        .map_err(DatabaseError::from)?;

    Ok(rows_to_story(row, roster)?)
}

#[async_trait]
impl StoryRepository for PostgresStoryRepository {
    #[instrument(skip(self, prompt, metadata), fields(title = %metadata.title))]
    async fn create_story(
        &self,
        prompt: &str,
        metadata: &StoryMetadata,
        num_episodes: u32,
        is_hinglish: bool,
    ) -> ShakescriptResult<StoryId> {
        let new_story = NewStoryRow {
            prompt: prompt.to_string(),
            title: metadata.title.clone(),
            metadata: metadata_column(metadata)?,
            num_episodes: num_episodes as i32,
            is_hinglish,
        };

        let mut conn = self.conn.lock().await;
        let id = conn.transaction::<_, DatabaseError, _>(|conn| {
            let id: i32 = diesel::insert_into(stories::table)
                .values(&new_story)
                .returning(stories::id)
                .get_result(conn)?;

            let roster = metadata
                .characters
                .iter()
                .map(|character| character_to_new_row(id, character))
                .collect::<DatabaseResult<Vec<NewCharacterRow>>>()?;
            if !roster.is_empty() {
                diesel::insert_into(characters::table)
                    .values(&roster)
                    .on_conflict((characters::story_id, characters::name))
                    .do_nothing()
                    .execute(conn)?;
            }
            Ok(id)
        })?;

        info!(story_id = id, "Story created");
        Ok(id)
    }

    async fn load_story(&self, id: StoryId) -> ShakescriptResult<Story> {
        let mut conn = self.conn.lock().await;
        load(&mut conn, id)
    }

    async fn list_stories(&self) -> ShakescriptResult<Vec<StorySummary>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<StoryRow> = stories::table
            .order(stories::id.desc())
            .select(StoryRow::as_select())
            .load(&mut *conn)
            .map_err(DatabaseError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| StorySummary {
                id: row.id,
                title: row.title,
                num_episodes: row.num_episodes as u32,
                current_episode: row.current_episode as u32,
                has_draft: row.draft.as_array().is_some_and(|draft| !draft.is_empty()),
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn delete_story(&self, id: StoryId) -> ShakescriptResult<()> {
        let mut conn = self.conn.lock().await;
        // episodes, characters and chunks cascade
        let deleted = diesel::delete(stories::table.find(id))
            .execute(&mut *conn)
            .map_err(DatabaseError::from)?;
        if deleted == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    #[instrument(skip(self, state), fields(current_episode = state.current_episode, draft = state.draft.len()))]
    async fn save_generation_state(
        &self,
        id: StoryId,
        state: &GenerationState,
    ) -> ShakescriptResult<()> {
        let changeset = state_to_changeset(state)?;
        let mut conn = self.conn.lock().await;
        let updated = diesel::update(stories::table.find(id))
            .set(&changeset)
            .execute(&mut *conn)
            .map_err(DatabaseError::from)?;
        if updated == 0 {
            return Err(not_found(id));
        }
        debug!("Generation state saved");
        Ok(())
    }

    #[instrument(skip(self, draft), fields(episode = draft.episode_number))]
    async fn finalize_episode(
        &self,
        id: StoryId,
        draft: &EpisodeDraft,
    ) -> ShakescriptResult<Episode> {
        let mut conn = self.conn.lock().await;
        let mut story = load(&mut conn, id)?;
        story.absorb_episode(draft);

        let new_episode = draft_to_new_row(id, draft)?;
        let ledger = story_to_ledger(&story)?;
        let featured = draft
            .characters_featured
            .iter()
            .filter_map(|delta| story.character(delta.name.trim()))
            .map(|character| character_to_new_row(id, character))
            .collect::<DatabaseResult<Vec<NewCharacterRow>>>()?;

        let row = conn.transaction::<_, DatabaseError, _>(|conn| {
            let row: EpisodeRow = diesel::insert_into(episodes::table)
                .values(&new_episode)
                .on_conflict((episodes::story_id, episodes::episode_number))
                .do_update()
                .set(&new_episode)
                .returning(EpisodeRow::as_returning())
                .get_result(conn)?;

            for character in &featured {
                diesel::insert_into(characters::table)
                    .values(character)
                    .on_conflict((characters::story_id, characters::name))
                    .do_update()
                    .set(character)
                    .execute(conn)?;
            }

            diesel::update(stories::table.find(id))
                .set(&ledger)
                .execute(conn)?;
            Ok(row)
        })?;

        info!(characters = featured.len(), "Episode finalized");
        Ok(row_to_episode(row)?)
    }

    async fn episodes_in_range(
        &self,
        id: StoryId,
        start: u32,
        end: u32,
    ) -> ShakescriptResult<Vec<Episode>> {
        if start > end {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.lock().await;
        let rows: Vec<EpisodeRow> = episodes::table
            .filter(episodes::story_id.eq(id))
            .filter(episodes::episode_number.between(start as i32, end as i32))
            .order(episodes::episode_number.asc())
            .select(EpisodeRow::as_select())
            .load(&mut *conn)
            .map_err(DatabaseError::from)?;
        Ok(rows
            .into_iter()
            .map(row_to_episode)
            .collect::<DatabaseResult<Vec<_>>>()?)
    }

    async fn episodes(&self, id: StoryId) -> ShakescriptResult<Vec<Episode>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<EpisodeRow> = episodes::table
            .filter(episodes::story_id.eq(id))
            .order(episodes::episode_number.asc())
            .select(EpisodeRow::as_select())
            .load(&mut *conn)
            .map_err(DatabaseError::from)?;
        Ok(rows
            .into_iter()
            .map(row_to_episode)
            .collect::<DatabaseResult<Vec<_>>>()?)
    }

    async fn update_summary(&self, id: StoryId, summary: &str) -> ShakescriptResult<()> {
        let mut conn = self.conn.lock().await;
        let updated = diesel::update(stories::table.find(id))
            .set((
                stories::summary.eq(summary),
                stories::updated_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .execute(&mut *conn)
            .map_err(DatabaseError::from)?;
        if updated == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}
