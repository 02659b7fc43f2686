//! PostgreSQL implementation of RelevanceIndex.

use crate::conversions::{chunk_to_new_row, row_to_chunk};
use crate::schema::{chunks, stories};
use crate::{ChunkRow, DatabaseResult, NewChunkRow};

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use shakescript_core::{Chunk, Episode, RelevantChunk, Story, StoryId, chunk_episode, rank_chunks};
use shakescript_error::{DatabaseError, ShakescriptResult};
use shakescript_interface::{Embeddings, RelevanceIndex};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Chunk store in the `chunks` table, ranked in process.
///
/// Embeddings are computed by an [`Embeddings`] backend when an episode is
/// indexed and when a query is ranked.
#[derive(Clone)]
pub struct PostgresRelevanceIndex {
    conn: Arc<Mutex<PgConnection>>,
    embedder: Arc<dyn Embeddings>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl PostgresRelevanceIndex {
    /// Create an index over a shared connection.
    pub fn new(
        conn: Arc<Mutex<PgConnection>>,
        embedder: Arc<dyn Embeddings>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            conn,
            embedder,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Every stored chunk of a story in episode and chunk order.
    pub async fn chunks(&self, story_id: StoryId) -> ShakescriptResult<Vec<Chunk>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<ChunkRow> = chunks::table
            .filter(chunks::story_id.eq(story_id))
            .order((chunks::episode_number.asc(), chunks::chunk_number.asc()))
            .select(ChunkRow::as_select())
            .load(&mut *conn)
            .map_err(DatabaseError::from)?;
        Ok(rows
            .into_iter()
            .map(row_to_chunk)
            .collect::<DatabaseResult<Vec<_>>>()?)
    }
}

#[async_trait]
impl RelevanceIndex for PostgresRelevanceIndex {
    #[instrument(skip(self, story, episode), fields(story_id = story.id, episode = episode.episode_number))]
    async fn index_episode(&self, story: &Story, episode: &Episode) -> ShakescriptResult<usize> {
        let mut fresh = chunk_episode(story, episode, self.chunk_size, self.chunk_overlap);
        let texts: Vec<String> = fresh.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        for (chunk, embedding) in fresh.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }
        let rows = fresh
            .iter()
            .map(chunk_to_new_row)
            .collect::<DatabaseResult<Vec<NewChunkRow>>>()?;

        let mut conn = self.conn.lock().await;
        let episode_number = episode.episode_number as i32;
        conn.transaction::<_, DatabaseError, _>(|conn| {
            diesel::delete(
                chunks::table
                    .filter(chunks::story_id.eq(story.id))
                    .filter(chunks::episode_number.eq(episode_number)),
            )
            .execute(conn)?;
            if !rows.is_empty() {
                diesel::insert_into(chunks::table)
                    .values(&rows)
                    .execute(conn)?;
            }
            Ok(())
        })?;

        debug!(chunks = rows.len(), "Episode indexed");
        Ok(rows.len())
    }

    async fn relevant_chunks(
        &self,
        story_id: StoryId,
        query: &str,
        k: usize,
    ) -> ShakescriptResult<Vec<RelevantChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let stored = self.chunks(story_id).await?;
        if stored.is_empty() {
            return Ok(Vec::new());
        }

        let num_episodes: Option<i32> = {
            let mut conn = self.conn.lock().await;
            stories::table
                .find(story_id)
                .select(stories::num_episodes)
                .first(&mut *conn)
                .optional()
                .map_err(DatabaseError::from)?
        };
        let midpoint = num_episodes.map(|n| n as u32 / 2).unwrap_or_default();

        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();
        Ok(rank_chunks(&stored, &query_embedding, midpoint, k))
    }

    async fn remove_story(&self, story_id: StoryId) -> ShakescriptResult<()> {
        let mut conn = self.conn.lock().await;
        diesel::delete(chunks::table.filter(chunks::story_id.eq(story_id)))
            .execute(&mut *conn)
            .map_err(DatabaseError::from)?;
        Ok(())
    }
}
