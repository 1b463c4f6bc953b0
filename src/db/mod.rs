//! Database module for SQLite persistence
//!
//! Owns the connection pool and schema. Every mutation in the crate runs in a
//! single `sqlx` transaction taken from this pool.

mod schema;

pub use schema::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::Result;

/// Create a new database connection pool
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    initialize_schema(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
    use std::str::FromStr;

    use super::initialize_schema;
    use crate::stories::{NewStory, NewStoryLine, StoryStore};

    /// In-memory database with the schema applied.
    ///
    /// One connection only: an in-memory SQLite database lives and dies with
    /// its connection.
    pub async fn memory_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        initialize_schema(&pool).await.unwrap();
        pool
    }

    /// Create a story whose lines carry the given texts, returning its ID
    pub async fn seed_story(pool: &SqlitePool, texts: &[&str]) -> i64 {
        let story = NewStory {
            lines: texts
                .iter()
                .map(|text| NewStoryLine {
                    text: text.to_string(),
                    audio_ref: None,
                })
                .collect(),
            ..NewStory::sample()
        };
        StoryStore::new(pool).create_story(&story).await.unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("stories.db").display());

        let pool = create_pool(&url, 2).await.unwrap();
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE '%items' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let names: Vec<_> = tables.into_iter().map(|(name,)| name).collect();
        assert_eq!(names, vec!["grammar_items", "vocabulary_items"]);

        // Re-running the schema against an existing file is harmless
        initialize_schema(&pool).await.unwrap();
    }
}
