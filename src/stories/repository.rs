//! SQLite primitives for stories, lines and story metadata

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::types::{Author, Description, GrammarPoint, NewStory, StoryMetadata};
use crate::error::{AppError, Result};

/// Repository for story rows; borrows one connection so it can run inside a
/// transaction
pub struct StoryRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> StoryRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn story_exists(&mut self, story_id: i64) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM stories WHERE story_id = ?)")
                .bind(story_id)
                .fetch_one(&mut *self.conn)
                .await?;

        Ok(exists)
    }

    pub async fn line_exists(&mut self, story_id: i64, line_number: i64) -> Result<bool> {
        Ok(self.line_text(story_id, line_number).await?.is_some())
    }

    /// Text of one line, `None` when the line does not exist
    pub async fn line_text(&mut self, story_id: i64, line_number: i64) -> Result<Option<String>> {
        let text: Option<String> = sqlx::query_scalar(
            "SELECT text FROM story_lines WHERE story_id = ? AND line_number = ?",
        )
        .bind(story_id)
        .bind(line_number)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(text)
    }

    pub async fn grammar_point_exists(&mut self, grammar_point_id: i64) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM grammar_points WHERE id = ?)")
                .bind(grammar_point_id)
                .fetch_one(&mut *self.conn)
                .await?;

        Ok(exists)
    }

    /// Stamp the story's last revision with the current time.
    ///
    /// Callers check the story first, so a missing row here is an `Internal`
    /// error and aborts the surrounding transaction.
    pub async fn bump_last_revision(&mut self, story_id: i64) -> Result<()> {
        let result = sqlx::query("UPDATE stories SET last_revision = ? WHERE story_id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(story_id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Internal(format!(
                "Revision bump matched no story: {}",
                story_id
            )));
        }
        Ok(())
    }

    /// Insert the story row together with titles, description and grammar
    /// point associations. Lines are written separately.
    ///
    /// An unknown grammar point ID is `NotFound`; the caller's transaction
    /// then rolls back the partial story.
    pub async fn insert_story(&mut self, story: &NewStory) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO stories (week_number, day_letter, author_id, author_name, video_url, last_revision)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(story.week_number)
        .bind(&story.day_letter)
        .bind(&story.author.id)
        .bind(&story.author.name)
        .bind(&story.video_url)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *self.conn)
        .await?;
        let story_id = result.last_insert_rowid();

        for (language, title) in &story.title {
            sqlx::query(
                "INSERT INTO story_titles (story_id, language_code, title) VALUES (?, ?, ?)",
            )
            .bind(story_id)
            .bind(language)
            .bind(title)
            .execute(&mut *self.conn)
            .await?;
        }

        if let Some(description) = &story.description {
            sqlx::query(
                "INSERT INTO story_descriptions (story_id, language_code, description_text) VALUES (?, ?, ?)",
            )
            .bind(story_id)
            .bind(&description.language)
            .bind(&description.text)
            .execute(&mut *self.conn)
            .await?;
        }

        for grammar_point_id in &story.grammar_point_ids {
            if !self.grammar_point_exists(*grammar_point_id).await? {
                return Err(AppError::NotFound(format!(
                    "Grammar point not found: {}",
                    grammar_point_id
                )));
            }
            sqlx::query(
                "INSERT OR IGNORE INTO story_grammar_points (story_id, grammar_point_id) VALUES (?, ?)",
            )
            .bind(story_id)
            .bind(*grammar_point_id)
            .execute(&mut *self.conn)
            .await?;
        }

        Ok(story_id)
    }

    /// Insert or replace a line's text and audio reference. Existing
    /// annotations on the line are kept.
    pub async fn upsert_line(
        &mut self,
        story_id: i64,
        line_number: i64,
        text: &str,
        audio_ref: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO story_lines (story_id, line_number, text)
            VALUES (?, ?, ?)
            ON CONFLICT(story_id, line_number) DO UPDATE SET text = excluded.text
            "#,
        )
        .bind(story_id)
        .bind(line_number)
        .bind(text)
        .execute(&mut *self.conn)
        .await?;

        match audio_ref {
            Some(path) => {
                sqlx::query(
                    r#"
                    INSERT INTO line_audio (story_id, line_number, file_path)
                    VALUES (?, ?, ?)
                    ON CONFLICT(story_id, line_number) DO UPDATE SET file_path = excluded.file_path
                    "#,
                )
                .bind(story_id)
                .bind(line_number)
                .bind(path)
                .execute(&mut *self.conn)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM line_audio WHERE story_id = ? AND line_number = ?")
                    .bind(story_id)
                    .bind(line_number)
                    .execute(&mut *self.conn)
                    .await?;
            }
        }

        Ok(())
    }

    /// Remove lines numbered above `last_line` and their audio references.
    /// Annotations on those lines must already be gone.
    pub async fn delete_lines_beyond(&mut self, story_id: i64, last_line: i64) -> Result<u64> {
        sqlx::query("DELETE FROM line_audio WHERE story_id = ? AND line_number > ?")
            .bind(story_id)
            .bind(last_line)
            .execute(&mut *self.conn)
            .await?;

        let result = sqlx::query("DELETE FROM story_lines WHERE story_id = ? AND line_number > ?")
            .bind(story_id)
            .bind(last_line)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete everything a story owns except its annotations, then the story
    /// row itself. Referencing rows go first.
    pub async fn delete_story_rows(&mut self, story_id: i64) -> Result<u64> {
        let mut deleted = 0;
        for table in [
            "line_audio",
            "story_lines",
            "story_grammar_points",
            "story_titles",
            "story_descriptions",
            "stories",
        ] {
            let sql = format!("DELETE FROM {} WHERE story_id = ?", table);
            deleted += sqlx::query(&sql)
                .bind(story_id)
                .execute(&mut *self.conn)
                .await?
                .rows_affected();
        }

        Ok(deleted)
    }

    /// Story metadata, `None` when the story does not exist
    pub async fn metadata(&mut self, story_id: i64) -> Result<Option<StoryMetadata>> {
        let Some(row) = sqlx::query_as::<_, StoryRow>(
            r#"
            SELECT story_id, week_number, day_letter, author_id, author_name, video_url, last_revision
            FROM stories
            WHERE story_id = ?
            "#,
        )
        .bind(story_id)
        .fetch_optional(&mut *self.conn)
        .await?
        else {
            return Ok(None);
        };

        let titles: Vec<(String, String)> = sqlx::query_as(
            "SELECT language_code, title FROM story_titles WHERE story_id = ? ORDER BY language_code",
        )
        .bind(story_id)
        .fetch_all(&mut *self.conn)
        .await?;

        let description: Option<(String, String)> = sqlx::query_as(
            "SELECT language_code, description_text FROM story_descriptions WHERE story_id = ? LIMIT 1",
        )
        .bind(story_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        let grammar_points = sqlx::query_as::<_, GrammarPoint>(
            r#"
            SELECT gp.id, gp.name, gp.description
            FROM grammar_points gp
            JOIN story_grammar_points sgp ON sgp.grammar_point_id = gp.id
            WHERE sgp.story_id = ?
            ORDER BY gp.id
            "#,
        )
        .bind(story_id)
        .fetch_all(&mut *self.conn)
        .await?;

        let last_revision = row
            .last_revision
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc));

        Ok(Some(StoryMetadata {
            story_id: row.story_id,
            week_number: row.week_number,
            day_letter: row.day_letter,
            title: titles.into_iter().collect::<BTreeMap<_, _>>(),
            author: Author {
                id: row.author_id,
                name: row.author_name,
            },
            video_url: row.video_url,
            description: description.map(|(language, text)| Description { language, text }),
            last_revision,
            grammar_points,
        }))
    }

    /// Lines of a story in line-number order
    pub async fn lines(&mut self, story_id: i64) -> Result<Vec<LineRow>> {
        let lines = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT l.line_number, l.text, a.file_path AS audio_ref
            FROM story_lines l
            LEFT JOIN line_audio a ON a.story_id = l.story_id AND a.line_number = l.line_number
            WHERE l.story_id = ?
            ORDER BY l.line_number
            "#,
        )
        .bind(story_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(lines)
    }

    pub async fn create_grammar_point(&mut self, name: &str, description: Option<&str>) -> Result<i64> {
        let result = sqlx::query("INSERT INTO grammar_points (name, description) VALUES (?, ?)")
            .bind(name)
            .bind(description)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.last_insert_rowid())
    }
}

#[derive(sqlx::FromRow)]
struct StoryRow {
    story_id: i64,
    week_number: i64,
    day_letter: String,
    author_id: String,
    author_name: String,
    video_url: Option<String>,
    last_revision: Option<String>,
}

/// A line row joined with its audio reference
#[derive(Debug, sqlx::FromRow)]
pub struct LineRow {
    pub line_number: i64,
    pub text: String,
    pub audio_ref: Option<String>,
}
