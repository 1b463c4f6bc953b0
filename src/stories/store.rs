//! Story authoring and retrieval
//!
//! Whole-story reads assemble lines and annotations from a single pooled
//! connection; writes run in one transaction each.

use sqlx::SqlitePool;

use super::repository::StoryRepository;
use super::types::{NewStory, NewStoryLine, Story, StoryLine};
use crate::annotations::{AnnotationRepository, LineAnnotations};
use crate::error::{log_failure, AppError, Result};

/// Story-level operations over the pool
pub struct StoryStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> StoryStore<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a story with lines numbered 1..=n, returning its ID.
    /// Every linked grammar point must already exist.
    pub async fn create_story(&self, story: &NewStory) -> Result<i64> {
        self.create_story_inner(story)
            .await
            .inspect_err(|e| log_failure(e, "create story", None, None))
    }

    async fn create_story_inner(&self, story: &NewStory) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let story_id = {
            let mut stories = StoryRepository::new(&mut tx);
            let story_id = stories.insert_story(story).await?;
            for (index, line) in story.lines.iter().enumerate() {
                stories
                    .upsert_line(story_id, index as i64 + 1, &line.text, line.audio_ref.as_deref())
                    .await?;
            }
            story_id
        };

        tx.commit().await?;

        tracing::info!(story_id, lines = story.lines.len(), "Created story");
        Ok(story_id)
    }

    /// Re-save a story's text wholesale.
    ///
    /// Lines 1..=n get the new text and keep their annotations. Lines past the
    /// new end are removed along with everything anchored to them.
    pub async fn replace_lines(&self, story_id: i64, lines: &[NewStoryLine]) -> Result<()> {
        self.replace_lines_inner(story_id, lines)
            .await
            .inspect_err(|e| log_failure(e, "replace lines", Some(story_id), None))
    }

    async fn replace_lines_inner(&self, story_id: i64, lines: &[NewStoryLine]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if !StoryRepository::new(&mut tx).story_exists(story_id).await? {
            return Err(AppError::NotFound(format!("Story not found: {}", story_id)));
        }

        let last_line = lines.len() as i64;
        let removed_annotations = AnnotationRepository::new(&mut tx)
            .delete_beyond_line(story_id, last_line)
            .await?;

        let mut stories = StoryRepository::new(&mut tx);
        let removed_lines = stories.delete_lines_beyond(story_id, last_line).await?;
        for (index, line) in lines.iter().enumerate() {
            stories
                .upsert_line(story_id, index as i64 + 1, &line.text, line.audio_ref.as_deref())
                .await?;
        }
        stories.bump_last_revision(story_id).await?;

        tx.commit().await?;

        tracing::info!(
            story_id,
            lines = lines.len(),
            removed_lines,
            removed_annotations,
            "Replaced story text"
        );
        Ok(())
    }

    /// Fetch a story with every line and its annotations
    pub async fn get_story(&self, story_id: i64) -> Result<Story> {
        let mut conn = self.pool.acquire().await?;

        let mut stories = StoryRepository::new(&mut conn);
        let metadata = stories
            .metadata(story_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Story not found: {}", story_id)))?;
        let rows = stories.lines(story_id).await?;

        let mut annotations = AnnotationRepository::new(&mut conn)
            .list_for_story(story_id)
            .await?;

        let lines = rows
            .into_iter()
            .map(|row| {
                let line_annotations = annotations.remove(&row.line_number).unwrap_or_default();
                StoryLine {
                    audio_ref: row.audio_ref,
                    ..StoryLine::new(row.line_number, row.text)
                }
                .with_annotations(line_annotations)
            })
            .collect();

        Ok(Story { metadata, lines })
    }

    /// Fetch one line with its annotations
    pub async fn get_line(&self, story_id: i64, line_number: i64) -> Result<StoryLine> {
        let mut conn = self.pool.acquire().await?;

        let text = StoryRepository::new(&mut conn)
            .line_text(story_id, line_number)
            .await?
            .ok_or_else(|| line_not_found(story_id, line_number))?;
        let annotations = self.line_annotations_on(&mut conn, story_id, line_number).await?;

        Ok(StoryLine::new(line_number, text).with_annotations(annotations))
    }

    /// Annotations of one line; `NotFound` when the line does not exist
    pub async fn get_line_annotations(
        &self,
        story_id: i64,
        line_number: i64,
    ) -> Result<LineAnnotations> {
        let mut conn = self.pool.acquire().await?;

        if !StoryRepository::new(&mut conn)
            .line_exists(story_id, line_number)
            .await?
        {
            return Err(line_not_found(story_id, line_number));
        }
        self.line_annotations_on(&mut conn, story_id, line_number).await
    }

    async fn line_annotations_on(
        &self,
        conn: &mut sqlx::SqliteConnection,
        story_id: i64,
        line_number: i64,
    ) -> Result<LineAnnotations> {
        AnnotationRepository::new(conn)
            .list_for_line(story_id, line_number)
            .await
    }

    pub async fn create_grammar_point(&self, name: &str, description: Option<&str>) -> Result<i64> {
        self.create_grammar_point_inner(name, description)
            .await
            .inspect_err(|e| log_failure(e, "create grammar point", None, None))
    }

    async fn create_grammar_point_inner(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        let id = StoryRepository::new(&mut conn)
            .create_grammar_point(name, description)
            .await?;

        tracing::info!(grammar_point_id = id, name, "Created grammar point");
        Ok(id)
    }
}

pub(crate) fn line_not_found(story_id: i64, line_number: i64) -> AppError {
    AppError::NotFound(format!("Line {} not found in story {}", line_number, story_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{AnnotationStore, NewAnnotation, Span, VocabularyItem};
    use crate::config::DedupConfig;
    use crate::db::test_support::{memory_pool, seed_story};
    use crate::stories::Description;

    #[tokio::test]
    async fn test_create_and_get_story() {
        let pool = memory_pool().await;
        let store = StoryStore::new(&pool);

        let grammar_point = store
            .create_grammar_point("past tense", Some("Regular -ed endings"))
            .await
            .unwrap();

        let story = NewStory {
            description: Some(Description {
                language: "en".to_string(),
                text: "A short breakfast scene".to_string(),
            }),
            grammar_point_ids: vec![grammar_point],
            lines: vec![
                NewStoryLine {
                    text: "I eat rice.".to_string(),
                    audio_ref: Some("audio/1.mp3".to_string()),
                },
                NewStoryLine {
                    text: "You drink tea.".to_string(),
                    audio_ref: None,
                },
            ],
            ..NewStory::sample()
        };

        let story_id = store.create_story(&story).await.unwrap();
        let loaded = store.get_story(story_id).await.unwrap();

        assert_eq!(loaded.metadata.title["en"], "Breakfast");
        assert_eq!(loaded.metadata.grammar_points.len(), 1);
        assert_eq!(loaded.metadata.grammar_points[0].name, "past tense");
        assert!(loaded.metadata.last_revision.is_some());
        assert_eq!(loaded.lines.len(), 2);
        assert_eq!(loaded.lines[0].line_number, 1);
        assert_eq!(loaded.lines[0].audio_ref.as_deref(), Some("audio/1.mp3"));
        assert_eq!(loaded.lines[1].line_number, 2);
        assert_eq!(loaded.lines[1].audio_ref, None);
    }

    #[tokio::test]
    async fn test_missing_story_and_line() {
        let pool = memory_pool().await;
        let store = StoryStore::new(&pool);
        let story_id = seed_story(&pool, &["only line"]).await;

        assert!(matches!(store.get_story(999).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            store.get_line(story_id, 2).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(store.get_line(story_id, 1).await.unwrap().text, "only line");
    }

    #[tokio::test]
    async fn test_replace_lines_drops_trailing_annotations() {
        let pool = memory_pool().await;
        let story_id = seed_story(&pool, &["one two", "three four"]).await;

        let annotations = AnnotationStore::new(&pool, DedupConfig::default());
        for line_number in [1, 2] {
            annotations
                .insert(
                    story_id,
                    line_number,
                    &NewAnnotation::Vocabulary(VocabularyItem {
                        word: "one".to_string(),
                        lexical_form: "one".to_string(),
                        position: Span::new(0, 3).unwrap(),
                    }),
                )
                .await
                .unwrap();
        }

        let store = StoryStore::new(&pool);
        store
            .replace_lines(
                story_id,
                &[NewStoryLine {
                    text: "one more".to_string(),
                    audio_ref: None,
                }],
            )
            .await
            .unwrap();

        let story = store.get_story(story_id).await.unwrap();
        assert_eq!(story.lines.len(), 1);
        assert_eq!(story.lines[0].text, "one more");
        assert_eq!(story.lines[0].vocabulary.len(), 1);
    }

    #[tokio::test]
    async fn test_replace_lines_for_missing_story() {
        let pool = memory_pool().await;
        let result = StoryStore::new(&pool).replace_lines(42, &[]).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_story_with_unknown_grammar_point() {
        let pool = memory_pool().await;
        let store = StoryStore::new(&pool);
        let story = NewStory {
            grammar_point_ids: vec![404],
            ..NewStory::sample()
        };

        let result = store.create_story(&story).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let stories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stories")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stories, 0);
    }
}
