//! Clearing annotations and whole-story deletion
//!
//! Footnote references always go before their footnotes; story-owned rows go
//! before the story row. Foreign keys carry no `ON DELETE CASCADE`, so the
//! order here is what keeps deletes valid.

use sqlx::SqlitePool;

use super::repository::AnnotationRepository;
use crate::error::{log_failure, AppError, Result};
use crate::stories::{line_not_found, StoryRepository};

pub struct AnnotationClearer<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AnnotationClearer<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Remove every annotation of a story, keeping lines and metadata.
    /// Returns the number of rows deleted.
    pub async fn clear_story(&self, story_id: i64) -> Result<u64> {
        self.clear(story_id, None)
            .await
            .inspect_err(|e| log_failure(e, "clear story annotations", Some(story_id), None))
    }

    /// Remove every annotation on one line, keeping its text
    pub async fn clear_line(&self, story_id: i64, line_number: i64) -> Result<u64> {
        self.clear(story_id, Some(line_number))
            .await
            .inspect_err(|e| log_failure(e, "clear line annotations", Some(story_id), Some(line_number)))
    }

    async fn clear(&self, story_id: i64, line_number: Option<i64>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let mut stories = StoryRepository::new(&mut tx);
        match line_number {
            Some(line_number) => {
                if !stories.line_exists(story_id, line_number).await? {
                    return Err(line_not_found(story_id, line_number));
                }
            }
            None => {
                if !stories.story_exists(story_id).await? {
                    return Err(AppError::NotFound(format!("Story not found: {}", story_id)));
                }
            }
        }

        let mut annotations = AnnotationRepository::new(&mut tx);
        let deleted = match line_number {
            Some(line_number) => annotations.delete_for_line(story_id, line_number).await?,
            None => annotations.delete_for_story(story_id).await?,
        };

        StoryRepository::new(&mut tx)
            .bump_last_revision(story_id)
            .await?;
        tx.commit().await?;

        tracing::info!(story_id, ?line_number, deleted, "Annotations cleared");
        Ok(deleted)
    }

    /// Delete a story with its annotations, lines, titles, descriptions,
    /// audio references and grammar-point associations
    pub async fn delete_story(&self, story_id: i64) -> Result<()> {
        self.delete_story_inner(story_id)
            .await
            .inspect_err(|e| log_failure(e, "delete story", Some(story_id), None))
    }

    async fn delete_story_inner(&self, story_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if !StoryRepository::new(&mut tx).story_exists(story_id).await? {
            return Err(AppError::NotFound(format!("Story not found: {}", story_id)));
        }

        let annotations = AnnotationRepository::new(&mut tx)
            .delete_for_story(story_id)
            .await?;
        let rows = StoryRepository::new(&mut tx)
            .delete_story_rows(story_id)
            .await?;
        tx.commit().await?;

        tracing::info!(story_id, annotations, rows, "Story deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{
        AnnotationStore, GrammarItem, NewFootnote, NewLineAnnotations, Span, VocabularyItem,
    };
    use crate::config::DedupConfig;
    use crate::db::test_support::{memory_pool, seed_story};
    use crate::stories::{Description, NewStory, NewStoryLine, StoryStore};

    fn full_line() -> NewLineAnnotations {
        NewLineAnnotations {
            vocabulary: vec![VocabularyItem {
                word: "eat".to_string(),
                lexical_form: "eat (v.)".to_string(),
                position: Span::new(2, 5).unwrap(),
            }],
            grammar: vec![GrammarItem {
                grammar_point_id: None,
                text: "I".to_string(),
                position: Span::new(0, 1).unwrap(),
            }],
            footnotes: vec![NewFootnote {
                text: "staple".to_string(),
                references: vec!["1".to_string(), "2".to_string()],
            }],
        }
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_clear_story_keeps_text_and_metadata() {
        let pool = memory_pool().await;
        let story_id = seed_story(&pool, &["I eat rice.", "I eat bread."]).await;
        let store = AnnotationStore::new(&pool, DedupConfig::default());
        store.add_line_annotations(story_id, 1, &full_line()).await.unwrap();
        store.add_line_annotations(story_id, 2, &full_line()).await.unwrap();

        let stories = StoryStore::new(&pool);
        let before = stories.get_story(story_id).await.unwrap();

        let deleted = AnnotationClearer::new(&pool).clear_story(story_id).await.unwrap();
        assert_eq!(deleted, 10);

        let after = stories.get_story(story_id).await.unwrap();
        assert!(after.lines.iter().all(|line| {
            line.vocabulary.is_empty() && line.grammar.is_empty() && line.footnotes.is_empty()
        }));
        let texts = |story: &crate::stories::Story| {
            story.lines.iter().map(|l| l.text.clone()).collect::<Vec<_>>()
        };
        assert_eq!(texts(&before), texts(&after));
        assert_eq!(before.metadata.title, after.metadata.title);
        assert_eq!(count(&pool, "footnote_references").await, 0);
    }

    #[tokio::test]
    async fn test_clear_line_leaves_other_lines() {
        let pool = memory_pool().await;
        let story_id = seed_story(&pool, &["I eat rice.", "I eat bread."]).await;
        let store = AnnotationStore::new(&pool, DedupConfig::default());
        store.add_line_annotations(story_id, 1, &full_line()).await.unwrap();
        store.add_line_annotations(story_id, 2, &full_line()).await.unwrap();

        let clearer = AnnotationClearer::new(&pool);
        clearer.clear_line(story_id, 1).await.unwrap();

        let stories = StoryStore::new(&pool);
        assert!(stories.get_line_annotations(story_id, 1).await.unwrap().is_empty());
        let second = stories.get_line_annotations(story_id, 2).await.unwrap();
        assert_eq!(second.footnotes[0].references, vec!["1", "2"]);

        assert!(matches!(
            clearer.clear_line(story_id, 3).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            clearer.clear_story(story_id + 1).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_line_bumps_revision() {
        let pool = memory_pool().await;
        let story_id = seed_story(&pool, &["I eat rice."]).await;
        AnnotationStore::new(&pool, DedupConfig::default())
            .add_line_annotations(story_id, 1, &full_line())
            .await
            .unwrap();
        sqlx::query("UPDATE stories SET last_revision = NULL WHERE story_id = ?")
            .bind(story_id)
            .execute(&pool)
            .await
            .unwrap();

        AnnotationClearer::new(&pool).clear_line(story_id, 1).await.unwrap();

        let story = StoryStore::new(&pool).get_story(story_id).await.unwrap();
        assert!(story.metadata.last_revision.is_some());
    }

    #[tokio::test]
    async fn test_delete_story_removes_everything_it_owns() {
        let pool = memory_pool().await;
        let stories = StoryStore::new(&pool);
        let grammar_point = stories.create_grammar_point("articles", None).await.unwrap();
        let story = NewStory {
            description: Some(Description {
                language: "en".to_string(),
                text: "Lunch".to_string(),
            }),
            grammar_point_ids: vec![grammar_point],
            lines: vec![NewStoryLine {
                text: "I eat rice.".to_string(),
                audio_ref: Some("audio/1.mp3".to_string()),
            }],
            ..NewStory::sample()
        };
        let story_id = stories.create_story(&story).await.unwrap();
        let keep = seed_story(&pool, &["I eat rice."]).await;

        let store = AnnotationStore::new(&pool, DedupConfig::default());
        store.add_line_annotations(story_id, 1, &full_line()).await.unwrap();
        store.add_line_annotations(keep, 1, &full_line()).await.unwrap();

        AnnotationClearer::new(&pool).delete_story(story_id).await.unwrap();

        assert!(matches!(stories.get_story(story_id).await, Err(AppError::NotFound(_))));
        for table in [
            "line_audio",
            "story_descriptions",
            "story_grammar_points",
        ] {
            assert_eq!(count(&pool, table).await, 0, "{} not emptied", table);
        }
        assert_eq!(count(&pool, "footnote_references").await, 2);
        assert_eq!(count(&pool, "grammar_points").await, 1);

        let kept = stories.get_story(keep).await.unwrap();
        assert_eq!(kept.lines[0].vocabulary.len(), 1);
    }
}
