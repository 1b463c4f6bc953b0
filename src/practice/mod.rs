//! Learner-facing practice: rendering lines and checking answers
//!
//! The service fetches a story once per call and hands it to the pure
//! rendering and validation functions.

mod validation;

pub use validation::{validate_answers, AnswerResult, AnswerSubmission, ValidationError};

use serde::Serialize;
use sqlx::SqlitePool;

use crate::config::MarkerConfig;
use crate::error::{log_failure, Result};
use crate::render::{self, RenderMode, RenderedLine, RenderedStory};
use crate::stories::{line_not_found, StoryStore};

/// A single rendered line; the bank covers the whole story
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineView {
    #[serde(flatten)]
    pub line: RenderedLine,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocabulary_bank: Option<Vec<String>>,
}

pub struct PracticeService<'a> {
    pool: &'a SqlitePool,
    markers: &'a MarkerConfig,
}

impl<'a> PracticeService<'a> {
    pub fn new(pool: &'a SqlitePool, markers: &'a MarkerConfig) -> Self {
        Self { pool, markers }
    }

    pub async fn render_story(&self, story_id: i64, mode: RenderMode) -> Result<RenderedStory> {
        let story = StoryStore::new(self.pool).get_story(story_id).await?;
        Ok(render::render_story(&story, mode, self.markers))
    }

    /// Render one line by its 1-based line number
    pub async fn render_line(
        &self,
        story_id: i64,
        line_number: i64,
        mode: RenderMode,
    ) -> Result<LineView> {
        let story = StoryStore::new(self.pool).get_story(story_id).await?;
        let line = story
            .lines
            .iter()
            .find(|line| line.line_number == line_number)
            .ok_or_else(|| line_not_found(story_id, line_number))?;

        Ok(LineView {
            line: render::render_story_line(line, mode, self.markers),
            vocabulary_bank: (mode == RenderMode::Vocabulary)
                .then(|| render::vocabulary_bank(&story)),
        })
    }

    /// Check a batch of vocabulary answers against the stored story
    pub async fn validate_answers(
        &self,
        story_id: i64,
        submissions: &[AnswerSubmission],
    ) -> Result<Vec<AnswerResult>> {
        let story = StoryStore::new(self.pool)
            .get_story(story_id)
            .await
            .inspect_err(|e| log_failure(e, "validate answers", Some(story_id), None))?;

        match validate_answers(&story, submissions) {
            Ok(results) => {
                let correct = results.iter().filter(|r| r.correct).count();
                tracing::debug!(story_id, total = results.len(), correct, "Answers checked");
                Ok(results)
            }
            Err(e) => {
                tracing::warn!(story_id, error = %e, "Rejected answer submission");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{AnnotationStore, NewAnnotation, Span, VocabularyItem};
    use crate::config::DedupConfig;
    use crate::db::test_support::{memory_pool, seed_story};
    use crate::error::AppError;

    async fn seeded() -> (SqlitePool, i64) {
        let pool = memory_pool().await;
        let story_id = seed_story(&pool, &["I eat rice.", "You drink tea."]).await;
        AnnotationStore::new(&pool, DedupConfig::default())
            .insert(
                story_id,
                1,
                &NewAnnotation::Vocabulary(VocabularyItem {
                    word: "eat".to_string(),
                    lexical_form: "eat (v.)".to_string(),
                    position: Span::new(2, 5).unwrap(),
                }),
            )
            .await
            .unwrap();
        (pool, story_id)
    }

    #[tokio::test]
    async fn test_render_line_with_bank() {
        let (pool, story_id) = seeded().await;
        let markers = MarkerConfig::default();
        let service = PracticeService::new(&pool, &markers);

        let view = service
            .render_line(story_id, 1, RenderMode::Vocabulary)
            .await
            .unwrap();
        assert_eq!(view.line.segments, vec!["I ", "<BLANK>", " rice."]);
        assert_eq!(view.vocabulary_bank, Some(vec!["eat (v.)".to_string()]));

        let plain = service.render_line(story_id, 2, RenderMode::Plain).await.unwrap();
        assert_eq!(plain.line.segments, vec!["You drink tea."]);
        assert!(plain.vocabulary_bank.is_none());

        assert!(matches!(
            service.render_line(story_id, 3, RenderMode::Plain).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_validate_against_stored_story() {
        let (pool, story_id) = seeded().await;
        let markers = MarkerConfig::default();
        let service = PracticeService::new(&pool, &markers);

        let results = service
            .validate_answers(
                story_id,
                &[AnswerSubmission {
                    line_number: 0,
                    answers: vec!["eat (v.)".to_string()],
                }],
            )
            .await
            .unwrap();
        assert!(results[0].correct);

        let rejected = service
            .validate_answers(
                story_id,
                &[AnswerSubmission {
                    line_number: 1,
                    answers: vec!["tea".to_string()],
                }],
            )
            .await;
        match rejected {
            Err(AppError::InvalidAnswers(e)) => {
                assert_eq!(e.expected_answers.get(&0), Some(&1));
                assert_eq!(e.expected_answers.get(&1), Some(&0));
            }
            other => panic!("expected invalid answers, got {:?}", other),
        }
    }
}
