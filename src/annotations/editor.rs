//! Targeted annotation edits

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::repository::AnnotationRepository;
use super::types::Span;
use crate::error::{log_failure, AppError, Result};
use crate::stories::{line_not_found, StoryRepository};

/// Which annotation(s) to change, and the replacement values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "selector", rename_all = "camelCase")]
pub enum AnnotationEdit {
    /// Replace the vocabulary item at an exact position
    #[serde(rename_all = "camelCase")]
    VocabularyAt {
        line_number: i64,
        position: Span,
        word: String,
        lexical_form: String,
    },
    /// Replace the label of the grammar item at an exact position
    #[serde(rename_all = "camelCase")]
    GrammarAt {
        line_number: i64,
        position: Span,
        text: String,
    },
    /// Retag every vocabulary item on the line with this surface word.
    /// Matching nothing is not an error.
    #[serde(rename_all = "camelCase")]
    VocabularyByWord {
        line_number: i64,
        word: String,
        lexical_form: String,
    },
    /// Replace a footnote's text and its whole reference list
    #[serde(rename_all = "camelCase")]
    Footnote {
        footnote_id: i64,
        text: String,
        #[serde(default)]
        references: Vec<String>,
    },
}

impl AnnotationEdit {
    fn line_number(&self) -> Option<i64> {
        match self {
            AnnotationEdit::VocabularyAt { line_number, .. }
            | AnnotationEdit::GrammarAt { line_number, .. }
            | AnnotationEdit::VocabularyByWord { line_number, .. } => Some(*line_number),
            AnnotationEdit::Footnote { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EditOutcome {
    /// Annotation rows changed
    pub updated: u64,
}

pub struct AnnotationEditor<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AnnotationEditor<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply one edit and bump the story revision in the same transaction
    pub async fn edit(&self, story_id: i64, edit: &AnnotationEdit) -> Result<EditOutcome> {
        self.edit_inner(story_id, edit)
            .await
            .inspect_err(|e| log_failure(e, "edit annotation", Some(story_id), edit.line_number()))
    }

    async fn edit_inner(&self, story_id: i64, edit: &AnnotationEdit) -> Result<EditOutcome> {
        let mut tx = self.pool.begin().await?;

        if let Some(line_number) = edit.line_number() {
            if !StoryRepository::new(&mut tx)
                .line_exists(story_id, line_number)
                .await?
            {
                return Err(line_not_found(story_id, line_number));
            }
        }

        let updated = {
            let mut repo = AnnotationRepository::new(&mut tx);
            match edit {
                AnnotationEdit::VocabularyAt {
                    line_number,
                    position,
                    word,
                    lexical_form,
                } => {
                    let updated = repo
                        .update_vocabulary_at(story_id, *line_number, *position, word, lexical_form)
                        .await?;
                    if updated == 0 {
                        return Err(AppError::NotFound(format!(
                            "No vocabulary item at [{}, {}) on line {}",
                            position.start, position.end, line_number
                        )));
                    }
                    updated
                }
                AnnotationEdit::GrammarAt {
                    line_number,
                    position,
                    text,
                } => {
                    let updated = repo
                        .update_grammar_at(story_id, *line_number, *position, text)
                        .await?;
                    if updated == 0 {
                        return Err(AppError::NotFound(format!(
                            "No grammar item at [{}, {}) on line {}",
                            position.start, position.end, line_number
                        )));
                    }
                    updated
                }
                AnnotationEdit::VocabularyByWord {
                    line_number,
                    word,
                    lexical_form,
                } => {
                    repo.update_vocabulary_by_word(story_id, *line_number, word, lexical_form)
                        .await?
                }
                AnnotationEdit::Footnote {
                    footnote_id,
                    text,
                    references,
                } => {
                    if repo.update_footnote_text(story_id, *footnote_id, text).await? == 0 {
                        return Err(AppError::NotFound(format!(
                            "Footnote not found: {}",
                            footnote_id
                        )));
                    }
                    repo.delete_footnote_references(*footnote_id).await?;
                    for reference in references {
                        repo.insert_footnote_reference(*footnote_id, reference).await?;
                    }
                    1
                }
            }
        };

        StoryRepository::new(&mut tx)
            .bump_last_revision(story_id)
            .await?;
        tx.commit().await?;

        tracing::info!(story_id, line_number = ?edit.line_number(), updated, "Annotation edited");
        Ok(EditOutcome { updated })
    }
}
