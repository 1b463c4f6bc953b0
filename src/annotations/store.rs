//! Deduplicating annotation store
//!
//! Every insert runs in one transaction: line lookup, interval check, dedup
//! lookup, the row writes and the story revision bump either all commit or
//! none do.

use sqlx::{SqliteConnection, SqlitePool};

use super::repository::AnnotationRepository;
use super::types::{
    sorted, Annotation, Footnote, GrammarItem, NewAnnotation, NewFootnote, NewLineAnnotations,
    VocabularyItem,
};
use crate::config::DedupConfig;
use crate::error::{log_failure, AppError, Result};
use crate::stories::{line_not_found, StoryRepository};

/// Insert-or-reject store for the three annotation kinds
pub struct AnnotationStore<'a> {
    pool: &'a SqlitePool,
    dedup: DedupConfig,
}

impl<'a> AnnotationStore<'a> {
    pub fn new(pool: &'a SqlitePool, dedup: DedupConfig) -> Self {
        Self { pool, dedup }
    }

    /// Insert one annotation on a line.
    ///
    /// Returns `AlreadyExists` when dedup is enabled for the kind and an
    /// identical annotation is stored, `NotFound` when the line does not
    /// exist and `InvalidInput` when the interval falls outside the line.
    pub async fn insert(
        &self,
        story_id: i64,
        line_number: i64,
        annotation: &NewAnnotation,
    ) -> Result<Annotation> {
        self.insert_inner(story_id, line_number, annotation)
            .await
            .inspect_err(|e| log_failure(e, "insert annotation", Some(story_id), Some(line_number)))
    }

    async fn insert_inner(
        &self,
        story_id: i64,
        line_number: i64,
        annotation: &NewAnnotation,
    ) -> Result<Annotation> {
        let mut tx = self.pool.begin().await?;

        let line_len = line_length(&mut tx, story_id, line_number).await?;
        let mut inserter = Inserter {
            conn: &mut tx,
            dedup: self.dedup,
            story_id,
            line_number,
            line_len,
        };

        let stored = match annotation {
            NewAnnotation::Vocabulary(item) => {
                inserter.vocabulary(item).await?;
                Annotation::Vocabulary(item.clone())
            }
            NewAnnotation::Grammar(item) => {
                inserter.grammar(item).await?;
                Annotation::Grammar(item.clone())
            }
            NewAnnotation::Footnote(footnote) => Annotation::Footnote(inserter.footnote(footnote).await?),
        };

        StoryRepository::new(&mut tx)
            .bump_last_revision(story_id)
            .await?;
        tx.commit().await?;

        tracing::info!(story_id, line_number, kind = %annotation.kind(), "Annotation created");
        Ok(stored)
    }

    /// Insert a line's vocabulary, then grammar, then footnotes as one unit.
    ///
    /// The first rejected item aborts the batch and nothing is written.
    /// Returns the created footnotes with their assigned IDs.
    pub async fn add_line_annotations(
        &self,
        story_id: i64,
        line_number: i64,
        batch: &NewLineAnnotations,
    ) -> Result<Vec<Footnote>> {
        self.add_line_annotations_inner(story_id, line_number, batch)
            .await
            .inspect_err(|e| log_failure(e, "add line annotations", Some(story_id), Some(line_number)))
    }

    async fn add_line_annotations_inner(
        &self,
        story_id: i64,
        line_number: i64,
        batch: &NewLineAnnotations,
    ) -> Result<Vec<Footnote>> {
        let mut tx = self.pool.begin().await?;

        let line_len = line_length(&mut tx, story_id, line_number).await?;
        let mut inserter = Inserter {
            conn: &mut tx,
            dedup: self.dedup,
            story_id,
            line_number,
            line_len,
        };

        for item in &batch.vocabulary {
            inserter.vocabulary(item).await?;
        }
        for item in &batch.grammar {
            inserter.grammar(item).await?;
        }
        let mut footnotes = Vec::with_capacity(batch.footnotes.len());
        for footnote in &batch.footnotes {
            footnotes.push(inserter.footnote(footnote).await?);
        }

        StoryRepository::new(&mut tx)
            .bump_last_revision(story_id)
            .await?;
        tx.commit().await?;

        tracing::info!(
            story_id,
            line_number,
            vocabulary = batch.vocabulary.len(),
            grammar = batch.grammar.len(),
            footnotes = batch.footnotes.len(),
            "Line annotations created"
        );
        Ok(footnotes)
    }
}

/// Line length in code points, or `NotFound`
async fn line_length(conn: &mut SqliteConnection, story_id: i64, line_number: i64) -> Result<usize> {
    let text = StoryRepository::new(conn)
        .line_text(story_id, line_number)
        .await?
        .ok_or_else(|| line_not_found(story_id, line_number))?;

    Ok(text.chars().count())
}

/// Per-line insert steps sharing one open transaction
struct Inserter<'c> {
    conn: &'c mut SqliteConnection,
    dedup: DedupConfig,
    story_id: i64,
    line_number: i64,
    line_len: usize,
}

impl Inserter<'_> {
    async fn vocabulary(&mut self, item: &VocabularyItem) -> Result<()> {
        item.position
            .check_within(self.line_len)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let mut repo = AnnotationRepository::new(&mut *self.conn);
        if self.dedup.vocabulary
            && repo
                .vocabulary_exists(self.story_id, self.line_number, item)
                .await?
        {
            tracing::debug!(
                story_id = self.story_id,
                line_number = self.line_number,
                word = %item.word,
                "Duplicate vocabulary item"
            );
            return Err(AppError::AlreadyExists(format!(
                "Vocabulary item '{}' at [{}, {}) on line {}",
                item.word, item.position.start, item.position.end, self.line_number
            )));
        }

        repo.insert_vocabulary(self.story_id, self.line_number, item)
            .await?;
        Ok(())
    }

    async fn grammar(&mut self, item: &GrammarItem) -> Result<()> {
        item.position
            .check_within(self.line_len)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        if let Some(grammar_point_id) = item.grammar_point_id {
            if !StoryRepository::new(&mut *self.conn)
                .grammar_point_exists(grammar_point_id)
                .await?
            {
                return Err(AppError::InvalidInput(format!(
                    "Unknown grammar point: {}",
                    grammar_point_id
                )));
            }
        }

        let mut repo = AnnotationRepository::new(&mut *self.conn);
        if self.dedup.grammar
            && repo
                .grammar_exists(self.story_id, self.line_number, item)
                .await?
        {
            tracing::debug!(
                story_id = self.story_id,
                line_number = self.line_number,
                text = %item.text,
                "Duplicate grammar item"
            );
            return Err(AppError::AlreadyExists(format!(
                "Grammar item '{}' at [{}, {}) on line {}",
                item.text, item.position.start, item.position.end, self.line_number
            )));
        }

        repo.insert_grammar(self.story_id, self.line_number, item)
            .await?;
        Ok(())
    }

    async fn footnote(&mut self, footnote: &NewFootnote) -> Result<Footnote> {
        let mut repo = AnnotationRepository::new(&mut *self.conn);
        if self.dedup.footnotes {
            let wanted = footnote.sorted_references();
            let candidates = repo
                .footnotes_with_text(self.story_id, self.line_number, &footnote.text)
                .await?;
            for footnote_id in candidates {
                let existing = repo.footnote_references(footnote_id).await?;
                if sorted(&existing) == wanted {
                    tracing::debug!(
                        story_id = self.story_id,
                        line_number = self.line_number,
                        footnote_id,
                        "Duplicate footnote"
                    );
                    return Err(AppError::AlreadyExists(format!(
                        "Footnote {} on line {} has the same text and references",
                        footnote_id, self.line_number
                    )));
                }
            }
        }

        let id = repo
            .insert_footnote(self.story_id, self.line_number, &footnote.text)
            .await?;
        for reference in &footnote.references {
            repo.insert_footnote_reference(id, reference).await?;
        }

        Ok(Footnote {
            id,
            text: footnote.text.clone(),
            references: footnote.references.clone(),
        })
    }
}
