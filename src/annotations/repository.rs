//! SQLite primitives for annotation rows
//!
//! The repository borrows a single connection so that callers can run it
//! inside a transaction (`&mut *tx`) or on a pooled connection for reads.

use std::collections::{BTreeMap, HashMap};

use sqlx::SqliteConnection;

use super::types::{Footnote, GrammarItem, LineAnnotations, Span, VocabularyItem};
use crate::error::Result;

/// Repository for vocabulary, grammar and footnote rows
pub struct AnnotationRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> AnnotationRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    // ------------------------------------------------------------------
    // Vocabulary
    // ------------------------------------------------------------------

    /// Exact identity match on (story, line, word, lexical form, start, end)
    pub async fn vocabulary_exists(
        &mut self,
        story_id: i64,
        line_number: i64,
        item: &VocabularyItem,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM vocabulary_items
                WHERE story_id = ? AND line_number = ? AND word = ? AND lexical_form = ?
                  AND position_start = ? AND position_end = ?
            )
            "#,
        )
        .bind(story_id)
        .bind(line_number)
        .bind(&item.word)
        .bind(&item.lexical_form)
        .bind(item.position.start as i64)
        .bind(item.position.end as i64)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(exists)
    }

    pub async fn insert_vocabulary(
        &mut self,
        story_id: i64,
        line_number: i64,
        item: &VocabularyItem,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO vocabulary_items (story_id, line_number, word, lexical_form, position_start, position_end)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(story_id)
        .bind(line_number)
        .bind(&item.word)
        .bind(&item.lexical_form)
        .bind(item.position.start as i64)
        .bind(item.position.end as i64)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Replace word and lexical form of the item at an exact position
    pub async fn update_vocabulary_at(
        &mut self,
        story_id: i64,
        line_number: i64,
        position: Span,
        word: &str,
        lexical_form: &str,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE vocabulary_items
            SET word = ?, lexical_form = ?
            WHERE story_id = ? AND line_number = ? AND position_start = ? AND position_end = ?
            "#,
        )
        .bind(word)
        .bind(lexical_form)
        .bind(story_id)
        .bind(line_number)
        .bind(position.start as i64)
        .bind(position.end as i64)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Set the lexical form of every item on the line with this surface word
    pub async fn update_vocabulary_by_word(
        &mut self,
        story_id: i64,
        line_number: i64,
        word: &str,
        lexical_form: &str,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE vocabulary_items
            SET lexical_form = ?
            WHERE story_id = ? AND line_number = ? AND word = ?
            "#,
        )
        .bind(lexical_form)
        .bind(story_id)
        .bind(line_number)
        .bind(word)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected())
    }

    // ------------------------------------------------------------------
    // Grammar
    // ------------------------------------------------------------------

    /// Exact identity match on (story, line, text, start, end)
    pub async fn grammar_exists(
        &mut self,
        story_id: i64,
        line_number: i64,
        item: &GrammarItem,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM grammar_items
                WHERE story_id = ? AND line_number = ? AND text = ?
                  AND position_start = ? AND position_end = ?
            )
            "#,
        )
        .bind(story_id)
        .bind(line_number)
        .bind(&item.text)
        .bind(item.position.start as i64)
        .bind(item.position.end as i64)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(exists)
    }

    pub async fn insert_grammar(
        &mut self,
        story_id: i64,
        line_number: i64,
        item: &GrammarItem,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO grammar_items (story_id, line_number, grammar_point_id, text, position_start, position_end)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(story_id)
        .bind(line_number)
        .bind(item.grammar_point_id)
        .bind(&item.text)
        .bind(item.position.start as i64)
        .bind(item.position.end as i64)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update_grammar_at(
        &mut self,
        story_id: i64,
        line_number: i64,
        position: Span,
        text: &str,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE grammar_items
            SET text = ?
            WHERE story_id = ? AND line_number = ? AND position_start = ? AND position_end = ?
            "#,
        )
        .bind(text)
        .bind(story_id)
        .bind(line_number)
        .bind(position.start as i64)
        .bind(position.end as i64)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected())
    }

    // ------------------------------------------------------------------
    // Footnotes
    // ------------------------------------------------------------------

    /// IDs of footnotes on the line whose text matches exactly
    pub async fn footnotes_with_text(
        &mut self,
        story_id: i64,
        line_number: i64,
        text: &str,
    ) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM footnotes
            WHERE story_id = ? AND line_number = ? AND footnote_text = ?
            ORDER BY id
            "#,
        )
        .bind(story_id)
        .bind(line_number)
        .bind(text)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(ids)
    }

    /// References of one footnote in insertion order
    pub async fn footnote_references(&mut self, footnote_id: i64) -> Result<Vec<String>> {
        let refs: Vec<String> = sqlx::query_scalar(
            "SELECT reference FROM footnote_references WHERE footnote_id = ? ORDER BY id",
        )
        .bind(footnote_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(refs)
    }

    pub async fn insert_footnote(
        &mut self,
        story_id: i64,
        line_number: i64,
        text: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO footnotes (story_id, line_number, footnote_text) VALUES (?, ?, ?)",
        )
        .bind(story_id)
        .bind(line_number)
        .bind(text)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn insert_footnote_reference(&mut self, footnote_id: i64, reference: &str) -> Result<()> {
        sqlx::query("INSERT INTO footnote_references (footnote_id, reference) VALUES (?, ?)")
            .bind(footnote_id)
            .bind(reference)
            .execute(&mut *self.conn)
            .await?;

        Ok(())
    }

    pub async fn update_footnote_text(
        &mut self,
        story_id: i64,
        footnote_id: i64,
        text: &str,
    ) -> Result<u64> {
        let result =
            sqlx::query("UPDATE footnotes SET footnote_text = ? WHERE id = ? AND story_id = ?")
                .bind(text)
                .bind(footnote_id)
                .bind(story_id)
                .execute(&mut *self.conn)
                .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_footnote_references(&mut self, footnote_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM footnote_references WHERE footnote_id = ?")
            .bind(footnote_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected())
    }

    // ------------------------------------------------------------------
    // Listing
    // ------------------------------------------------------------------

    /// All annotations of one line
    pub async fn list_for_line(&mut self, story_id: i64, line_number: i64) -> Result<LineAnnotations> {
        let mut by_line = self.list(story_id, Some(line_number)).await?;
        Ok(by_line.remove(&line_number).unwrap_or_default())
    }

    /// All annotations of a story keyed by line number; lines without
    /// annotations are absent
    pub async fn list_for_story(&mut self, story_id: i64) -> Result<BTreeMap<i64, LineAnnotations>> {
        self.list(story_id, None).await
    }

    async fn list(
        &mut self,
        story_id: i64,
        line_number: Option<i64>,
    ) -> Result<BTreeMap<i64, LineAnnotations>> {
        let mut lines: BTreeMap<i64, LineAnnotations> = BTreeMap::new();

        let vocabulary = sqlx::query_as::<_, VocabularyRow>(
            r#"
            SELECT line_number, word, lexical_form, position_start, position_end
            FROM vocabulary_items
            WHERE story_id = ? AND (? IS NULL OR line_number = ?)
            ORDER BY id
            "#,
        )
        .bind(story_id)
        .bind(line_number)
        .bind(line_number)
        .fetch_all(&mut *self.conn)
        .await?;

        for row in vocabulary {
            lines
                .entry(row.line_number)
                .or_default()
                .vocabulary
                .push(row.into_item());
        }

        let grammar = sqlx::query_as::<_, GrammarRow>(
            r#"
            SELECT line_number, grammar_point_id, text, position_start, position_end
            FROM grammar_items
            WHERE story_id = ? AND (? IS NULL OR line_number = ?)
            ORDER BY id
            "#,
        )
        .bind(story_id)
        .bind(line_number)
        .bind(line_number)
        .fetch_all(&mut *self.conn)
        .await?;

        for row in grammar {
            lines
                .entry(row.line_number)
                .or_default()
                .grammar
                .push(row.into_item());
        }

        let footnotes = sqlx::query_as::<_, FootnoteRow>(
            r#"
            SELECT id, line_number, footnote_text
            FROM footnotes
            WHERE story_id = ? AND (? IS NULL OR line_number = ?)
            ORDER BY id
            "#,
        )
        .bind(story_id)
        .bind(line_number)
        .bind(line_number)
        .fetch_all(&mut *self.conn)
        .await?;

        if !footnotes.is_empty() {
            let reference_rows: Vec<(i64, String)> = sqlx::query_as(
                r#"
                SELECT fr.footnote_id, fr.reference
                FROM footnote_references fr
                JOIN footnotes f ON f.id = fr.footnote_id
                WHERE f.story_id = ? AND (? IS NULL OR f.line_number = ?)
                ORDER BY fr.id
                "#,
            )
            .bind(story_id)
            .bind(line_number)
            .bind(line_number)
            .fetch_all(&mut *self.conn)
            .await?;

            let mut references: HashMap<i64, Vec<String>> = HashMap::new();
            for (footnote_id, reference) in reference_rows {
                references.entry(footnote_id).or_default().push(reference);
            }

            for row in footnotes {
                lines.entry(row.line_number).or_default().footnotes.push(Footnote {
                    references: references.remove(&row.id).unwrap_or_default(),
                    id: row.id,
                    text: row.footnote_text,
                });
            }
        }

        Ok(lines)
    }

    // ------------------------------------------------------------------
    // Deletion (reference rows before the footnotes they point at)
    // ------------------------------------------------------------------

    /// Remove every annotation on one line, returning the number of rows deleted
    pub async fn delete_for_line(&mut self, story_id: i64, line_number: i64) -> Result<u64> {
        self.delete(story_id, Some(line_number)).await
    }

    /// Remove every annotation of a story, returning the number of rows deleted
    pub async fn delete_for_story(&mut self, story_id: i64) -> Result<u64> {
        self.delete(story_id, None).await
    }

    /// Remove annotations on lines numbered above `last_line`
    pub async fn delete_beyond_line(&mut self, story_id: i64, last_line: i64) -> Result<u64> {
        let mut deleted = sqlx::query(
            r#"
            DELETE FROM footnote_references
            WHERE footnote_id IN (SELECT id FROM footnotes WHERE story_id = ? AND line_number > ?)
            "#,
        )
        .bind(story_id)
        .bind(last_line)
        .execute(&mut *self.conn)
        .await?
        .rows_affected();

        for table in ["footnotes", "vocabulary_items", "grammar_items"] {
            let sql = format!("DELETE FROM {} WHERE story_id = ? AND line_number > ?", table);
            deleted += sqlx::query(&sql)
                .bind(story_id)
                .bind(last_line)
                .execute(&mut *self.conn)
                .await?
                .rows_affected();
        }

        Ok(deleted)
    }

    async fn delete(&mut self, story_id: i64, line_number: Option<i64>) -> Result<u64> {
        let mut deleted = sqlx::query(
            r#"
            DELETE FROM footnote_references
            WHERE footnote_id IN (
                SELECT id FROM footnotes WHERE story_id = ? AND (? IS NULL OR line_number = ?)
            )
            "#,
        )
        .bind(story_id)
        .bind(line_number)
        .bind(line_number)
        .execute(&mut *self.conn)
        .await?
        .rows_affected();

        for table in ["footnotes", "vocabulary_items", "grammar_items"] {
            let sql = format!(
                "DELETE FROM {} WHERE story_id = ? AND (? IS NULL OR line_number = ?)",
                table
            );
            deleted += sqlx::query(&sql)
                .bind(story_id)
                .bind(line_number)
                .bind(line_number)
                .execute(&mut *self.conn)
                .await?
                .rows_affected();
        }

        Ok(deleted)
    }
}

/// Internal row types for SQLite queries
#[derive(sqlx::FromRow)]
struct VocabularyRow {
    line_number: i64,
    word: String,
    lexical_form: String,
    position_start: i64,
    position_end: i64,
}

impl VocabularyRow {
    fn into_item(self) -> VocabularyItem {
        VocabularyItem {
            word: self.word,
            lexical_form: self.lexical_form,
            position: stored_span(self.position_start, self.position_end),
        }
    }
}

#[derive(sqlx::FromRow)]
struct GrammarRow {
    line_number: i64,
    grammar_point_id: Option<i64>,
    text: String,
    position_start: i64,
    position_end: i64,
}

impl GrammarRow {
    fn into_item(self) -> GrammarItem {
        GrammarItem {
            grammar_point_id: self.grammar_point_id,
            text: self.text,
            position: stored_span(self.position_start, self.position_end),
        }
    }
}

#[derive(sqlx::FromRow)]
struct FootnoteRow {
    id: i64,
    line_number: i64,
    footnote_text: String,
}

/// Stored positions were validated on the way in; read them back as-is
fn stored_span(start: i64, end: i64) -> Span {
    Span {
        start: start.max(0) as usize,
        end: end.max(0) as usize,
    }
}
