//! Database schema initialization

use sqlx::SqlitePool;

use crate::error::Result;

/// Initialize the database schema
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;

    Ok(())
}

// No ON DELETE CASCADE: referencing rows must be deleted first.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS stories (
    story_id INTEGER PRIMARY KEY AUTOINCREMENT,
    week_number INTEGER NOT NULL DEFAULT 0,
    day_letter TEXT NOT NULL DEFAULT '',
    author_id TEXT NOT NULL DEFAULT '',
    author_name TEXT NOT NULL DEFAULT '',
    video_url TEXT,
    last_revision TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS story_titles (
    story_id INTEGER NOT NULL REFERENCES stories(story_id),
    language_code TEXT NOT NULL,
    title TEXT NOT NULL,
    PRIMARY KEY (story_id, language_code)
);

CREATE TABLE IF NOT EXISTS story_descriptions (
    story_id INTEGER NOT NULL REFERENCES stories(story_id),
    language_code TEXT NOT NULL,
    description_text TEXT NOT NULL,
    PRIMARY KEY (story_id, language_code)
);

CREATE TABLE IF NOT EXISTS grammar_points (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT
);

CREATE TABLE IF NOT EXISTS story_grammar_points (
    story_id INTEGER NOT NULL REFERENCES stories(story_id),
    grammar_point_id INTEGER NOT NULL REFERENCES grammar_points(id),
    PRIMARY KEY (story_id, grammar_point_id)
);

CREATE TABLE IF NOT EXISTS story_lines (
    story_id INTEGER NOT NULL REFERENCES stories(story_id),
    line_number INTEGER NOT NULL,
    text TEXT NOT NULL,
    PRIMARY KEY (story_id, line_number)
);

CREATE TABLE IF NOT EXISTS line_audio (
    story_id INTEGER NOT NULL,
    line_number INTEGER NOT NULL,
    file_path TEXT NOT NULL,
    PRIMARY KEY (story_id, line_number),
    FOREIGN KEY (story_id, line_number) REFERENCES story_lines(story_id, line_number)
);

CREATE TABLE IF NOT EXISTS vocabulary_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    story_id INTEGER NOT NULL,
    line_number INTEGER NOT NULL,
    word TEXT NOT NULL,
    lexical_form TEXT NOT NULL,
    position_start INTEGER NOT NULL,
    position_end INTEGER NOT NULL,
    FOREIGN KEY (story_id, line_number) REFERENCES story_lines(story_id, line_number)
);

CREATE INDEX IF NOT EXISTS idx_vocabulary_line ON vocabulary_items(story_id, line_number);

CREATE TABLE IF NOT EXISTS grammar_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    story_id INTEGER NOT NULL,
    line_number INTEGER NOT NULL,
    grammar_point_id INTEGER REFERENCES grammar_points(id),
    text TEXT NOT NULL,
    position_start INTEGER NOT NULL,
    position_end INTEGER NOT NULL,
    FOREIGN KEY (story_id, line_number) REFERENCES story_lines(story_id, line_number)
);

CREATE INDEX IF NOT EXISTS idx_grammar_line ON grammar_items(story_id, line_number);

CREATE TABLE IF NOT EXISTS footnotes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    story_id INTEGER NOT NULL,
    line_number INTEGER NOT NULL,
    footnote_text TEXT NOT NULL,
    FOREIGN KEY (story_id, line_number) REFERENCES story_lines(story_id, line_number)
);

CREATE INDEX IF NOT EXISTS idx_footnotes_line ON footnotes(story_id, line_number);

CREATE TABLE IF NOT EXISTS footnote_references (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    footnote_id INTEGER NOT NULL REFERENCES footnotes(id),
    reference TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_footnote_references_footnote ON footnote_references(footnote_id);
"#;
