//! Story and story-line types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::annotations::{Footnote, GrammarItem, LineAnnotations, VocabularyItem};

/// A story with every line and its annotations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub metadata: StoryMetadata,
    pub lines: Vec<StoryLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryMetadata {
    pub story_id: i64,
    pub week_number: i64,
    pub day_letter: String,
    /// Titles keyed by ISO 639-1 language code
    pub title: BTreeMap<String, String>,
    pub author: Author,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Description>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_revision: Option<DateTime<Utc>>,
    pub grammar_points: Vec<GrammarPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub language: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GrammarPoint {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One numbered line of a story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryLine {
    /// 1-based, contiguous within a story
    pub line_number: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_ref: Option<String>,
    pub vocabulary: Vec<VocabularyItem>,
    pub grammar: Vec<GrammarItem>,
    pub footnotes: Vec<Footnote>,
}

impl StoryLine {
    pub fn new(line_number: i64, text: impl Into<String>) -> Self {
        Self {
            line_number,
            text: text.into(),
            audio_ref: None,
            vocabulary: Vec::new(),
            grammar: Vec::new(),
            footnotes: Vec::new(),
        }
    }

    /// Attach annotations loaded separately from the line text
    pub fn with_annotations(mut self, annotations: LineAnnotations) -> Self {
        self.vocabulary = annotations.vocabulary;
        self.grammar = annotations.grammar;
        self.footnotes = annotations.footnotes;
        self
    }
}

/// Story submitted for creation; lines are numbered from 1 in order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStory {
    #[serde(default)]
    pub week_number: i64,
    #[serde(default)]
    pub day_letter: String,
    #[serde(default)]
    pub title: BTreeMap<String, String>,
    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub description: Option<Description>,
    #[serde(default)]
    pub grammar_point_ids: Vec<i64>,
    pub lines: Vec<NewStoryLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStoryLine {
    pub text: String,
    #[serde(default)]
    pub audio_ref: Option<String>,
}

#[cfg(test)]
impl NewStory {
    /// Minimal metadata for tests
    pub fn sample() -> Self {
        Self {
            week_number: 1,
            day_letter: "a".to_string(),
            title: BTreeMap::from([("en".to_string(), "Breakfast".to_string())]),
            author: Author {
                id: "author-1".to_string(),
                name: "Test Author".to_string(),
            },
            ..Default::default()
        }
    }
}
