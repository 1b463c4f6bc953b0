//! Annotation types anchored to code-point intervals of a story line
//!
//! Positions are half-open `[start, end)` ranges counted in Unicode scalar
//! values (not bytes). On the wire a position is a two-element array, matching
//! the format authoring clients already send.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A half-open `[start, end)` interval of code-point offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[usize; 2]", into = "[usize; 2]")]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Interval construction and bounds errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpanError {
    #[error("empty or reversed interval [{start}, {end})")]
    Empty { start: usize, end: usize },
    #[error("interval [{start}, {end}) exceeds line length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },
}

impl Span {
    /// Create a span, rejecting empty and reversed intervals
    pub fn new(start: usize, end: usize) -> Result<Self, SpanError> {
        if start >= end {
            return Err(SpanError::Empty { start, end });
        }
        Ok(Self { start, end })
    }

    /// Number of code points covered
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Check `end <= len`, where `len` is the line length in code points
    pub fn check_within(&self, len: usize) -> Result<(), SpanError> {
        if self.end > len {
            return Err(SpanError::OutOfBounds {
                start: self.start,
                end: self.end,
                len,
            });
        }
        Ok(())
    }
}

impl TryFrom<[usize; 2]> for Span {
    type Error = SpanError;

    fn try_from([start, end]: [usize; 2]) -> Result<Self, Self::Error> {
        Span::new(start, end)
    }
}

impl From<Span> for [usize; 2] {
    fn from(span: Span) -> Self {
        [span.start, span.end]
    }
}

/// A vocabulary blank: the surface word and the lexical form used as answer key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    /// Surface form exactly as it appears in the line
    pub word: String,
    /// Dictionary form expected from the learner
    pub lexical_form: String,
    pub position: Span,
}

/// A grammar highlight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammar_point_id: Option<i64>,
    /// Annotated substring, also shown as the label in grammar mode
    pub text: String,
    pub position: Span,
}

/// A stored footnote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footnote {
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub references: Vec<String>,
}

/// A footnote before the store has assigned it an ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFootnote {
    pub text: String,
    #[serde(default)]
    pub references: Vec<String>,
}

impl NewFootnote {
    /// References in canonical order; order does not affect identity
    pub fn sorted_references(&self) -> Vec<String> {
        sorted(&self.references)
    }
}

pub(crate) fn sorted(references: &[String]) -> Vec<String> {
    let mut refs = references.to_vec();
    refs.sort();
    refs
}

/// The three annotation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Vocabulary,
    Grammar,
    Footnote,
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AnnotationKind::Vocabulary => "vocabulary",
            AnnotationKind::Grammar => "grammar",
            AnnotationKind::Footnote => "footnote",
        };
        f.write_str(name)
    }
}

/// An annotation submitted for insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NewAnnotation {
    Vocabulary(VocabularyItem),
    Grammar(GrammarItem),
    Footnote(NewFootnote),
}

impl NewAnnotation {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            NewAnnotation::Vocabulary(_) => AnnotationKind::Vocabulary,
            NewAnnotation::Grammar(_) => AnnotationKind::Grammar,
            NewAnnotation::Footnote(_) => AnnotationKind::Footnote,
        }
    }
}

/// An annotation as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Annotation {
    Vocabulary(VocabularyItem),
    Grammar(GrammarItem),
    Footnote(Footnote),
}

/// All annotations of one line, each list in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAnnotations {
    #[serde(default)]
    pub vocabulary: Vec<VocabularyItem>,
    #[serde(default)]
    pub grammar: Vec<GrammarItem>,
    #[serde(default)]
    pub footnotes: Vec<Footnote>,
}

impl LineAnnotations {
    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty() && self.grammar.is_empty() && self.footnotes.is_empty()
    }
}

/// A batch of annotations for one line, inserted as a unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLineAnnotations {
    #[serde(default)]
    pub vocabulary: Vec<VocabularyItem>,
    #[serde(default)]
    pub grammar: Vec<GrammarItem>,
    #[serde(default)]
    pub footnotes: Vec<NewFootnote>,
}
