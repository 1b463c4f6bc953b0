//! Segment-based rendering of story lines
//!
//! A line is cut at its annotation intervals into an ordered list of string
//! segments. Plain mode returns the text untouched; vocabulary mode swaps each
//! vocabulary span for a blank marker; grammar mode swaps each grammar span for
//! `open`, label, `close`.
//!
//! Rendering is pure and works on data already fetched for the request.

use serde::{Deserialize, Serialize};

use crate::annotations::Span;
use crate::config::MarkerConfig;
use crate::stories::{Story, StoryLine};

/// Presentation mode for a rendered line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Plain,
    Vocabulary,
    Grammar,
}

/// One rendered line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedLine {
    pub line_number: i64,
    pub segments: Vec<String>,
    /// Whether the line has annotations of the kind the mode consults
    pub has_annotations: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_ref: Option<String>,
}

/// A whole story rendered in one mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedStory {
    pub story_id: i64,
    pub mode: RenderMode,
    pub lines: Vec<RenderedLine>,
    /// Present in vocabulary mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocabulary_bank: Option<Vec<String>>,
}

/// Render one line into segments
pub fn render_line(line: &StoryLine, mode: RenderMode, markers: &MarkerConfig) -> Vec<String> {
    match mode {
        RenderMode::Plain => vec![line.text.clone()],
        RenderMode::Vocabulary => segment(
            &line.text,
            &line.vocabulary,
            |item| item.position,
            |_, out| out.push(markers.blank.clone()),
        ),
        RenderMode::Grammar => segment(
            &line.text,
            &line.grammar,
            |item| item.position,
            |item, out| {
                out.push(markers.grammar_open.clone());
                out.push(item.text.clone());
                out.push(markers.grammar_close.clone());
            },
        ),
    }
}

/// Render one line with its line number and audio reference
pub fn render_story_line(line: &StoryLine, mode: RenderMode, markers: &MarkerConfig) -> RenderedLine {
    let has_annotations = match mode {
        RenderMode::Plain => false,
        RenderMode::Vocabulary => !line.vocabulary.is_empty(),
        RenderMode::Grammar => !line.grammar.is_empty(),
    };

    RenderedLine {
        line_number: line.line_number,
        segments: render_line(line, mode, markers),
        has_annotations,
        audio_ref: line.audio_ref.clone(),
    }
}

/// Render every line of a story; the vocabulary bank is attached in
/// vocabulary mode
pub fn render_story(story: &Story, mode: RenderMode, markers: &MarkerConfig) -> RenderedStory {
    RenderedStory {
        story_id: story.metadata.story_id,
        mode,
        lines: story
            .lines
            .iter()
            .map(|line| render_story_line(line, mode, markers))
            .collect(),
        vocabulary_bank: (mode == RenderMode::Vocabulary).then(|| vocabulary_bank(story)),
    }
}

/// Lexical forms of every line, sorted and then collapsed where equal
/// neighbours repeat
pub fn vocabulary_bank(story: &Story) -> Vec<String> {
    let mut bank: Vec<String> = story
        .lines
        .iter()
        .flat_map(|line| line.vocabulary.iter().map(|item| item.lexical_form.clone()))
        .collect();
    bank.sort();
    bank.dedup();
    bank
}

/// Cut `text` at the spans of `items`, calling `marker` in place of each span.
///
/// Items are visited in ascending start order; equal starts keep their input
/// order. A plain segment is emitted before every item that starts at or after
/// the cursor, even when empty. An item starting before the cursor overlaps
/// the previous one: no plain segment is emitted for it and the overlapped
/// text is skipped. Positions past the end of the text are clamped.
fn segment<T>(
    text: &str,
    items: &[T],
    span: impl Fn(&T) -> Span,
    mut marker: impl FnMut(&T, &mut Vec<String>),
) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let slice = |from: usize, to: usize| -> String { chars[from..to].iter().collect() };

    let mut ordered: Vec<&T> = items.iter().collect();
    ordered.sort_by_key(|item| span(item).start);

    let mut segments = Vec::with_capacity(ordered.len() * 2 + 1);
    let mut last_end = 0;
    for item in ordered {
        let position = span(item);
        let start = position.start.min(len);
        let end = position.end.min(len);

        if start >= last_end {
            segments.push(slice(last_end, start));
        }
        marker(item, &mut segments);
        last_end = end;
    }

    if last_end < len {
        segments.push(slice(last_end, len));
    }

    segments
}
