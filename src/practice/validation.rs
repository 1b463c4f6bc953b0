//! Vocabulary answer checking
//!
//! Submissions address lines by their 0-based index in the story's line list.
//! Correctness is set membership in the line's lexical forms, while the
//! reported correct answer is the one at the same blank position. The two can
//! disagree when a learner fills the right words into the wrong blanks.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stories::Story;

/// Answers for the blanks of one line, in blank order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    /// 0-based index into the story's lines
    pub line_number: i64,
    pub answers: Vec<String>,
}

/// Outcome for one submitted answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub correct: bool,
    pub user_answer: String,
    /// Lexical form of the blank at the same position
    pub correct_answer: String,
    pub line_number: i64,
}

/// A submission that does not fit the story.
///
/// Carries the expected answer count of every line so that the client can
/// resynchronise.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    /// Line index -> number of vocabulary blanks
    pub expected_answers: BTreeMap<usize, usize>,
}

/// Score every answer, or reject the whole batch on the first malformed
/// submission
pub fn validate_answers(
    story: &Story,
    submissions: &[AnswerSubmission],
) -> Result<Vec<AnswerResult>, ValidationError> {
    let expected_answers: BTreeMap<usize, usize> = story
        .lines
        .iter()
        .enumerate()
        .map(|(index, line)| (index, line.vocabulary.len()))
        .collect();

    let reject = |message: String| ValidationError {
        message,
        expected_answers: expected_answers.clone(),
    };

    for submission in submissions {
        let index = usize::try_from(submission.line_number)
            .ok()
            .filter(|index| *index < story.lines.len())
            .ok_or_else(|| reject(format!("Invalid line number: {}", submission.line_number)))?;

        let expected = expected_answers[&index];
        if submission.answers.len() != expected {
            return Err(reject(format!(
                "Line {} expects {} answers, got {}",
                submission.line_number,
                expected,
                submission.answers.len()
            )));
        }
    }

    let mut results = Vec::new();
    for submission in submissions {
        let line = &story.lines[submission.line_number as usize];

        let accepted: HashSet<&str> = line
            .vocabulary
            .iter()
            .map(|item| item.lexical_form.as_str())
            .collect();

        let mut by_position: Vec<_> = line.vocabulary.iter().collect();
        by_position.sort_by_key(|item| item.position.start);

        for (answer, blank) in submission.answers.iter().zip(by_position) {
            results.push(AnswerResult {
                correct: accepted.contains(answer.as_str()),
                user_answer: answer.clone(),
                correct_answer: blank.lexical_form.clone(),
                line_number: submission.line_number,
            });
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{Span, VocabularyItem};
    use crate::stories::{Author, StoryLine, StoryMetadata};

    fn vocab(word: &str, lexical_form: &str, start: usize, end: usize) -> VocabularyItem {
        VocabularyItem {
            word: word.to_string(),
            lexical_form: lexical_form.to_string(),
            position: Span::new(start, end).unwrap(),
        }
    }

    fn story() -> Story {
        let mut first = StoryLine::new(1, "I eat rice.");
        first.vocabulary.push(vocab("rice", "rice (n.)", 6, 10));
        first.vocabulary.push(vocab("eat", "eat (v.)", 2, 5));
        let second = StoryLine::new(2, "Good.");

        Story {
            metadata: StoryMetadata {
                story_id: 1,
                week_number: 1,
                day_letter: "a".to_string(),
                title: BTreeMap::new(),
                author: Author::default(),
                video_url: None,
                description: None,
                last_revision: None,
                grammar_points: Vec::new(),
            },
            lines: vec![first, second],
        }
    }

    fn submit(line_number: i64, answers: &[&str]) -> AnswerSubmission {
        AnswerSubmission {
            line_number,
            answers: answers.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_wrong_count_reports_expected_answers() {
        let err = validate_answers(&story(), &[submit(0, &["a"])]).unwrap_err();
        assert_eq!(err.expected_answers, BTreeMap::from([(0, 2), (1, 0)]));
    }

    #[test]
    fn test_one_bad_submission_fails_whole_batch() {
        let submissions = [submit(0, &["eat (v.)", "rice (n.)"]), submit(2, &[])];
        let err = validate_answers(&story(), &submissions).unwrap_err();
        assert!(err.message.contains("Invalid line number"));

        assert!(validate_answers(&story(), &[submit(-1, &[])]).is_err());
    }

    #[test]
    fn test_correct_answers_in_blank_order() {
        let results =
            validate_answers(&story(), &[submit(0, &["eat (v.)", "rice (n.)"]), submit(1, &[])])
                .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.correct));
        assert_eq!(results[0].correct_answer, "eat (v.)");
        assert_eq!(results[1].correct_answer, "rice (n.)");
        assert_eq!(results[1].line_number, 0);
    }

    #[test]
    fn test_swapped_answers_are_still_correct() {
        let results = validate_answers(&story(), &[submit(0, &["rice (n.)", "eat (v.)"])]).unwrap();

        assert!(results.iter().all(|r| r.correct));
        assert_eq!(results[0].user_answer, "rice (n.)");
        assert_eq!(results[0].correct_answer, "eat (v.)");
    }

    #[test]
    fn test_unknown_answer_is_incorrect() {
        let results = validate_answers(&story(), &[submit(0, &["eat (v.)", "bread"])]).unwrap();
        assert!(results[0].correct);
        assert!(!results[1].correct);
        assert_eq!(results[1].correct_answer, "rice (n.)");
    }

    #[test]
    fn test_submission_wire_format() {
        let parsed: AnswerSubmission =
            serde_json::from_str(r#"{"lineNumber":0,"answers":["eat (v.)"]}"#).unwrap();
        assert_eq!(parsed, submit(0, &["eat (v.)"]));
    }
}
