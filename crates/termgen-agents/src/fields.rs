//! Structured field extraction from free-text stage output.
//!
//! Every stage emits an untrusted semi-structured document of
//! `label: value` lines. The parser is tolerant by design: unrecognized
//! lines are ignored and missing fields default, because model output
//! drifts. The only recoverable failure is a recognized numeric field whose
//! value is not an integer.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::WorkflowError;

const LABEL_ENGLISH: &str = "english:";
const LABEL_KOREAN: &str = "korean:";
const LABEL_SCORE: &str = "score:";
const LABEL_PARENTHESES: &str = "parentheses_count:";
const LABEL_SUGGESTIONS: &str = "suggestions:";

/// Fields recognized in evaluation-stage output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFields {
    /// English source sentences.
    pub english: String,
    /// Korean translation with parenthetical term formatting.
    pub korean: String,
    /// Evaluation score in `[0, 10]`, absent when the evaluator omitted it.
    pub score: Option<u8>,
    /// Number of parenthesis pairs counted in the Korean sentences.
    pub parentheses_count: u32,
    /// Evaluator improvement suggestions.
    pub suggestions: String,
}

/// Parse one `label: value` block into [`ParsedFields`].
///
/// A line belongs to a field if, after trimming, it starts with the field's
/// literal label; the value is the trimmed remainder. `score` accepts both
/// plain integers and the `X/10` notation (only the numerator is kept).
///
/// # Errors
///
/// [`WorkflowError::MalformedField`] when a recognized numeric field's value
/// cannot be parsed as an integer. Missing fields are not errors.
pub fn parse_entry(text: &str) -> Result<ParsedFields, WorkflowError> {
    let mut first_error = None;
    let fields = walk_labeled_lines(text, &mut first_error);
    match first_error {
        Some(err) => Err(err),
        None => Ok(fields),
    }
}

/// Like [`parse_entry`], but never fails: malformed numeric fields are
/// defaulted (score absent, count zero) with a warning. Used when building
/// a best-effort record from an exhausted session.
pub fn parse_entry_lossy(text: &str) -> ParsedFields {
    let mut first_error = None;
    let fields = walk_labeled_lines(text, &mut first_error);
    if let Some(err) = first_error {
        warn!(error = %err, "defaulting malformed numeric field");
    }
    fields
}

/// Shared line walker. Numeric parse failures are recorded in `first_error`
/// and the field keeps its default, so the strict and lossy entry points
/// differ only in what they do with the recorded error.
fn walk_labeled_lines(text: &str, first_error: &mut Option<WorkflowError>) -> ParsedFields {
    let mut fields = ParsedFields::default();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if let Some(value) = line.strip_prefix(LABEL_ENGLISH) {
            fields.english = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix(LABEL_KOREAN) {
            fields.korean = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix(LABEL_SCORE) {
            match parse_score_value(value.trim()) {
                Ok(score) => fields.score = Some(score),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        } else if let Some(value) = line.strip_prefix(LABEL_PARENTHESES) {
            match value.trim().parse() {
                Ok(count) => fields.parentheses_count = count,
                Err(_) => {
                    first_error.get_or_insert(WorkflowError::MalformedField {
                        field: "parentheses_count",
                        value: value.trim().to_string(),
                    });
                }
            }
        } else if let Some(value) = line.strip_prefix(LABEL_SUGGESTIONS) {
            fields.suggestions = value.trim().to_string();
        }
        // Anything else is ignored — the parser is tolerant, not strict.
    }

    fields
}

/// Parse a multi-entry document: blocks separated by a blank line, each
/// parsed independently. Returned in document order (sub-key `"1"` is
/// index 0 here).
pub fn parse_entries(text: &str) -> Result<Vec<ParsedFields>, WorkflowError> {
    split_entries(text).map(parse_entry).collect()
}

/// Split a multi-entry document into its non-empty blocks.
pub fn split_entries(text: &str) -> impl Iterator<Item = &str> {
    text.split("\n\n").filter(|block| !block.trim().is_empty())
}

/// Dedicated single-field extractor for the gate: pull only the score out
/// of an evaluation message.
pub fn extract_score(text: &str) -> Result<Option<u8>, WorkflowError> {
    for raw_line in text.lines() {
        let line = raw_line.trim();
        if let Some(value) = line.strip_prefix(LABEL_SCORE) {
            return parse_score_value(value.trim()).map(Some);
        }
    }
    Ok(None)
}

/// Render fields back into labeled-line text. Inverse of [`parse_entry`]
/// for well-formed fields; the score is emitted in `X/10` notation and
/// omitted entirely when absent.
pub fn render(fields: &ParsedFields) -> String {
    let mut out = String::new();
    out.push_str(LABEL_ENGLISH);
    out.push(' ');
    out.push_str(&fields.english);
    out.push('\n');
    out.push_str(LABEL_KOREAN);
    out.push(' ');
    out.push_str(&fields.korean);
    out.push('\n');
    if let Some(score) = fields.score {
        out.push_str(&format!("{LABEL_SCORE} {score}/10\n"));
    }
    out.push_str(&format!(
        "{LABEL_PARENTHESES} {}\n",
        fields.parentheses_count
    ));
    out.push_str(LABEL_SUGGESTIONS);
    out.push(' ');
    out.push_str(&fields.suggestions);
    out.push('\n');
    out
}

fn parse_score_value(value: &str) -> Result<u8, WorkflowError> {
    // "9/10" and plain "9" are both accepted; only the numerator counts.
    let numerator = value.split('/').next().unwrap_or(value).trim();
    numerator
        .parse()
        .map_err(|_| WorkflowError::MalformedField {
            field: "score",
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_labeled_fields() {
        let text = "english: We study quantum entanglement.\n\
                    korean: 양자 얽힘(quantum entanglement)을 연구합니다.\n\
                    score: 9/10\n\
                    parentheses_count: 1\n\
                    suggestions: none\n";
        let fields = parse_entry(text).unwrap();
        assert_eq!(fields.english, "We study quantum entanglement.");
        assert_eq!(fields.korean, "양자 얽힘(quantum entanglement)을 연구합니다.");
        assert_eq!(fields.score, Some(9));
        assert_eq!(fields.parentheses_count, 1);
        assert_eq!(fields.suggestions, "none");
    }

    #[test]
    fn missing_fields_default() {
        let fields = parse_entry("korean: 번역\n").unwrap();
        assert_eq!(fields.english, "");
        assert_eq!(fields.korean, "번역");
        assert_eq!(fields.score, None);
        assert_eq!(fields.parentheses_count, 0);
        assert_eq!(fields.suggestions, "");
    }

    #[test]
    fn unrecognized_lines_ignored() {
        let text = "Here is the evaluation:\nenglish: a sentence\nterms_check: gravity: Yes\n";
        let fields = parse_entry(text).unwrap();
        assert_eq!(fields.english, "a sentence");
    }

    #[test]
    fn plain_integer_score_accepted() {
        let fields = parse_entry("score: 7").unwrap();
        assert_eq!(fields.score, Some(7));
    }

    #[test]
    fn indented_lines_are_trimmed_before_matching() {
        let fields = parse_entry("   score: 6/10   \n").unwrap();
        assert_eq!(fields.score, Some(6));
    }

    #[test]
    fn malformed_score_is_recoverable_error() {
        let err = parse_entry("score: excellent").unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::MalformedField { field: "score", .. }
        ));
        assert!(err.is_retriable());
    }

    #[test]
    fn malformed_count_is_recoverable_error() {
        let err = parse_entry("parentheses_count: many").unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::MalformedField {
                field: "parentheses_count",
                ..
            }
        ));
    }

    #[test]
    fn lossy_parse_defaults_bad_numerics_keeps_text() {
        let fields = parse_entry_lossy("english: kept\nscore: excellent\n");
        assert_eq!(fields.english, "kept");
        assert_eq!(fields.score, None);
    }

    #[test]
    fn multi_entry_split_on_blank_line() {
        let text = "english: first\nscore: 8/10\n\nenglish: second\nscore: 10/10\n";
        let entries = parse_entries(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].english, "first");
        assert_eq!(entries[0].score, Some(8));
        assert_eq!(entries[1].english, "second");
        assert_eq!(entries[1].score, Some(10));
    }

    #[test]
    fn extract_score_finds_only_score() {
        assert_eq!(extract_score("english: x\nscore: 5/10\n").unwrap(), Some(5));
        assert_eq!(extract_score("english: x\n").unwrap(), None);
        assert!(extract_score("score: ten").is_err());
    }

    #[test]
    fn render_parse_roundtrip() {
        let fields = ParsedFields {
            english: "An example sentence.".into(),
            korean: "예시 문장(example sentence)입니다.".into(),
            score: Some(9),
            parentheses_count: 1,
            suggestions: "tighten phrasing".into(),
        };
        assert_eq!(parse_entry(&render(&fields)).unwrap(), fields);

        let absent_score = ParsedFields {
            score: None,
            ..fields
        };
        assert_eq!(parse_entry(&render(&absent_score)).unwrap(), absent_score);
    }
}
