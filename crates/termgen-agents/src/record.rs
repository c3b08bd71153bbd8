//! Final output records: session results merged with paper metadata.

use std::collections::BTreeSet;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::fields::{self, ParsedFields};
use crate::session::{SessionStatus, WorkflowSession};
use crate::stage::{last_message_with_role, StageRole};
use crate::terms;

/// Reference paper metadata from the bibliographic collaborator.
///
/// Read-only to the workflow. `domain` is already normalized: an absent
/// primary category becomes the literal string `"None"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub title: String,
    pub summary: String,
    pub domain: String,
}

impl PaperMetadata {
    /// Normalize collaborator output: missing or empty fields become the
    /// literal `"None"`.
    pub fn from_parts(title: Option<String>, summary: Option<String>, domain: Option<String>) -> Self {
        fn or_none(value: Option<String>) -> String {
            match value {
                Some(v) if !v.trim().is_empty() => v,
                _ => "None".to_string(),
            }
        }
        Self {
            title: or_none(title),
            summary: or_none(summary),
            domain: or_none(domain),
        }
    }
}

/// One completed (or best-effort) bilingual training sentence record.
///
/// Immutable once built. `status` distinguishes gate-accepted records from
/// budget-exhausted best-effort ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentenceRecord {
    pub terms: BTreeSet<String>,
    pub domain: String,
    pub paper_title: String,
    pub paper_summary: String,
    pub english: String,
    pub korean: String,
    pub score: u8,
    pub parentheses_count: u32,
    pub suggestions: String,
    /// Subset of `terms` actually present in the English sentences.
    pub matched_terms: BTreeSet<String>,
    pub status: SessionStatus,
}

impl SentenceRecord {
    /// `true` only for gate-accepted records; exhausted sessions produce
    /// non-final records.
    pub fn is_final(&self) -> bool {
        self.status == SessionStatus::Accepted
    }
}

/// Builds [`SentenceRecord`]s from finished sessions.
pub struct RecordBuilder;

impl RecordBuilder {
    /// Assemble the record for one session.
    ///
    /// Never fails: the last evaluation in the transcript is parsed
    /// lossily (malformed numerics default), so an exhausted session still
    /// yields its best available record.
    pub fn build(session: &WorkflowSession, metadata: &PaperMetadata) -> SentenceRecord {
        let parsed = last_message_with_role(session.transcript(), StageRole::Evaluate)
            .map(|evaluation| fields::parse_entry_lossy(&evaluation.content))
            .unwrap_or_default();
        Self::from_fields(session, metadata, parsed)
    }

    /// Assemble one record per entry of a multi-entry evaluation block
    /// (blocks separated by a blank line), in document order.
    pub fn build_entries(session: &WorkflowSession, metadata: &PaperMetadata) -> Vec<SentenceRecord> {
        let Some(evaluation) = last_message_with_role(session.transcript(), StageRole::Evaluate)
        else {
            return vec![Self::from_fields(session, metadata, ParsedFields::default())];
        };
        fields::split_entries(&evaluation.content)
            .map(|block| Self::from_fields(session, metadata, fields::parse_entry_lossy(block)))
            .collect()
    }

    fn from_fields(
        session: &WorkflowSession,
        metadata: &PaperMetadata,
        parsed: ParsedFields,
    ) -> SentenceRecord {
        let candidate_terms = &session.context().terms;
        let matched_terms = terms::matched_terms(candidate_terms, &parsed.english);
        SentenceRecord {
            terms: candidate_terms.clone(),
            domain: metadata.domain.clone(),
            paper_title: metadata.title.clone(),
            paper_summary: metadata.summary.clone(),
            english: parsed.english,
            korean: parsed.korean,
            score: parsed.score.unwrap_or(0),
            parentheses_count: parsed.parentheses_count,
            suggestions: parsed.suggestions,
            matched_terms,
            status: session.status(),
        }
    }
}

/// Records sharing one reference paper, keyed `"1"`, `"2"`, … in
/// generation order.
#[derive(Debug, Clone)]
pub struct PaperGroup {
    pub metadata: PaperMetadata,
    entries: Vec<SentenceRecord>,
}

impl PaperGroup {
    pub fn new(metadata: PaperMetadata) -> Self {
        Self {
            metadata,
            entries: Vec::new(),
        }
    }

    /// Append a record; its sub-key is its 1-based generation index.
    pub fn push(&mut self, record: SentenceRecord) {
        self.entries.push(record);
    }

    pub fn entries(&self) -> &[SentenceRecord] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Numeric-string sub-keys must serialize in generation order, so the map is
// written by hand instead of going through a sorted map type.
impl Serialize for PaperGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3 + self.entries.len()))?;
        map.serialize_entry("domain", &self.metadata.domain)?;
        map.serialize_entry("paper", &self.metadata.title)?;
        map.serialize_entry("summary", &self.metadata.summary)?;
        for (index, record) in self.entries.iter().enumerate() {
            map.serialize_entry(&(index + 1).to_string(), record)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionContext;

    fn metadata() -> PaperMetadata {
        PaperMetadata {
            title: "A Paper".into(),
            summary: "About entanglement.".into(),
            domain: "quant-ph".into(),
        }
    }

    fn session_with_evaluation(content: &str) -> WorkflowSession {
        let ctx = SessionContext::new(
            ["quantum entanglement".to_string()].into_iter().collect(),
            "summary",
        );
        let mut session = WorkflowSession::new(ctx, 10);
        session.seed_for_tests(&[
            (StageRole::Init, "topic"),
            (StageRole::Evaluate, content),
        ]);
        session
    }

    #[test]
    fn metadata_normalizes_missing_fields() {
        let meta = PaperMetadata::from_parts(Some("Title".into()), None, Some("  ".into()));
        assert_eq!(meta.title, "Title");
        assert_eq!(meta.summary, "None");
        assert_eq!(meta.domain, "None");
    }

    #[test]
    fn build_merges_fields_and_metadata() {
        let session = session_with_evaluation(
            "english: We observe quantum entanglement effects.\n\
             korean: 양자 얽힘(quantum entanglement) 효과입니다.\n\
             score: 9/10\n\
             parentheses_count: 1\n\
             suggestions: none\n",
        );
        let record = RecordBuilder::build(&session, &metadata());
        assert_eq!(record.domain, "quant-ph");
        assert_eq!(record.score, 9);
        assert_eq!(record.matched_terms, record.terms);
        assert!(record.matched_terms.is_subset(&record.terms));
    }

    #[test]
    fn build_never_fails_on_running_session_without_evaluation() {
        let ctx = SessionContext::new(["gravity".to_string()].into_iter().collect(), "s");
        let session = WorkflowSession::new(ctx, 5);
        let record = RecordBuilder::build(&session, &metadata());
        assert_eq!(record.score, 0);
        assert!(record.english.is_empty());
        assert!(!record.is_final());
    }

    #[test]
    fn build_entries_splits_blocks_in_order() {
        let session = session_with_evaluation(
            "english: first uses quantum entanglement\nscore: 8/10\n\n\
             english: second\nscore: 10/10\n",
        );
        let records = RecordBuilder::build_entries(&session, &metadata());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].score, 8);
        assert!(!records[0].matched_terms.is_empty());
        assert_eq!(records[1].score, 10);
        assert!(records[1].matched_terms.is_empty());
    }

    #[test]
    fn paper_group_serializes_numeric_keys_in_order() {
        let mut group = PaperGroup::new(metadata());
        for content in ["english: a\nscore: 9/10\n", "english: b\nscore: 10/10\n"] {
            let session = session_with_evaluation(content);
            group.push(RecordBuilder::build(&session, &metadata()));
        }
        let json: serde_json::Value = serde_json::to_value(&group).unwrap();
        assert_eq!(json["paper"], "A Paper");
        assert_eq!(json["1"]["score"], 9);
        assert_eq!(json["2"]["score"], 10);
    }
}
