//! Term matching — which candidate terms actually appear in a sentence.

use std::collections::BTreeSet;

/// Return the subset of `terms` present in `sentence`.
///
/// Membership is a case-folded substring test with no word-boundary
/// requirement; "Adversarial Training" matches the term
/// "adversarial training". This is a permissive substring test, not
/// tokenization.
pub fn matched_terms(terms: &BTreeSet<String>, sentence: &str) -> BTreeSet<String> {
    let folded = sentence.to_lowercase();
    terms
        .iter()
        .filter(|term| folded.contains(&term.to_lowercase()))
        .cloned()
        .collect()
}
