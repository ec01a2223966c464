//! Discourse filtering (stage 5)
//!
//! Every evidence sentence is snapped to its closest discourse unit, or
//! dropped when nothing is close enough.

use super::fuzzy::best_match;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::types::{DiscourseUnits, Evidence, EvidenceRecord, Sentiment};

/// Replace each sentence with its best-matching discourse unit.
///
/// Labels are kept even when all their sentences are dropped, and both
/// sentiment lists are always present.
pub fn filter_evidence(
    record: &EvidenceRecord,
    units: &DiscourseUnits,
    diagnostics: &mut Diagnostics,
) -> EvidenceRecord {
    record
        .iter()
        .map(|(&label, evidence)| {
            let mut filtered = Evidence::default();
            for sentiment in Sentiment::BOTH {
                for sentence in evidence.sentences(sentiment) {
                    match best_match(sentence, units.as_slice()) {
                        Some(unit) => filtered.sentences_mut(sentiment).push(unit.to_string()),
                        None => diagnostics.push(Diagnostic::NoFuzzyMatch {
                            label,
                            sentiment,
                            sentence: sentence.clone(),
                        }),
                    }
                }
            }
            (label, filtered)
        })
        .collect()
}
