//! Structured diagnostics for recoverable conditions
//!
//! Unmatched keys, malformed lines, fuzzy misses and skipped metric families
//! never abort a run. They are recorded here as events so callers (and tests)
//! can count them by kind instead of scraping log output. Every event is also
//! mirrored to `tracing`.

use crate::eval::MetricFamily;
use crate::types::{Column, OptionLabel, Sentiment};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A single recoverable condition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    MalformedLine {
        path: String,
        line: usize,
        error: String,
    },
    UnmatchedKey {
        key: String,
    },
    DuplicateLabel {
        label: OptionLabel,
        key: String,
    },
    NonMappingEvidence,
    NonTextSentence {
        label: OptionLabel,
        sentiment: Sentiment,
    },
    NoFuzzyMatch {
        label: OptionLabel,
        sentiment: Sentiment,
        sentence: String,
    },
    MissingDiscourse,
    SettingSkipped {
        setting: String,
        path: String,
    },
    MetricFamilySkipped {
        family: MetricFamily,
        column: Column,
    },
    RowCountMismatch {
        model: usize,
        gold: usize,
    },
    ShapeMismatch {
        family: MetricFamily,
        row: usize,
        model_len: usize,
        gold_len: usize,
    },
    UnparseableVotes,
    UnknownRating {
        label: OptionLabel,
        rating: String,
    },
}

/// Discriminant of [`Diagnostic`], used for counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    MalformedLine,
    UnmatchedKey,
    DuplicateLabel,
    NonMappingEvidence,
    NonTextSentence,
    NoFuzzyMatch,
    MissingDiscourse,
    SettingSkipped,
    MetricFamilySkipped,
    RowCountMismatch,
    ShapeMismatch,
    UnparseableVotes,
    UnknownRating,
}

impl Diagnostic {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Diagnostic::MalformedLine { .. } => DiagnosticKind::MalformedLine,
            Diagnostic::UnmatchedKey { .. } => DiagnosticKind::UnmatchedKey,
            Diagnostic::DuplicateLabel { .. } => DiagnosticKind::DuplicateLabel,
            Diagnostic::NonMappingEvidence => DiagnosticKind::NonMappingEvidence,
            Diagnostic::NonTextSentence { .. } => DiagnosticKind::NonTextSentence,
            Diagnostic::NoFuzzyMatch { .. } => DiagnosticKind::NoFuzzyMatch,
            Diagnostic::MissingDiscourse => DiagnosticKind::MissingDiscourse,
            Diagnostic::SettingSkipped { .. } => DiagnosticKind::SettingSkipped,
            Diagnostic::MetricFamilySkipped { .. } => DiagnosticKind::MetricFamilySkipped,
            Diagnostic::RowCountMismatch { .. } => DiagnosticKind::RowCountMismatch,
            Diagnostic::ShapeMismatch { .. } => DiagnosticKind::ShapeMismatch,
            Diagnostic::UnparseableVotes => DiagnosticKind::UnparseableVotes,
            Diagnostic::UnknownRating { .. } => DiagnosticKind::UnknownRating,
        }
    }

    /// Fuzzy misses and skipped families are routine; the rest deserve a warning
    fn is_routine(&self) -> bool {
        matches!(
            self,
            Diagnostic::NoFuzzyMatch { .. }
                | Diagnostic::NonTextSentence { .. }
                | Diagnostic::MetricFamilySkipped { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedLine { path, line, error } => {
                write!(f, "could not decode JSON at {}:{} ({}), skipping", path, line, error)
            }
            Diagnostic::UnmatchedKey { key } => {
                write!(f, "could not normalize key '{}', dropping it", key)
            }
            Diagnostic::DuplicateLabel { label, key } => {
                write!(f, "key '{}' overwrites earlier evidence for option {}", key, label)
            }
            Diagnostic::NonMappingEvidence => write!(f, "evidence payload is not a JSON object"),
            Diagnostic::NonTextSentence { label, sentiment } => {
                write!(f, "non-text entry in {} list of option {}", sentiment, label)
            }
            Diagnostic::NoFuzzyMatch {
                label,
                sentiment,
                sentence,
            } => write!(
                f,
                "no discourse unit matches {} sentence for option {}: '{}'",
                sentiment, label, sentence
            ),
            Diagnostic::MissingDiscourse => write!(f, "no discourse record for this item"),
            Diagnostic::SettingSkipped { setting, path } => {
                write!(f, "raw output file {} not found for setting '{}', skipping", path, setting)
            }
            Diagnostic::MetricFamilySkipped { family, column } => {
                write!(f, "{} metrics skipped: `{}` missing on one side", family, column.as_str())
            }
            Diagnostic::RowCountMismatch { model, gold } => write!(
                f,
                "model frame has {} rows but gold frame has {}; comparing the common prefix",
                model, gold
            ),
            Diagnostic::ShapeMismatch {
                family,
                row,
                model_len,
                gold_len,
            } => write!(
                f,
                "{} row {} skipped: model length {} vs gold length {}",
                family, row, model_len, gold_len
            ),
            Diagnostic::UnparseableVotes => write!(f, "votes_distribution could not be parsed"),
            Diagnostic::UnknownRating { label, rating } => {
                write!(f, "unknown rating '{}' for option {}", rating, label)
            }
        }
    }
}

/// A diagnostic with the item it concerns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub item: Option<usize>,
    #[serde(flatten)]
    pub diagnostic: Diagnostic,
}

/// Ordered collector of diagnostic events
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    item: Option<usize>,
    events: Vec<Event>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector whose events are attributed to item `item`
    pub fn scoped(item: usize) -> Self {
        Self {
            item: Some(item),
            events: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match (self.item, diagnostic.is_routine()) {
            (Some(item), true) => tracing::debug!(item, "{}", diagnostic),
            (Some(item), false) => tracing::warn!(item, "{}", diagnostic),
            (None, true) => tracing::debug!("{}", diagnostic),
            (None, false) => tracing::warn!("{}", diagnostic),
        }
        self.events.push(Event {
            item: self.item,
            diagnostic,
        });
    }

    /// Append another collector's events, keeping their item attribution
    pub fn extend(&mut self, other: Diagnostics) {
        self.events.extend(other.events);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.events
            .iter()
            .filter(|e| e.diagnostic.kind() == kind)
            .count()
    }

    pub fn counts(&self) -> BTreeMap<DiagnosticKind, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            *counts.entry(event.diagnostic.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// One summary line per kind
    pub fn log_summary(&self, stage: &str) {
        if self.events.is_empty() {
            tracing::info!(stage, "no diagnostics");
            return;
        }
        for (kind, count) in self.counts() {
            tracing::info!(stage, ?kind, count, "diagnostics");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_kind() {
        let mut diagnostics = Diagnostics::scoped(3);
        diagnostics.push(Diagnostic::UnmatchedKey { key: "x".into() });
        diagnostics.push(Diagnostic::UnmatchedKey { key: "y".into() });
        diagnostics.push(Diagnostic::MissingDiscourse);

        assert_eq!(diagnostics.count(DiagnosticKind::UnmatchedKey), 2);
        assert_eq!(diagnostics.count(DiagnosticKind::MissingDiscourse), 1);
        assert_eq!(diagnostics.count(DiagnosticKind::MalformedLine), 0);
        assert!(diagnostics.events().iter().all(|e| e.item == Some(3)));
    }

    #[test]
    fn test_extend_keeps_item_attribution() {
        let mut all = Diagnostics::new();
        for item in 0..3 {
            let mut local = Diagnostics::scoped(item);
            local.push(Diagnostic::NonMappingEvidence);
            all.extend(local);
        }
        let items: Vec<_> = all.events().iter().map(|e| e.item).collect();
        assert_eq!(items, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(all.counts().get(&DiagnosticKind::NonMappingEvidence), Some(&3));
    }

    #[test]
    fn test_event_serializes_flat() {
        let mut diagnostics = Diagnostics::scoped(1);
        diagnostics.push(Diagnostic::UnmatchedKey { key: "Foo".into() });
        let json = serde_json::to_value(&diagnostics.events()[0]).unwrap();
        assert_eq!(json["kind"], "unmatched_key");
        assert_eq!(json["key"], "Foo");
        assert_eq!(json["item"], 1);
    }
}
