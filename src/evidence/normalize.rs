//! Key normalization (stage 4)
//!
//! Structured evidence comes back from the model keyed by whatever the model
//! felt like writing: `"(A)"`, `"Option B"`, `"C. contradiction"`, or the
//! answer text itself. Each key is mapped onto exactly one canonical label.
//!
//! Matching is a case-insensitive substring test of a label's variants
//! against the raw key, in two passes:
//!
//! 1. fixed variants (`(X)`, `X.`, `Option X`, task synonym) for every label
//!    in label order;
//! 2. the item's literal answer text for every label in label order.
//!
//! The first hit wins, so a fixed variant always outranks an answer-text
//! match. Keys matching nothing are dropped with a diagnostic.

use crate::config::TaskSpec;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::types::{Evidence, EvidenceRecord, OptionLabel, OptionTexts, Sentiment};
use serde_json::Value;

/// Maps raw evidence keys onto a task's canonical labels
#[derive(Debug, Clone)]
pub struct KeyNormalizer {
    /// Lowercased fixed variants per label, in label order
    variants: Vec<(OptionLabel, Vec<String>)>,
}

impl KeyNormalizer {
    /// Normalizer over `labels`, or the task's full label set when empty
    pub fn new(task: &TaskSpec, labels: &[OptionLabel]) -> Self {
        let labels = if labels.is_empty() { task.labels } else { labels };
        let variants = labels
            .iter()
            .map(|&label| {
                let mut forms = vec![
                    format!("({})", label),
                    format!("{}.", label),
                    format!("Option {}", label),
                ];
                if let Some(synonym) = task.synonym(label) {
                    forms.push(synonym.to_string());
                }
                let forms = forms.into_iter().map(|f| f.to_lowercase()).collect();
                (label, forms)
            })
            .collect();

        Self { variants }
    }

    pub fn labels(&self) -> impl Iterator<Item = OptionLabel> + '_ {
        self.variants.iter().map(|(label, _)| *label)
    }

    /// Canonical label for a raw key, if any
    pub fn match_key(&self, raw_key: &str, option_texts: &OptionTexts) -> Option<OptionLabel> {
        let key = raw_key.to_lowercase();

        let fixed = self.variants.iter().find(|(_, forms)| {
            forms
                .iter()
                .any(|form| !form.is_empty() && key.contains(form.as_str()))
        });
        if let Some((label, _)) = fixed {
            return Some(*label);
        }

        self.labels().find(|label| {
            option_texts
                .get(label)
                .map(|text| text.trim().to_lowercase())
                .is_some_and(|text| !text.is_empty() && key.contains(&text))
        })
    }

    /// Normalize one structured-evidence payload.
    ///
    /// A non-object payload yields an empty record. When two keys land on
    /// the same label the later one wins.
    pub fn normalize(
        &self,
        raw: &Value,
        option_texts: &OptionTexts,
        diagnostics: &mut Diagnostics,
    ) -> EvidenceRecord {
        let mut record = EvidenceRecord::new();
        let Some(object) = raw.as_object() else {
            diagnostics.push(Diagnostic::NonMappingEvidence);
            return record;
        };

        for (key, value) in object {
            let Some(label) = self.match_key(key, option_texts) else {
                diagnostics.push(Diagnostic::UnmatchedKey { key: key.clone() });
                continue;
            };
            let evidence = coerce_evidence(value, label, diagnostics);
            if record.insert(label, evidence).is_some() {
                diagnostics.push(Diagnostic::DuplicateLabel {
                    label,
                    key: key.clone(),
                });
            }
        }

        record
    }
}

/// Read `{support, oppose}` from an arbitrary value, keeping string entries
pub fn coerce_evidence(value: &Value, label: OptionLabel, diagnostics: &mut Diagnostics) -> Evidence {
    let mut evidence = Evidence::default();
    let Some(object) = value.as_object() else {
        return evidence;
    };

    for sentiment in Sentiment::BOTH {
        let Some(entries) = object.get(sentiment.as_str()).and_then(Value::as_array) else {
            continue;
        };
        for entry in entries {
            match entry.as_str() {
                Some(text) => evidence.sentences_mut(sentiment).push(text.to_string()),
                None => diagnostics.push(Diagnostic::NonTextSentence { label, sentiment }),
            }
        }
    }

    evidence
}

/// Parse an already-normalized record (keys are bare labels), as written by stage 4
pub fn parse_normalized(value: &Value, diagnostics: &mut Diagnostics) -> EvidenceRecord {
    let mut record = EvidenceRecord::new();
    let Some(object) = value.as_object() else {
        if !value.is_null() {
            diagnostics.push(Diagnostic::NonMappingEvidence);
        }
        return record;
    };

    for (key, entry) in object {
        match key.parse::<OptionLabel>() {
            Ok(label) => {
                record.insert(label, coerce_evidence(entry, label, diagnostics));
            }
            Err(_) => diagnostics.push(Diagnostic::UnmatchedKey { key: key.clone() }),
        }
    }

    record
}
