//! Stage 4 and stage 5 over whole datasets
//!
//! Items are independent, so both stages fan out over the rayon pool. Each
//! item collects its own diagnostics; results and diagnostics are gathered
//! back in input order, so a parallel run is indistinguishable from a
//! sequential one.

use super::filter::filter_evidence;
use super::normalize::{parse_normalized, KeyNormalizer};
use crate::config::TaskSpec;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::types::{evidence_record_to_value, DiscourseRecord, EvidenceRecord, OptionLabel};
use rayon::prelude::*;
use serde_json::Value;

pub const STRUCTURED_FIELD: &str = "structured_evidence";
pub const NORMALIZED_FIELD: &str = "normalized_evidence";
pub const FILTERED_FIELD: &str = "filtered_evidence";

/// Runs key normalization and discourse filtering for one task
#[derive(Debug, Clone)]
pub struct PostProcessor<'t> {
    task: &'t TaskSpec,
    normalizer: KeyNormalizer,
}

impl<'t> PostProcessor<'t> {
    /// `standard_keys` restricts the labels normalized onto; empty means all
    pub fn new(task: &'t TaskSpec, standard_keys: &[OptionLabel]) -> Self {
        Self {
            task,
            normalizer: KeyNormalizer::new(task, standard_keys),
        }
    }

    pub fn task(&self) -> &TaskSpec {
        self.task
    }

    /// Stage 4 for one item. `original` is the matching row of the source
    /// dataset, used for answer texts.
    pub fn normalize_item(
        &self,
        mut item: Value,
        original: Option<&Value>,
        diagnostics: &mut Diagnostics,
    ) -> Value {
        let Some(fields) = item.as_object_mut() else {
            return item;
        };
        let Some(structured) = fields.shift_remove(STRUCTURED_FIELD) else {
            return item;
        };

        let option_texts = original
            .map(|o| self.task.option_texts(o))
            .unwrap_or_default();
        let record = self
            .normalizer
            .normalize(&structured, &option_texts, diagnostics);
        fields.insert(NORMALIZED_FIELD.to_string(), evidence_record_to_value(&record));
        item
    }

    /// Stage 5 for one item. `discourse` is the matching row of the
    /// discourse dataset, absent when that dataset is shorter.
    pub fn filter_item(
        &self,
        mut item: Value,
        discourse: Option<&Value>,
        diagnostics: &mut Diagnostics,
    ) -> Value {
        let Some(fields) = item.as_object_mut() else {
            return item;
        };
        let normalized = fields.shift_remove(NORMALIZED_FIELD).unwrap_or(Value::Null);
        fields.shift_remove(STRUCTURED_FIELD);

        let filtered = match discourse {
            Some(discourse) => {
                let units = DiscourseRecord::from_value(discourse).units();
                let record = parse_normalized(&normalized, diagnostics);
                filter_evidence(&record, &units, diagnostics)
            }
            None => {
                diagnostics.push(Diagnostic::MissingDiscourse);
                EvidenceRecord::new()
            }
        };
        fields.insert(FILTERED_FIELD.to_string(), evidence_record_to_value(&filtered));
        item
    }

    /// Stage 4 over a dataset; item `i` pairs with row `i` of `originals`
    pub fn normalize_items(&self, items: Vec<Value>, originals: &[Value]) -> (Vec<Value>, Diagnostics) {
        let (items, diagnostics) = run_ordered(items, |i, item, diagnostics| {
            self.normalize_item(item, originals.get(i), diagnostics)
        });
        tracing::info!(task = self.task.name, items = items.len(), "normalized evidence keys");
        (items, diagnostics)
    }

    /// Stage 5 over a dataset; item `i` pairs with row `i` of `discourse`
    pub fn filter_items(&self, items: Vec<Value>, discourse: &[Value]) -> (Vec<Value>, Diagnostics) {
        let (items, diagnostics) = run_ordered(items, |i, item, diagnostics| {
            self.filter_item(item, discourse.get(i), diagnostics)
        });
        tracing::info!(task = self.task.name, items = items.len(), "filtered evidence");
        (items, diagnostics)
    }
}

fn run_ordered<F>(items: Vec<Value>, f: F) -> (Vec<Value>, Diagnostics)
where
    F: Fn(usize, Value, &mut Diagnostics) -> Value + Sync,
{
    let results: Vec<(Value, Diagnostics)> = items
        .into_par_iter()
        .enumerate()
        .map(|(i, item)| {
            let mut local = Diagnostics::scoped(i);
            let out = f(i, item, &mut local);
            (out, local)
        })
        .collect();

    let mut diagnostics = Diagnostics::new();
    let mut out = Vec::with_capacity(results.len());
    for (item, local) in results {
        out.push(item);
        diagnostics.extend(local);
    }
    (out, diagnostics)
}
