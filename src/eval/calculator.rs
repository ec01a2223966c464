//! Metric orchestration
//!
//! Decides which families can be computed from the columns both frames
//! carry, lines the rows up, and merges the family results.

use super::distribution::distribution_metrics;
use super::rank::{derive_rank_from_scores, rank_metrics};
use super::score::score_metrics;
use super::{MetricFamily, MetricMap};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::types::{Column, Frame};

/// Row pairs of one family whose widths match the gold frame's first row
fn aligned<'a>(
    family: MetricFamily,
    model: &[&'a [f64]],
    gold: &[&'a [f64]],
    diagnostics: &mut Diagnostics,
) -> (Vec<&'a [f64]>, Vec<&'a [f64]>) {
    let Some(width) = gold.first().map(|r| r.len()) else {
        return (Vec::new(), Vec::new());
    };

    let mut model_rows = Vec::new();
    let mut gold_rows = Vec::new();
    for (row, (&m, &g)) in model.iter().zip(gold).enumerate() {
        if m.len() != width || g.len() != width {
            diagnostics.push(Diagnostic::ShapeMismatch {
                family,
                row,
                model_len: m.len(),
                gold_len: g.len(),
            });
            continue;
        }
        model_rows.push(m);
        gold_rows.push(g);
    }
    (model_rows, gold_rows)
}

fn skip(family: MetricFamily, diagnostics: &mut Diagnostics) {
    diagnostics.push(Diagnostic::MetricFamilySkipped {
        family,
        column: family.column(),
    });
}

/// Every metric family both frames support.
///
/// Families whose column is missing on either side are skipped and their
/// keys are absent from the result. Frames of unequal length are compared
/// over their common prefix.
pub fn calculate_all(model: &Frame, gold: &Frame, diagnostics: &mut Diagnostics) -> MetricMap {
    let mut metrics = MetricMap::new();
    if model.len() != gold.len() {
        diagnostics.push(Diagnostic::RowCountMismatch {
            model: model.len(),
            gold: gold.len(),
        });
    }

    match (model.column(Column::Distribution), gold.column(Column::Distribution)) {
        (Some(m), Some(g)) => {
            let (m, g) = aligned(MetricFamily::Distribution, &m, &g, diagnostics);
            metrics.extend(distribution_metrics(&m, &g));
        }
        _ => skip(MetricFamily::Distribution, diagnostics),
    }

    match (model.column(Column::Score), gold.column(Column::Score)) {
        (Some(m), Some(g)) => {
            let (m, g) = aligned(MetricFamily::Score, &m, &g, diagnostics);
            metrics.extend(score_metrics(&m, &g));
        }
        _ => skip(MetricFamily::Score, diagnostics),
    }

    // Gold rank may be derived from gold score when only the model ranks
    let derived: Option<Vec<Vec<f64>>> = if gold.has(Column::Rank) {
        None
    } else {
        gold.column(Column::Score)
            .map(|scores| scores.iter().map(|s| derive_rank_from_scores(s)).collect())
    };
    let gold_rank: Option<Vec<&[f64]>> = match &derived {
        Some(rows) => Some(rows.iter().map(Vec::as_slice).collect()),
        None => gold.column(Column::Rank),
    };

    match (model.column(Column::Rank), gold_rank) {
        (Some(m), Some(g)) => {
            if derived.is_some() {
                tracing::debug!("gold rank derived from gold score");
            }
            let (m, g) = aligned(MetricFamily::Rank, &m, &g, diagnostics);
            metrics.extend(rank_metrics(&m, &g));
        }
        _ => skip(MetricFamily::Rank, diagnostics),
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::eval::MetricName;
    use crate::types::FrameRow;

    fn dist_row(d: &[f64]) -> FrameRow {
        FrameRow {
            distribution: Some(d.to_vec()),
            ..Default::default()
        }
    }

    #[test]
    fn test_identical_distribution_frames() {
        let frame = Frame::new(vec![
            dist_row(&[0.5, 0.3, 0.2]),
            dist_row(&[0.1, 0.1, 0.8]),
            dist_row(&[0.0, 1.0, 0.0]),
        ]);
        let mut diagnostics = Diagnostics::new();
        let metrics = calculate_all(&frame, &frame, &mut diagnostics);

        assert!(metrics[&MetricName::TotalVariationDistance].abs() < 1e-12);
        assert!(metrics[&MetricName::KlDivergence].abs() < 1e-9);
        assert!(metrics[&MetricName::JensenShannon].abs() < 1e-4);
        assert!((metrics[&MetricName::DistanceCorrelation] - 1.0).abs() < 1e-9);
        assert!(!metrics.contains_key(&MetricName::RmseAvg));
        assert!(!metrics.contains_key(&MetricName::SpearmanAvg));
        assert_eq!(diagnostics.count(DiagnosticKind::MetricFamilySkipped), 2);
    }

    #[test]
    fn test_gold_rank_derived_from_score() {
        let model = Frame::new(vec![FrameRow {
            rank: Some(vec![0.0, 2.0, 1.0]),
            ..Default::default()
        }]);
        let gold = Frame::new(vec![FrameRow {
            score: Some(vec![5.0, 3.0, 5.0]),
            ..Default::default()
        }]);
        let mut diagnostics = Diagnostics::new();
        let metrics = calculate_all(&model, &gold, &mut diagnostics);

        // derived gold rank is [0, 2, 1]
        assert!((metrics[&MetricName::SpearmanAvg] - 1.0).abs() < 1e-12);
        assert!((metrics[&MetricName::KendallTauAvg] - 1.0).abs() < 1e-12);
        // score is only on the gold side
        assert!(!metrics.contains_key(&MetricName::RmseAvg));
    }

    #[test]
    fn test_no_shared_columns_is_empty() {
        let model = Frame::new(vec![dist_row(&[1.0, 0.0])]);
        let gold = Frame::new(vec![FrameRow {
            rank: Some(vec![0.0, 1.0]),
            ..Default::default()
        }]);
        let mut diagnostics = Diagnostics::new();
        assert!(calculate_all(&model, &gold, &mut diagnostics).is_empty());
        assert_eq!(diagnostics.count(DiagnosticKind::MetricFamilySkipped), 3);
    }

    #[test]
    fn test_unequal_lengths_use_common_prefix() {
        let model = Frame::new(vec![dist_row(&[1.0, 0.0]), dist_row(&[0.0, 1.0])]);
        let gold = Frame::new(vec![dist_row(&[0.0, 1.0])]);
        let mut diagnostics = Diagnostics::new();
        let metrics = calculate_all(&model, &gold, &mut diagnostics);

        assert!((metrics[&MetricName::TotalVariationDistance] - 1.0).abs() < 1e-12);
        assert_eq!(diagnostics.count(DiagnosticKind::RowCountMismatch), 1);
    }

    #[test]
    fn test_shape_mismatch_rows_are_skipped() {
        let model = Frame::new(vec![
            FrameRow {
                score: Some(vec![5.0, 1.0, 3.0]),
                ..Default::default()
            },
            FrameRow {
                score: Some(vec![5.0, 1.0]),
                ..Default::default()
            },
        ]);
        let gold = Frame::new(vec![
            FrameRow {
                score: Some(vec![5.0, 1.0, 3.0]),
                ..Default::default()
            },
            FrameRow {
                score: Some(vec![2.0, 2.0, 2.0]),
                ..Default::default()
            },
        ]);
        let mut diagnostics = Diagnostics::new();
        let metrics = calculate_all(&model, &gold, &mut diagnostics);

        assert_eq!(metrics[&MetricName::RmseAvg], 0.0);
        assert_eq!(diagnostics.count(DiagnosticKind::ShapeMismatch), 1);
    }

    #[test]
    fn test_partial_column_counts_as_missing() {
        let model = Frame::new(vec![dist_row(&[1.0, 0.0]), FrameRow::default()]);
        let gold = Frame::new(vec![dist_row(&[1.0, 0.0]), dist_row(&[0.0, 1.0])]);
        let mut diagnostics = Diagnostics::new();
        let metrics = calculate_all(&model, &gold, &mut diagnostics);
        assert!(!metrics.contains_key(&MetricName::KlDivergence));
    }
}
