//! Ranking agreement
//!
//! Per-row Spearman and Kendall tau-b between gold and model rank vectors.
//! Rows where either side is constant carry no ordering information and are
//! left out of both averages.

use super::{MetricMap, MetricName};
use statrs::statistics::{Data, OrderStatistics, RankTieBreaker, Statistics};
use std::cmp::Ordering;

/// At least two different values
pub fn has_distinct_values(values: &[f64]) -> bool {
    values.first().is_some_and(|first| values.iter().any(|v| v != first))
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let cov = x.iter().population_covariance(y.iter());
    let denom = x.iter().population_std_dev() * y.iter().population_std_dev();
    if denom == 0.0 {
        return f64::NAN;
    }
    cov / denom
}

/// Spearman's rho: Pearson correlation of average ranks
pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    let rx = Data::new(x.to_vec()).ranks(RankTieBreaker::Average);
    let ry = Data::new(y.to_vec()).ranks(RankTieBreaker::Average);
    pearson(&rx, &ry)
}

/// Kendall's tau-b; NaN when either side is constant
pub fn kendall_tau_b(x: &[f64], y: &[f64]) -> f64 {
    let (mut concordant, mut discordant) = (0i64, 0i64);
    let (mut x_ties, mut y_ties) = (0i64, 0i64);

    for i in 0..x.len() {
        for j in (i + 1)..x.len() {
            let dx = x[i].partial_cmp(&x[j]).unwrap_or(Ordering::Equal);
            let dy = y[i].partial_cmp(&y[j]).unwrap_or(Ordering::Equal);
            match (dx, dy) {
                (Ordering::Equal, Ordering::Equal) => {}
                (Ordering::Equal, _) => x_ties += 1,
                (_, Ordering::Equal) => y_ties += 1,
                (a, b) if a == b => concordant += 1,
                _ => discordant += 1,
            }
        }
    }

    let base = (concordant + discordant) as f64;
    let denom = ((base + x_ties as f64) * (base + y_ties as f64)).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    (concordant - discordant) as f64 / denom
}

/// Gold rank from gold scores: label indices ordered by descending score,
/// ties kept in label order
pub fn derive_rank_from_scores(scores: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
    });
    order.into_iter().map(|i| i as f64).collect()
}

/// Mean ignoring NaN entries; NaN if nothing remains
fn nan_mean(values: &[f64]) -> f64 {
    values.iter().filter(|v| !v.is_nan()).mean()
}

pub fn rank_metrics(model: &[&[f64]], gold: &[&[f64]]) -> MetricMap {
    let mut spearmans = Vec::new();
    let mut kendalls = Vec::new();
    for (g, m) in gold.iter().zip(model) {
        if has_distinct_values(g) && has_distinct_values(m) {
            spearmans.push(spearman(g, m));
            kendalls.push(kendall_tau_b(g, m));
        }
    }

    tracing::debug!(
        rows = gold.len(),
        included = spearmans.len(),
        "rank rows with ordering information"
    );

    let mut metrics = MetricMap::new();
    metrics.insert(MetricName::SpearmanAvg, nan_mean(&spearmans));
    metrics.insert(MetricName::KendallTauAvg, nan_mean(&kendalls));
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_perfect_and_reversed_order() {
        let x = [1.0, 2.0, 3.0];
        let rev = [3.0, 2.0, 1.0];
        assert!((spearman(&x, &x) - 1.0).abs() < 1e-12);
        assert!((kendall_tau_b(&x, &x) - 1.0).abs() < 1e-12);
        assert!((spearman(&x, &rev) + 1.0).abs() < 1e-12);
        assert!((kendall_tau_b(&x, &rev) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ties_use_tau_b_correction() {
        // scipy.stats.kendalltau([1, 2, 2, 3], [1, 2, 3, 3]) = 0.8
        let tau = kendall_tau_b(&[1.0, 2.0, 2.0, 3.0], &[1.0, 2.0, 3.0, 3.0]);
        assert!((tau - 0.8).abs() < 1e-12);
        // average ranks [1, 2.5, 2.5, 4] vs [1, 2, 3.5, 3.5]
        let rho = spearman(&[1.0, 2.0, 2.0, 3.0], &[1.0, 2.0, 3.0, 3.0]);
        assert!((rho - 5.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_rows_are_excluded() {
        let gold: Vec<&[f64]> = vec![&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]];
        let model: Vec<&[f64]> = vec![&[3.0, 2.0, 1.0], &[1.0, 2.0, 3.0]];
        let metrics = rank_metrics(&model, &gold);
        assert!((metrics[&MetricName::SpearmanAvg] - 1.0).abs() < 1e-12);
        assert!((metrics[&MetricName::KendallTauAvg] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_rows_excluded_is_nan() {
        let constant: Vec<&[f64]> = vec![&[2.0, 2.0]];
        let metrics = rank_metrics(&constant, &constant);
        assert!(metrics[&MetricName::SpearmanAvg].is_nan());
        assert!(metrics[&MetricName::KendallTauAvg].is_nan());
    }

    #[test]
    fn test_derive_rank_is_stable_descending() {
        assert_eq!(derive_rank_from_scores(&[5.0, 3.0, 5.0]), vec![0.0, 2.0, 1.0]);
        assert_eq!(derive_rank_from_scores(&[1.0, 2.0, 3.0]), vec![2.0, 1.0, 0.0]);
        assert!(derive_rank_from_scores(&[]).is_empty());
    }

    #[test]
    fn test_distinct_values() {
        assert!(!has_distinct_values(&[]));
        assert!(!has_distinct_values(&[4.0, 4.0]));
        assert!(has_distinct_values(&[4.0, 1.0]));
    }

    proptest! {
        #[test]
        fn prop_correlations_bounded(
            x in prop::collection::vec(1u8..6, 5),
            y in prop::collection::vec(1u8..6, 5),
        ) {
            let x: Vec<f64> = x.into_iter().map(f64::from).collect();
            let y: Vec<f64> = y.into_iter().map(f64::from).collect();
            prop_assume!(has_distinct_values(&x) && has_distinct_values(&y));
            let rho = spearman(&x, &y);
            let tau = kendall_tau_b(&x, &y);
            prop_assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&rho));
            prop_assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&tau));
        }
    }
}
