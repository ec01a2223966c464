//! Distribution agreement
//!
//! Rows are probability vectors over the option labels. KL, JS and TVD are
//! computed per row and averaged; distance correlation is a single statistic
//! over the whole stacked matrix.

use super::{MetricMap, MetricName};
use ndarray::Array2;
use statrs::statistics::Statistics;

/// Floor applied before renormalizing in [`kl_divergence`]
pub const KL_EPSILON: f64 = 1e-10;

/// KL(p ‖ q) after clipping both vectors to `[ε, 1]` and renormalizing
pub fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    let p = clip_normalize(p);
    let q = clip_normalize(q);
    p.iter()
        .zip(&q)
        .map(|(&pi, &qi)| pi * (pi / qi).ln())
        .sum()
}

fn clip_normalize(v: &[f64]) -> Vec<f64> {
    let clipped: Vec<f64> = v.iter().map(|x| x.clamp(KL_EPSILON, 1.0)).collect();
    let total: f64 = clipped.iter().sum();
    clipped.into_iter().map(|x| x / total).collect()
}

/// Jensen-Shannon distance: `sqrt((KL(p‖m) + KL(q‖m)) / 2)`, `m = (p + q) / 2`
pub fn jensen_shannon(p: &[f64], q: &[f64]) -> f64 {
    let m: Vec<f64> = p.iter().zip(q).map(|(a, b)| (a + b) / 2.0).collect();
    // Rounding can leave the sum a hair below zero for identical inputs
    ((kl_divergence(p, &m) + kl_divergence(q, &m)) / 2.0)
        .max(0.0)
        .sqrt()
}

/// Half the L1 distance
pub fn total_variation_distance(p: &[f64], q: &[f64]) -> f64 {
    p.iter().zip(q).map(|(a, b)| (a - b).abs()).sum::<f64>() / 2.0
}

/// Stack equal-width rows into a matrix
fn stack(rows: &[&[f64]]) -> Array2<f64> {
    let width = rows.first().map_or(0, |r| r.len());
    Array2::from_shape_fn((rows.len(), width), |(i, j)| rows[i][j])
}

/// Euclidean distance matrix between rows, double-centred
fn double_centered_distances(x: &Array2<f64>) -> Array2<f64> {
    let n = x.nrows();
    let mut d = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let dist = (&x.row(i) - &x.row(j)).mapv(|v| v * v).sum().sqrt();
            d[[i, j]] = dist;
            d[[j, i]] = dist;
        }
    }

    let row_means: Vec<f64> = d.rows().into_iter().map(|r| r.iter().mean()).collect();
    let grand_mean = row_means.iter().mean();
    // Symmetric, so column means equal row means
    Array2::from_shape_fn((n, n), |(i, j)| {
        d[[i, j]] - row_means[i] - row_means[j] + grand_mean
    })
}

/// Squared distance covariance (V-statistic) of two centred matrices
fn dcov_sq(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    (a * b).iter().mean()
}

/// Distance correlation of two row-aligned samples, in [0, 1].
///
/// Zero when either sample has zero distance variance; NaN with no rows.
pub fn distance_correlation(x: &[&[f64]], y: &[&[f64]]) -> f64 {
    if x.is_empty() || x.len() != y.len() {
        return f64::NAN;
    }
    let a = double_centered_distances(&stack(x));
    let b = double_centered_distances(&stack(y));

    let dcov_xy = dcov_sq(&a, &b);
    let denom = (dcov_sq(&a, &a) * dcov_sq(&b, &b)).sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (dcov_xy / denom).max(0.0).sqrt()
}

/// All four distribution metrics over aligned rows
pub fn distribution_metrics(model: &[&[f64]], gold: &[&[f64]]) -> MetricMap {
    let pairs = || model.iter().zip(gold);
    let mut metrics = MetricMap::new();
    metrics.insert(
        MetricName::KlDivergence,
        pairs().map(|(p, q)| kl_divergence(p, q)).mean(),
    );
    metrics.insert(
        MetricName::JensenShannon,
        pairs().map(|(p, q)| jensen_shannon(p, q)).mean(),
    );
    metrics.insert(
        MetricName::TotalVariationDistance,
        pairs().map(|(p, q)| total_variation_distance(p, q)).mean(),
    );
    metrics.insert(MetricName::DistanceCorrelation, distance_correlation(gold, model));
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identical_distributions() {
        let p = [0.5, 0.3, 0.2];
        assert!(kl_divergence(&p, &p).abs() < 1e-12);
        assert!(jensen_shannon(&p, &p).abs() < 1e-6);
        assert_eq!(total_variation_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_disjoint_distributions() {
        let p = [1.0, 0.0];
        let q = [0.0, 1.0];
        assert!(close(total_variation_distance(&p, &q), 1.0));
        // KL is large but finite thanks to clipping
        let kl = kl_divergence(&p, &q);
        assert!(kl.is_finite() && kl > 20.0);
        // JS distance approaches sqrt(ln 2)
        assert!((jensen_shannon(&p, &q) - 2f64.ln().sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vectors_are_uniform_after_clipping() {
        let zeros = [0.0, 0.0, 0.0];
        let uniform = [1.0 / 3.0; 3];
        assert!(kl_divergence(&zeros, &uniform).abs() < 1e-12);
    }

    #[test]
    fn test_distance_correlation_bounds() {
        let x: Vec<&[f64]> = vec![&[1.0, 0.0], &[0.5, 0.5], &[0.0, 1.0]];
        assert!(close(distance_correlation(&x, &x), 1.0));

        let constant: Vec<&[f64]> = vec![&[0.2, 0.8]; 3];
        assert_eq!(distance_correlation(&x, &constant), 0.0);
        assert!(distance_correlation(&[], &[]).is_nan());
    }

    #[test]
    fn test_distance_correlation_invariant_to_scaling() {
        let x: Vec<&[f64]> = vec![&[1.0, 0.0], &[0.7, 0.3], &[0.2, 0.8], &[0.0, 1.0]];
        let y: Vec<&[f64]> = vec![&[2.0, 0.0], &[1.4, 0.6], &[0.4, 1.6], &[0.0, 2.0]];
        assert!(close(distance_correlation(&x, &y), 1.0));
    }

    #[test]
    fn test_empty_rows_give_nan() {
        let metrics = distribution_metrics(&[], &[]);
        assert!(metrics.values().all(|v| v.is_nan()));
        assert_eq!(metrics.len(), 4);
    }

    fn distribution(len: usize) -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(0.0f64..1.0, len).prop_map(|v| {
            let total: f64 = v.iter().sum();
            if total == 0.0 {
                v
            } else {
                v.into_iter().map(|x| x / total).collect()
            }
        })
    }

    proptest! {
        #[test]
        fn prop_tvd_in_unit_interval(p in distribution(5), q in distribution(5)) {
            let tvd = total_variation_distance(&p, &q);
            prop_assert!((0.0..=1.0 + 1e-12).contains(&tvd));
        }

        #[test]
        fn prop_kl_non_negative(p in distribution(3), q in distribution(3)) {
            prop_assert!(kl_divergence(&p, &q) >= -1e-12);
        }

        #[test]
        fn prop_js_symmetric(p in distribution(5), q in distribution(5)) {
            prop_assert!((jensen_shannon(&p, &q) - jensen_shannon(&q, &p)).abs() < 1e-9);
        }
    }
}
