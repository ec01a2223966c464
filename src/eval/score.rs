//! Per-option rating agreement

use super::{MetricMap, MetricName};
use statrs::statistics::Statistics;

pub fn rmse(gold: &[f64], model: &[f64]) -> f64 {
    gold.iter()
        .zip(model)
        .map(|(g, m)| (g - m).powi(2))
        .mean()
        .sqrt()
}

pub fn mae(gold: &[f64], model: &[f64]) -> f64 {
    gold.iter().zip(model).map(|(g, m)| (g - m).abs()).mean()
}

/// Coefficient of determination of `model` as a predictor of `gold`.
///
/// With constant gold values R² is 1.0 for a perfect fit and 0.0 otherwise;
/// fewer than two samples give NaN.
pub fn r2_score(gold: &[f64], model: &[f64]) -> f64 {
    if gold.len() < 2 {
        return f64::NAN;
    }
    let gold_mean = gold.iter().mean();
    let ss_res: f64 = gold.iter().zip(model).map(|(g, m)| (g - m).powi(2)).sum();
    let ss_tot: f64 = gold.iter().map(|g| (g - gold_mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// RMSE and MAE averaged over rows, R² over all values flattened row by row
pub fn score_metrics(model: &[&[f64]], gold: &[&[f64]]) -> MetricMap {
    let pairs = || gold.iter().zip(model);
    let gold_flat: Vec<f64> = gold.iter().flat_map(|r| r.iter().copied()).collect();
    let model_flat: Vec<f64> = model.iter().flat_map(|r| r.iter().copied()).collect();

    let mut metrics = MetricMap::new();
    metrics.insert(MetricName::RmseAvg, pairs().map(|(g, m)| rmse(g, m)).mean());
    metrics.insert(MetricName::MaeAvg, pairs().map(|(g, m)| mae(g, m)).mean());
    metrics.insert(MetricName::R2ScoreOverall, r2_score(&gold_flat, &model_flat));
    metrics
}
