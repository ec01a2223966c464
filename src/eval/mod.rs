//! Evaluation framework for HLV judges
//!
//! Compares what a judge model produced for each item against the human
//! gold standard:
//! - Distribution metrics: KL, Jensen-Shannon, total variation, distance correlation
//! - Score metrics: per-item RMSE / MAE, overall R²
//! - Rank metrics: per-item Spearman and Kendall tau-b
//!
//! Raw records are turned into [`Frame`]s by [`processor::DataProcessor`],
//! compared by [`calculate_all`], and gathered per evaluation setting into a
//! [`MetricsReport`].

pub mod calculator;
pub mod distribution;
pub mod processor;
pub mod rank;
pub mod report;
pub mod score;

pub use calculator::calculate_all;
pub use processor::DataProcessor;
pub use report::{print_metrics_report, MetricsReport, SettingMetrics};

use crate::config::{EvalConfig, TaskRegistry};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::loader::load_jsonl;
use crate::types::{Column, Frame};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable metric identifiers, in report column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricName {
    #[serde(rename = "KL_Divergence")]
    KlDivergence,
    #[serde(rename = "Jensen_Shannon")]
    JensenShannon,
    #[serde(rename = "Total_Variation_Distance")]
    TotalVariationDistance,
    #[serde(rename = "Distance_Correlation")]
    DistanceCorrelation,
    #[serde(rename = "RMSE_Avg")]
    RmseAvg,
    #[serde(rename = "MAE_Avg")]
    MaeAvg,
    #[serde(rename = "R2_Score_Overall")]
    R2ScoreOverall,
    #[serde(rename = "Spearman_Avg")]
    SpearmanAvg,
    #[serde(rename = "Kendall_Tau_Avg")]
    KendallTauAvg,
}

impl MetricName {
    pub const ALL: [MetricName; 9] = [
        MetricName::KlDivergence,
        MetricName::JensenShannon,
        MetricName::TotalVariationDistance,
        MetricName::DistanceCorrelation,
        MetricName::RmseAvg,
        MetricName::MaeAvg,
        MetricName::R2ScoreOverall,
        MetricName::SpearmanAvg,
        MetricName::KendallTauAvg,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricName::KlDivergence => "KL_Divergence",
            MetricName::JensenShannon => "Jensen_Shannon",
            MetricName::TotalVariationDistance => "Total_Variation_Distance",
            MetricName::DistanceCorrelation => "Distance_Correlation",
            MetricName::RmseAvg => "RMSE_Avg",
            MetricName::MaeAvg => "MAE_Avg",
            MetricName::R2ScoreOverall => "R2_Score_Overall",
            MetricName::SpearmanAvg => "Spearman_Avg",
            MetricName::KendallTauAvg => "Kendall_Tau_Avg",
        }
    }

    pub fn family(self) -> MetricFamily {
        match self {
            MetricName::KlDivergence
            | MetricName::JensenShannon
            | MetricName::TotalVariationDistance
            | MetricName::DistanceCorrelation => MetricFamily::Distribution,
            MetricName::RmseAvg | MetricName::MaeAvg | MetricName::R2ScoreOverall => {
                MetricFamily::Score
            }
            MetricName::SpearmanAvg | MetricName::KendallTauAvg => MetricFamily::Rank,
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric name → value. NaN marks an aggregate over zero rows.
pub type MetricMap = BTreeMap<MetricName, f64>;

/// Group of metrics computed from one column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricFamily {
    Distribution,
    Score,
    Rank,
}

impl MetricFamily {
    pub const ALL: [MetricFamily; 3] = [
        MetricFamily::Distribution,
        MetricFamily::Score,
        MetricFamily::Rank,
    ];

    pub fn column(self) -> Column {
        match self {
            MetricFamily::Distribution => Column::Distribution,
            MetricFamily::Score => Column::Score,
            MetricFamily::Rank => Column::Rank,
        }
    }

    pub fn metrics(self) -> impl Iterator<Item = MetricName> {
        MetricName::ALL.into_iter().filter(move |m| m.family() == self)
    }
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column().as_str())
    }
}

/// Score every configured setting against the gold standard.
///
/// Settings whose raw output file is missing are skipped with a diagnostic
/// and get no report row.
pub fn run_calculation(
    config: &EvalConfig,
    registry: &TaskRegistry,
) -> Result<(MetricsReport, Diagnostics)> {
    let task = registry.lookup(&config.task_name)?;
    let processor = DataProcessor::new(task);
    let mut diagnostics = Diagnostics::new();

    if !config.gold_standard_file.is_file() {
        return Err(crate::error::PipelineError::MissingInput {
            what: "gold standard file",
            path: config.gold_standard_file.clone(),
        }
        .into());
    }
    tracing::info!(path = %config.gold_standard_file.display(), "processing gold standard");
    let gold_items = load_jsonl(&config.gold_standard_file, &mut diagnostics)?;
    let gold = processor.gold_frame(&gold_items, &mut diagnostics);

    let mut report = MetricsReport::new(&config.task_name);
    for setting in &config.evaluation_settings {
        let path = config.output_dir.join(&setting.raw_output_file);
        if !path.is_file() {
            diagnostics.push(Diagnostic::SettingSkipped {
                setting: setting.name.clone(),
                path: path.display().to_string(),
            });
            continue;
        }

        tracing::info!(setting = %setting.name, "calculating metrics");
        let raw = load_jsonl(&path, &mut diagnostics)?;
        let model: Frame = processor.judge_frame(&raw);
        let metrics = calculate_all(&model, &gold, &mut diagnostics);
        report.push(&setting.name, metrics);
    }

    Ok((report, diagnostics))
}
