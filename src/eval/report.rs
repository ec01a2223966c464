//! Setting × metric report
//!
//! One row per evaluation setting (configured order), one column per metric
//! that any setting produced. Absent and non-finite cells are left blank.

use super::{MetricMap, MetricName};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Metrics of one evaluation setting
#[derive(Debug, Clone, Serialize)]
pub struct SettingMetrics {
    pub setting: String,
    pub metrics: MetricMap,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub task: String,
    pub timestamp: String,
    settings: Vec<SettingMetrics>,
}

/// Cell text: the value, or blank when it is not a finite number
fn cell(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => v.to_string(),
        _ => String::new(),
    }
}

impl MetricsReport {
    pub fn new(task: &str) -> Self {
        Self {
            task: task.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            settings: Vec::new(),
        }
    }

    pub fn push(&mut self, setting: &str, metrics: MetricMap) {
        self.settings.push(SettingMetrics {
            setting: setting.to_string(),
            metrics,
        });
    }

    pub fn settings(&self) -> &[SettingMetrics] {
        &self.settings
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Union of metric names across settings, in stable order
    pub fn columns(&self) -> Vec<MetricName> {
        self.settings
            .iter()
            .flat_map(|s| s.metrics.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn csv_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}_metrics_report.csv", self.task))
    }

    pub fn json_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}_metrics_report.json", self.task))
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let columns = self.columns();

        let mut header = vec!["setting".to_string()];
        header.extend(columns.iter().map(|c| c.to_string()));
        writer.write_record(&header)?;

        for setting in &self.settings {
            let mut record = vec![setting.setting.clone()];
            record.extend(
                columns
                    .iter()
                    .map(|c| cell(setting.metrics.get(c).copied())),
            );
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Write both report files into `output_dir`
    pub fn save(&self, output_dir: &Path) -> Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;
        let csv_path = self.csv_path(output_dir);
        let json_path = self.json_path(output_dir);
        self.write_csv(&csv_path)?;
        self.write_json(&json_path)?;
        tracing::info!(csv = %csv_path.display(), json = %json_path.display(), "metrics report saved");
        Ok((csv_path, json_path))
    }
}

/// Print the report in a human-readable format
pub fn print_metrics_report(report: &MetricsReport) {
    println!("\n┌─────────────────────────────────────────────────────────────┐");
    println!("│ 📏 HLV METRICS REPORT                                       │");
    println!("│    {:<10} {:<46} │", report.timestamp.get(..10).unwrap_or(""), report.task);
    println!("└─────────────────────────────────────────────────────────────┘\n");

    if report.is_empty() {
        println!("⚠️  No evaluation settings produced metrics.\n");
        return;
    }

    let columns = report.columns();
    for setting in report.settings() {
        println!("─────────────────────────────────────────────────────────────");
        println!("📊 {}", setting.setting);
        println!("─────────────────────────────────────────────────────────────");
        for column in &columns {
            match setting.metrics.get(column) {
                Some(v) if v.is_finite() => println!("   {:.<28} {:>10.4}", column.as_str(), v),
                _ => println!("   {:.<28} {:>10}", column.as_str(), "-"),
            }
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn report() -> MetricsReport {
        let mut report = MetricsReport::new("cqa");
        let mut baseline = MetricMap::new();
        baseline.insert(MetricName::RmseAvg, 0.5);
        baseline.insert(MetricName::KlDivergence, 0.25);
        let mut explained = MetricMap::new();
        explained.insert(MetricName::KlDivergence, 0.125);
        explained.insert(MetricName::SpearmanAvg, f64::NAN);
        report.push("baseline", baseline);
        report.push("with_explanations", explained);
        report
    }

    #[test]
    fn test_columns_are_union_in_stable_order() {
        assert_eq!(
            report().columns(),
            vec![MetricName::KlDivergence, MetricName::RmseAvg, MetricName::SpearmanAvg]
        );
    }

    #[test]
    fn test_csv_blank_for_absent_and_nan() {
        let dir = tempdir().unwrap();
        let report = report();
        let (csv_path, json_path) = report.save(dir.path()).unwrap();
        assert!(csv_path.ends_with("cqa_metrics_report.csv"));

        let text = fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "setting,KL_Divergence,RMSE_Avg,Spearman_Avg");
        assert_eq!(lines[1], "baseline,0.25,0.5,");
        assert_eq!(lines[2], "with_explanations,0.125,,");

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["task"], "cqa");
        assert_eq!(json["settings"][0]["metrics"]["RMSE_Avg"], 0.5);
        assert!(json["settings"][1]["metrics"]["Spearman_Avg"].is_null());
        assert!(chrono::DateTime::parse_from_rfc3339(json["timestamp"].as_str().unwrap()).is_ok());
    }
}
