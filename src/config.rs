//! Configuration
//!
//! Two YAML documents drive the binary: a pipeline config for stages 4-5 and
//! an evaluation config for metric calculation. Per-task label heuristics
//! live in [`TaskRegistry`], a read-only table built once at startup.

use crate::error::PipelineError;
use crate::types::{OptionLabel, OptionTexts};
use anyhow::{Context, Result};
use serde::{de::Error as _, Deserialize, Deserializer};
use serde_json::Value;
use std::path::{Path, PathBuf};

const THREE_WAY: &[OptionLabel] = &[OptionLabel::A, OptionLabel::B, OptionLabel::C];
const FIVE_WAY: &[OptionLabel] = &[
    OptionLabel::A,
    OptionLabel::B,
    OptionLabel::C,
    OptionLabel::D,
    OptionLabel::E,
];

/// Label heuristics for one task
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub labels: &'static [OptionLabel],
    /// Fixed vocabulary per label (e.g. NLI classes)
    pub synonyms: &'static [(OptionLabel, &'static str)],
    /// Whether options are free text read from `answerA`, `answerB`, ...
    pub reads_answer_texts: bool,
}

impl TaskSpec {
    pub fn synonym(&self, label: OptionLabel) -> Option<&'static str> {
        self.synonyms
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, s)| *s)
    }

    /// Field holding the literal answer text for `label`
    pub fn answer_field(label: OptionLabel) -> String {
        format!("answer{}", label)
    }

    /// Answer texts of an original dataset item, empty for fixed-vocabulary tasks
    pub fn option_texts(&self, item: &Value) -> OptionTexts {
        if !self.reads_answer_texts {
            return OptionTexts::new();
        }
        self.labels
            .iter()
            .filter_map(|&label| {
                item.get(Self::answer_field(label))
                    .and_then(Value::as_str)
                    .map(|text| (label, text.to_string()))
            })
            .collect()
    }

    fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// Declarative per-task table; new tasks extend this, not the matching logic
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    tasks: Vec<TaskSpec>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TaskRegistry {
    pub fn builtin() -> Self {
        Self {
            tasks: vec![
                TaskSpec {
                    name: "CommonsenseQA",
                    aliases: &["cqa"],
                    labels: FIVE_WAY,
                    synonyms: &[],
                    reads_answer_texts: true,
                },
                TaskSpec {
                    name: "SocialIQA",
                    aliases: &["siqa"],
                    labels: THREE_WAY,
                    synonyms: &[],
                    reads_answer_texts: true,
                },
                TaskSpec {
                    name: "VariErrNLI",
                    aliases: &["varierr"],
                    labels: THREE_WAY,
                    synonyms: &[
                        (OptionLabel::A, "entailment"),
                        (OptionLabel::B, "neutral"),
                        (OptionLabel::C, "contradiction"),
                    ],
                    reads_answer_texts: false,
                },
            ],
        }
    }

    pub fn with_task(mut self, task: TaskSpec) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    /// Case-insensitive lookup by name or alias
    pub fn lookup(&self, name: &str) -> Result<&TaskSpec, PipelineError> {
        self.tasks
            .iter()
            .find(|t| t.matches_name(name))
            .ok_or_else(|| PipelineError::UnknownTask {
                name: name.to_string(),
                known: self
                    .tasks
                    .iter()
                    .map(|t| t.name)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} config {}", what, path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse {} config {}", what, path.display()))
}

/// A stage section that only names its output
#[derive(Debug, Clone, Deserialize)]
pub struct StageOutput {
    pub output_file: PathBuf,
}

/// Stage 4 section
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizationStage {
    pub output_file: PathBuf,
    /// Labels to normalize onto; defaults to the task's label set
    #[serde(default)]
    pub standard_keys: Vec<String>,
}

/// Stage 5 section
#[derive(Debug, Clone, Deserialize)]
pub struct FilteringStage {
    pub output_file: PathBuf,
    pub discourse_file: PathBuf,
}

/// Config for `hlv postprocess`
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub task_name: String,
    /// Original dataset, read for answer texts
    pub input_file: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub structuring_stage_3: Option<StageOutput>,
    #[serde(default)]
    pub post_processing_stage_4: Option<NormalizationStage>,
    #[serde(default)]
    pub filtering_stage_5: Option<FilteringStage>,
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        read_yaml(path, "pipeline")
    }

    pub fn output_path(&self, file: &Path) -> PathBuf {
        self.output_dir.join(file)
    }

    /// Validated stage 4 labels for `task`
    pub fn standard_keys(&self, task: &TaskSpec) -> Result<Vec<OptionLabel>, PipelineError> {
        let keys = self
            .post_processing_stage_4
            .as_ref()
            .map(|s| s.standard_keys.as_slice())
            .unwrap_or_default();
        if keys.is_empty() {
            return Ok(task.labels.to_vec());
        }

        keys.iter()
            .map(|key| {
                key.parse::<OptionLabel>()
                    .ok()
                    .filter(|label| task.labels.contains(label))
                    .ok_or_else(|| PipelineError::InvalidStandardKey {
                        key: key.clone(),
                        task: task.name.to_string(),
                    })
            })
            .collect()
    }
}

/// One judge configuration whose raw output is scored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationSetting {
    pub name: String,
    pub raw_output_file: PathBuf,
}

/// Config for `hlv calculate`
#[derive(Debug, Clone, Deserialize)]
pub struct EvalConfig {
    pub task_name: String,
    pub output_dir: PathBuf,
    pub gold_standard_file: PathBuf,
    /// Settings in configured order, which is also the report row order
    #[serde(deserialize_with = "ordered_settings")]
    pub evaluation_settings: Vec<EvaluationSetting>,
}

impl EvalConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        read_yaml(path, "evaluation")
    }
}

fn ordered_settings<'de, D>(deserializer: D) -> std::result::Result<Vec<EvaluationSetting>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct SettingBody {
        raw_output_file: PathBuf,
    }

    let mapping = serde_yaml::Mapping::deserialize(deserializer)?;
    mapping
        .into_iter()
        .map(|(key, value)| {
            let name = key
                .as_str()
                .ok_or_else(|| D::Error::custom("evaluation setting names must be strings"))?
                .to_string();
            let body: SettingBody = serde_yaml::from_value(value)
                .map_err(|e| D::Error::custom(format!("setting '{}': {}", name, e)))?;
            Ok(EvaluationSetting {
                name,
                raw_output_file: body.raw_output_file,
            })
        })
        .collect()
}
