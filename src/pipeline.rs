//! Post-processing driver
//!
//! Stages 1-3 (generation, evidence extraction, structuring) run elsewhere
//! and leave their JSONL output in `output_dir`. This module picks up from
//! there: stage 4 normalizes evidence keys, stage 5 filters evidence against
//! discourse units. Each stage reads the previous stage's file, so a run can
//! resume from either.

use crate::config::{PipelineConfig, TaskRegistry};
use crate::diagnostics::Diagnostics;
use crate::error::PipelineError;
use crate::evidence::PostProcessor;
use crate::loader::{load_jsonl, write_jsonl};
use anyhow::Result;
use std::path::{Path, PathBuf};

pub const FIRST_STAGE: u8 = 1;
pub const LAST_STAGE: u8 = 5;

/// What a post-processing run produced
#[derive(Debug, Default)]
pub struct PipelineRun {
    pub normalized_file: Option<PathBuf>,
    pub filtered_file: Option<PathBuf>,
    pub diagnostics: Diagnostics,
}

fn require_file(path: &Path, missing: impl FnOnce() -> PipelineError) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(missing().into())
    }
}

/// Run stages `start_stage..=5` that are configured
pub fn run_postprocess(
    config: &PipelineConfig,
    registry: &TaskRegistry,
    start_stage: u8,
) -> Result<PipelineRun> {
    let task = registry.lookup(&config.task_name)?;
    let standard_keys = config.standard_keys(task)?;
    let processor = PostProcessor::new(task, &standard_keys);
    let mut run = PipelineRun::default();

    for stage in start_stage.max(FIRST_STAGE)..=3 {
        tracing::info!(stage, "stage runs outside this tool, skipping");
    }

    if start_stage <= 4 {
        if let Some(stage4) = &config.post_processing_stage_4 {
            let stage3 = config
                .structuring_stage_3
                .as_ref()
                .ok_or(PipelineError::MissingConfigKey("structuring_stage_3.output_file"))?;
            let input = config.output_path(&stage3.output_file);
            require_file(&input, || PipelineError::MissingStageOutput {
                stage: "Stage 3",
                path: input.clone(),
            })?;
            require_file(&config.input_file, || PipelineError::MissingInput {
                what: "original dataset",
                path: config.input_file.clone(),
            })?;

            let mut diagnostics = Diagnostics::new();
            tracing::info!(path = %input.display(), "loading stage 3 output");
            let items = load_jsonl(&input, &mut diagnostics)?;
            let originals = load_jsonl(&config.input_file, &mut diagnostics)?;

            let (normalized, stage_diagnostics) = processor.normalize_items(items, &originals);
            diagnostics.extend(stage_diagnostics);

            let output = config.output_path(&stage4.output_file);
            write_jsonl(&output, &normalized)?;
            tracing::info!(path = %output.display(), items = normalized.len(), "stage 4 results saved");
            diagnostics.log_summary("stage 4");

            run.diagnostics.extend(diagnostics);
            run.normalized_file = Some(output);
        }
    }

    if start_stage <= 5 {
        if let Some(stage5) = &config.filtering_stage_5 {
            let stage4 = config
                .post_processing_stage_4
                .as_ref()
                .ok_or(PipelineError::MissingConfigKey("post_processing_stage_4.output_file"))?;
            let input = config.output_path(&stage4.output_file);
            require_file(&input, || PipelineError::MissingStageOutput {
                stage: "Stage 4",
                path: input.clone(),
            })?;
            require_file(&stage5.discourse_file, || PipelineError::MissingInput {
                what: "discourse file",
                path: stage5.discourse_file.clone(),
            })?;

            let mut diagnostics = Diagnostics::new();
            tracing::info!(path = %input.display(), "loading stage 4 output");
            let items = load_jsonl(&input, &mut diagnostics)?;
            let discourse = load_jsonl(&stage5.discourse_file, &mut diagnostics)?;

            let (filtered, stage_diagnostics) = processor.filter_items(items, &discourse);
            diagnostics.extend(stage_diagnostics);

            let output = config.output_path(&stage5.output_file);
            write_jsonl(&output, &filtered)?;
            tracing::info!(path = %output.display(), items = filtered.len(), "stage 5 results saved");
            diagnostics.log_summary("stage 5");

            run.diagnostics.extend(diagnostics);
            run.filtered_file = Some(output);
        }
    }

    Ok(run)
}
