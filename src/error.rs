//! Fatal errors
//!
//! Anything recoverable per record or per setting is a [`crate::Diagnostic`];
//! these abort the run because downstream stages have nothing valid to read.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Upstream stage output is missing.
    #[error("{stage} output not found at {}. Run {stage} first.", .path.display())]
    MissingStageOutput { stage: &'static str, path: PathBuf },

    /// A required input file is missing.
    #[error("{what} not found at {}", .path.display())]
    MissingInput { what: &'static str, path: PathBuf },

    /// A config section needed by the requested stage is absent.
    #[error("required config key `{0}` is missing")]
    MissingConfigKey(&'static str),

    /// Task name has no entry in the task registry.
    #[error("task `{name}` is not recognized (known tasks: {known})")]
    UnknownTask { name: String, known: String },

    /// Configured standard key is not a label of the task.
    #[error("standard key `{key}` is not a label of task `{task}`")]
    InvalidStandardKey { key: String, task: String },
}
