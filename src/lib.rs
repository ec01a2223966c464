//! hlv-pipeline - Human Label Variation pipeline
//!
//! Post-processing and evaluation for LLM explanations of multiple-choice
//! questions: free-form evidence is normalized onto canonical option labels,
//! filtered against discourse segments, and judge outputs are compared to
//! human-annotated gold distributions, ratings and rankings.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use hlv_pipeline::{config::TaskRegistry, eval, types::Frame};
//!
//! let registry = TaskRegistry::builtin();
//! let task = registry.lookup("cqa")?;
//!
//! // Stage 4 + 5: normalize and filter evidence
//! let processor = hlv_pipeline::evidence::PostProcessor::new(task, &[]);
//! let (normalized, _) = processor.normalize_items(stage3, &originals);
//! let (filtered, diagnostics) = processor.filter_items(normalized, &discourse);
//!
//! // Metrics: judge output vs gold standard
//! let metrics = eval::calculate_all(&model_frame, &gold_frame, &mut diagnostics);
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐     ┌──────────────────────────┐
//! │ Stage 3 structured JSONL │     │ judge raw output / gold  │
//! └────────────┬─────────────┘     └────────────┬─────────────┘
//!              ▼                                ▼
//!   KeyNormalizer (stage 4)           DataProcessor (frames)
//!              ▼                                ▼
//!   filter_evidence (stage 5)         calculate_all → MetricsReport
//!     └─ fuzzy::best_match              ├─ distribution / score / rank
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod eval;
pub mod evidence;
pub mod loader;
pub mod pipeline;
pub mod types;

pub use config::{EvalConfig, PipelineConfig, TaskRegistry, TaskSpec};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::PipelineError;
pub use eval::{calculate_all, MetricFamily, MetricMap, MetricName, MetricsReport};
pub use evidence::{best_match, filter_evidence, KeyNormalizer, PostProcessor};
pub use types::*;
