//! hlv - Human Label Variation pipeline
//!
//! Post-process structured evidence (stages 4-5) and score judge outputs
//! against the human gold standard.
//!
//! Run with: hlv postprocess --config pipeline.yaml
//!       or: hlv calculate --config evaluation.yaml

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use hlv_pipeline::{
    config::{EvalConfig, PipelineConfig, TaskRegistry},
    eval, pipeline,
};
use std::path::{Path, PathBuf};

/// Evidence post-processing and HLV metrics
#[derive(Parser, Debug)]
#[command(name = "hlv", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize and filter structured evidence (stages 4-5)
    Postprocess {
        /// Pipeline configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Stage to start from (1 to 5); stages 1-3 run elsewhere
        #[arg(long, default_value_t = pipeline::FIRST_STAGE)]
        start_stage: u8,
    },

    /// Calculate metrics for every configured evaluation setting
    Calculate {
        /// Evaluation configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let registry = TaskRegistry::builtin();

    match cli.command {
        Commands::Postprocess {
            config,
            start_stage,
        } => run_postprocess(&config, &registry, start_stage),
        Commands::Calculate { config } => run_calculate(&config, &registry),
    }
}

fn run_postprocess(config_path: &Path, registry: &TaskRegistry, start_stage: u8) -> Result<()> {
    if !(pipeline::FIRST_STAGE..=pipeline::LAST_STAGE).contains(&start_stage) {
        bail!(
            "--start-stage must be between {} and {}, got {}",
            pipeline::FIRST_STAGE,
            pipeline::LAST_STAGE,
            start_stage
        );
    }

    let config = PipelineConfig::from_file(config_path)?;
    let run = pipeline::run_postprocess(&config, registry, start_stage)?;

    if let Some(path) = &run.normalized_file {
        println!("Stage 4 normalized results saved to {}", path.display());
    }
    if let Some(path) = &run.filtered_file {
        println!("Stage 5 filtered results saved to {}", path.display());
    }
    if !run.diagnostics.is_empty() {
        println!("\n⚠️  DIAGNOSTICS:");
        for (kind, count) in run.diagnostics.counts() {
            println!("   • {:?}: {}", kind, count);
        }
    }
    Ok(())
}

fn run_calculate(config_path: &Path, registry: &TaskRegistry) -> Result<()> {
    let config = EvalConfig::from_file(config_path)?;
    let (report, diagnostics) = eval::run_calculation(&config, registry)?;
    diagnostics.log_summary("calculate");

    let (csv_path, json_path) = report.save(&config.output_dir)?;
    eval::print_metrics_report(&report);
    println!("Metrics report saved to {} and {}", csv_path.display(), json_path.display());
    Ok(())
}
