//! Full experiment report command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use abtest_inference::{ExperimentReport, ReportFormatter};

use super::args::{EngineArgs, ExperimentArgs, OutputFormat};

/// Arguments for the report command.
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Seed for reproducible draws (overrides config)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Runs every component and renders one report.
pub async fn run_report(args: ReportArgs) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let experiment = args.experiment.resolve()?;
    let mut config = args.engine.load()?;
    if let Some(seed) = args.seed {
        config.bayesian.seed = Some(seed);
    }

    tracing::info!(
        has_data = experiment.data.is_some(),
        simulations = config.bayesian.simulations,
        "Building experiment report"
    );

    let report = tokio::task::spawn_blocking(move || {
        ExperimentReport::build(&experiment.design, experiment.data.as_ref(), &config)
    })
    .await??;

    let rendered = match format {
        OutputFormat::Text => ReportFormatter::format(&report),
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
    };

    match args.output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            tracing::info!(path = %path.display(), "Report written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
