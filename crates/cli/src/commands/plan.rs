//! Sample size planning command.

use anyhow::Result;
use clap::Args;

use abtest_inference::{ReportFormatter, SampleSizePlanner};

use super::args::{print_json, ExperimentArgs, OutputFormat};

/// Arguments for the plan command.
#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// Computes visitors per arm and the expected duration.
pub fn run_plan(args: PlanArgs) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let design = args.experiment.resolve()?.design;

    tracing::info!(
        baseline_rate = design.baseline_rate,
        mde = design.minimum_detectable_effect,
        alpha = design.alpha,
        power = design.power,
        "Planning sample size"
    );

    let plan = SampleSizePlanner::plan(&design)?;

    match format {
        OutputFormat::Text => print!("{}", ReportFormatter::format_plan(&plan)),
        OutputFormat::Json => print_json(&plan)?,
    }
    Ok(())
}
