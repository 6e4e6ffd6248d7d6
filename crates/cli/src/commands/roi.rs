//! Return on investment command.

use anyhow::Result;
use clap::Args;
use rust_decimal::Decimal;

use abtest_core::FrequentistSettings;
use abtest_inference::{FrequentistAnalyzer, ReportFormatter, RoiEvaluator};

use super::args::{print_json, EngineArgs, ExperimentArgs, OutputFormat};

/// Arguments for the roi command.
#[derive(Args, Debug, Clone)]
pub struct RoiArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Include the opportunity cost of exposed traffic
    #[arg(long)]
    pub opportunity_cost: bool,

    /// Opportunity cost rate applied to exposed traffic (overrides config)
    #[arg(long)]
    pub opportunity_cost_rate: Option<Decimal>,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// Evaluates the financial outcome of the observed lift.
pub fn run_roi(args: RoiArgs) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let (design, data) = args.experiment.resolve_with_data()?;
    let mut settings = args.engine.load()?.roi;
    if args.opportunity_cost {
        settings.include_opportunity_cost = true;
    }
    if let Some(rate) = args.opportunity_cost_rate {
        settings.opportunity_cost_rate = rate;
    }

    tracing::info!(
        ?data,
        cost_per_visitor = %design.cost_per_visitor,
        revenue_per_conversion = %design.revenue_per_conversion,
        "Evaluating ROI"
    );

    let stats = FrequentistAnalyzer::new(FrequentistSettings {
        alpha: design.alpha,
        power: design.power,
    })
    .analyze(&data)?;
    let roi = RoiEvaluator::new(settings).evaluate(&data, &design, &stats)?;

    match format {
        OutputFormat::Text => print!("{}", ReportFormatter::format_roi(&roi)),
        OutputFormat::Json => print_json(&roi)?,
    }
    Ok(())
}
