//! Two-proportion z-test command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use abtest_core::FrequentistSettings;
use abtest_inference::{
    check_sample_ratio, FrequentistAnalyzer, ReportFormatter, SrmCheck, StatisticalResults,
};

use super::args::{print_json, ExperimentArgs, OutputFormat};

/// Arguments for the frequentist command.
#[derive(Args, Debug, Clone)]
pub struct FrequentistArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(Debug, Serialize)]
struct FrequentistOutput {
    results: StatisticalResults,
    sample_ratio: SrmCheck,
}

/// Runs the z-test and a sample ratio check on the observed counts.
pub fn run_frequentist(args: FrequentistArgs) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let (design, data) = args.experiment.resolve_with_data()?;

    tracing::info!(?data, alpha = design.alpha, "Running frequentist analysis");

    let analyzer = FrequentistAnalyzer::new(FrequentistSettings {
        alpha: design.alpha,
        power: design.power,
    });
    let output = FrequentistOutput {
        results: analyzer.analyze(&data)?,
        sample_ratio: check_sample_ratio(&data, design.traffic_split)?,
    };

    match format {
        OutputFormat::Text => {
            print!("{}", ReportFormatter::format_frequentist(&output.results));
            print!("{}", ReportFormatter::format_sample_ratio(&output.sample_ratio));
        }
        OutputFormat::Json => print_json(&output)?,
    }
    Ok(())
}
