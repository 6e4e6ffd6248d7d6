//! Beta-Binomial Monte Carlo command.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Args;

use abtest_core::TestData;
use abtest_inference::{BayesianAnalyzer, BayesianResults, BetaParameters, ReportFormatter};

use super::args::{print_json, EngineArgs, ExperimentArgs, OutputFormat};

/// Arguments for the bayesian command.
#[derive(Args, Debug, Clone)]
pub struct BayesianArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Number of posterior draws (overrides config)
    #[arg(long)]
    pub simulations: Option<usize>,

    /// Seed for reproducible draws (overrides config)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Prior alpha shared by both arms (overrides config)
    #[arg(long, requires = "prior_beta")]
    pub prior_alpha: Option<f64>,

    /// Prior beta shared by both arms (overrides config)
    #[arg(long, requires = "prior_alpha")]
    pub prior_beta: Option<f64>,

    /// Abort the simulation after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// Runs the posterior simulation on a blocking worker.
pub async fn run_bayesian(args: BayesianArgs) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let (_, data) = args.experiment.resolve_with_data()?;
    let config = args.engine.load()?;

    let mut analyzer = BayesianAnalyzer::new(config.bayesian);
    if let Some(simulations) = args.simulations {
        analyzer = analyzer.with_simulations(simulations);
    }
    if let Some(seed) = args.seed {
        analyzer = analyzer.with_seed(seed);
    }
    if let (Some(alpha), Some(beta)) = (args.prior_alpha, args.prior_beta) {
        analyzer = analyzer.with_prior(BetaParameters::new(alpha, beta)?);
    }

    tracing::info!(
        ?data,
        simulations = analyzer.settings().simulations,
        seed = ?analyzer.settings().seed,
        "Running Bayesian analysis"
    );

    let results = simulate(analyzer, data, args.timeout_secs).await?;

    match format {
        OutputFormat::Text => print!("{}", ReportFormatter::format_bayesian(&results)),
        OutputFormat::Json => print_json(&results)?,
    }
    Ok(())
}

/// Runs the simulation on a blocking worker. On timeout the worker is told to
/// stop and is awaited, so no draws continue after this returns.
async fn simulate(
    analyzer: BayesianAnalyzer,
    data: TestData,
    timeout_secs: Option<u64>,
) -> Result<BayesianResults> {
    let cancel = Arc::new(AtomicBool::new(false));
    let worker_flag = Arc::clone(&cancel);
    let mut task =
        tokio::task::spawn_blocking(move || analyzer.analyze_cancellable(&data, &worker_flag));

    let results = match timeout_secs {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), &mut task).await {
            Ok(joined) => joined?,
            Err(_) => {
                cancel.store(true, Ordering::Relaxed);
                let _ = task.await?;
                return Err(anyhow!("Bayesian simulation timed out after {}s", secs));
            }
        },
        None => task.await?,
    }?;
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use abtest_core::BayesianSettings;
    use std::time::Instant;

    #[tokio::test]
    async fn timeout_stops_the_simulation() {
        let analyzer = BayesianAnalyzer::new(BayesianSettings {
            simulations: 500_000_000,
            seed: Some(1),
            ..Default::default()
        });
        let started = Instant::now();
        let err = simulate(analyzer, TestData::new(50, 1000, 65, 1000), Some(1))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("timed out"), "error was {err}");
        assert!(
            started.elapsed() < Duration::from_secs(10),
            "took {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn completes_within_timeout() {
        let analyzer = BayesianAnalyzer::new(BayesianSettings {
            simulations: 10_000,
            interval_simulations: 1_000,
            seed: Some(3),
            ..Default::default()
        });
        let results = simulate(analyzer, TestData::new(50, 1000, 65, 1000), Some(60))
            .await
            .unwrap();
        assert_eq!(results.simulations, 10_000);
    }
}
