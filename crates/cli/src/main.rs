use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{BayesianArgs, FrequentistArgs, PlanArgs, ReportArgs, RoiArgs};

#[derive(Parser)]
#[command(name = "abtest")]
#[command(about = "Statistical inference and decision engine for A/B tests", long_about = None)]
struct Cli {
    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the sample size needed per arm
    Plan(PlanArgs),
    /// Run a two-proportion z-test on observed counts
    Frequentist(FrequentistArgs),
    /// Compare Beta-Binomial posteriors by Monte Carlo simulation
    Bayesian(BayesianArgs),
    /// Evaluate the financial return of a finished test
    Roi(RoiArgs),
    /// Run every analysis and print a combined report
    Report(ReportArgs),
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries command output, so logs never go there
    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .init();
        }
    }

    match cli.command {
        Commands::Plan(args) => commands::run_plan(args)?,
        Commands::Frequentist(args) => commands::run_frequentist(args)?,
        Commands::Bayesian(args) => commands::run_bayesian(args).await?,
        Commands::Roi(args) => commands::run_roi(args)?,
        Commands::Report(args) => commands::run_report(args).await?,
    }

    Ok(())
}
