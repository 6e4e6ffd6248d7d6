//! Arguments shared by every subcommand.

use std::path::PathBuf;

use abtest_core::{ConfigLoader, EngineConfig, ExperimentFile, TestConfiguration, TestData};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Parses an output format from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!(
                "Unknown format: '{}'. Valid formats: text, json",
                s
            )),
        }
    }
}

/// Prints a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Engine configuration source.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Engine config file (default: config/Config.toml, config/Config.json, ABTEST_* env vars)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Profile overlay, loads config/Config.<profile>.toml on top of the base file
    #[arg(long, conflicts_with = "config")]
    pub profile: Option<String>,
}

impl EngineArgs {
    /// Loads the engine configuration from the selected source.
    pub fn load(&self) -> Result<EngineConfig> {
        match (&self.config, &self.profile) {
            (Some(path), _) => ConfigLoader::load_from(path),
            (None, Some(profile)) => ConfigLoader::load_with_profile(profile),
            (None, None) => ConfigLoader::load(),
        }
    }
}

/// Experiment design overrides. Unset flags fall back to the experiment file,
/// then to built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct DesignArgs {
    /// Baseline conversion rate in percent
    #[arg(long)]
    pub baseline_rate: Option<f64>,

    /// Minimum detectable relative effect in percent
    #[arg(long)]
    pub mde: Option<f64>,

    /// Significance level
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Statistical power
    #[arg(long)]
    pub power: Option<f64>,

    /// Share of traffic sent to the treatment arm, in percent
    #[arg(long)]
    pub traffic_split: Option<f64>,

    /// Test duration in days
    #[arg(long)]
    pub duration: Option<u32>,

    /// Visitors per day across both arms
    #[arg(long)]
    pub daily_traffic: Option<u64>,

    /// Cost per visitor
    #[arg(long)]
    pub cost_per_visitor: Option<Decimal>,

    /// Revenue per conversion
    #[arg(long)]
    pub revenue_per_conversion: Option<Decimal>,
}

impl DesignArgs {
    fn apply(&self, design: &mut TestConfiguration) {
        if let Some(v) = self.baseline_rate {
            design.baseline_rate = v;
        }
        if let Some(v) = self.mde {
            design.minimum_detectable_effect = v;
        }
        if let Some(v) = self.alpha {
            design.alpha = v;
        }
        if let Some(v) = self.power {
            design.power = v;
        }
        if let Some(v) = self.traffic_split {
            design.traffic_split = v;
        }
        if let Some(v) = self.duration {
            design.test_duration = v;
        }
        if let Some(v) = self.daily_traffic {
            design.daily_traffic = v;
        }
        if let Some(v) = self.cost_per_visitor {
            design.cost_per_visitor = v;
        }
        if let Some(v) = self.revenue_per_conversion {
            design.revenue_per_conversion = v;
        }
    }
}

/// Observed counts. Individual flags override counts from the experiment file.
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// Conversions in the control arm
    #[arg(long)]
    pub control_conversions: Option<u64>,

    /// Visitors in the control arm
    #[arg(long)]
    pub control_total: Option<u64>,

    /// Conversions in the treatment arm
    #[arg(long)]
    pub treatment_conversions: Option<u64>,

    /// Visitors in the treatment arm
    #[arg(long)]
    pub treatment_total: Option<u64>,
}

impl DataArgs {
    fn apply(&self, data: Option<TestData>) -> Result<Option<TestData>> {
        match data {
            Some(mut data) => {
                if let Some(v) = self.control_conversions {
                    data.control_conversions = v;
                }
                if let Some(v) = self.control_total {
                    data.control_total = v;
                }
                if let Some(v) = self.treatment_conversions {
                    data.treatment_conversions = v;
                }
                if let Some(v) = self.treatment_total {
                    data.treatment_total = v;
                }
                Ok(Some(data))
            }
            None => match (
                self.control_conversions,
                self.control_total,
                self.treatment_conversions,
                self.treatment_total,
            ) {
                (None, None, None, None) => Ok(None),
                (Some(cc), Some(ct), Some(tc), Some(tt)) => Ok(Some(TestData::new(cc, ct, tc, tt))),
                _ => Err(anyhow!(
                    "all four counts are required without an experiment file: \
                     --control-conversions, --control-total, --treatment-conversions, --treatment-total"
                )),
            },
        }
    }
}

/// Experiment inputs: an optional file plus flag overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct ExperimentArgs {
    /// Experiment file (TOML or JSON) with a [design] table and optional [data] table
    #[arg(short, long)]
    pub experiment: Option<PathBuf>,

    #[command(flatten)]
    pub design: DesignArgs,

    #[command(flatten)]
    pub data: DataArgs,
}

impl ExperimentArgs {
    /// Merges the experiment file with flag overrides.
    pub fn resolve(&self) -> Result<ExperimentFile> {
        let mut experiment = match &self.experiment {
            Some(path) => ConfigLoader::load_experiment(path)?,
            None => ExperimentFile {
                design: TestConfiguration::default(),
                data: None,
            },
        };
        self.design.apply(&mut experiment.design);
        experiment.data = self.data.apply(experiment.data)?;
        Ok(experiment)
    }

    /// Like [`ExperimentArgs::resolve`], but fails when no counts were given.
    pub fn resolve_with_data(&self) -> Result<(TestConfiguration, TestData)> {
        let experiment = self.resolve()?;
        let data = experiment
            .data
            .context("observed counts required: pass --experiment with a [data] table or the four count flags")?;
        Ok((experiment.design, data))
    }
}
