//! End-to-end runs over the experiment file shipped in `config/`.

use std::path::PathBuf;

use abtest_core::{ConfigLoader, EngineConfig};
use abtest_inference::{ExperimentReport, PaybackPeriod, ReportFormatter};

fn shipped(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../config")
        .join(file)
}

#[test]
fn shipped_engine_config_loads() {
    let config = ConfigLoader::load_from(shipped("Config.toml")).expect("config should load");
    assert_eq!(config.bayesian.simulations, 100_000);
    assert!(!config.roi.include_opportunity_cost);
}

#[test]
fn shipped_experiment_produces_full_report() {
    let experiment =
        ConfigLoader::load_experiment(shipped("experiment.toml")).expect("experiment should load");
    let data = experiment.data.expect("experiment has counts");

    let mut engine = EngineConfig::default();
    engine.bayesian.simulations = 10_000;
    engine.bayesian.interval_simulations = 2_000;
    engine.bayesian.seed = Some(42);

    let report = ExperimentReport::build(&experiment.design, Some(&data), &engine)
        .expect("report should build");
    let analysis = report.analysis.as_ref().expect("data was supplied");

    assert_eq!(report.plan.per_arm, 3841);
    assert!(analysis.frequentist.is_significant);
    assert!(analysis.bayesian.probability_b_wins > 0.99);
    assert!(matches!(analysis.roi.payback_period, PaybackPeriod::Days(_)));

    let text = ReportFormatter::format(&report);
    assert!(text.contains("EXPERIMENT REPORT"));
    assert!(text.contains("checkout (ecommerce)"));
}
