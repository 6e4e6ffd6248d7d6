//! Statistical inference for A/B tests.
//!
//! Four independent components share the types in `abtest-core`:
//!
//! - [`sample_size`]: visitors needed per arm to detect an effect
//! - [`frequentist`]: two-proportion z-test with a confidence interval on lift
//! - [`bayesian`]: Beta-Binomial posterior comparison by Monte Carlo
//! - [`roi`]: financial outcome of a finished test
//!
//! [`srm`] checks the observed traffic split and [`report`] bundles every
//! output for display.

pub mod bayesian;
pub mod frequentist;
pub mod report;
pub mod roi;
pub mod sample_size;
pub mod srm;

pub use bayesian::{
    analyze_bayesian, BayesianAnalyzer, BayesianResults, BetaParameters, CANCEL_CHECK_INTERVAL,
    MIN_RECOMMENDED_SIMULATIONS,
};
pub use frequentist::{
    analyze_frequentist, EffectSizeInterpretation, FrequentistAnalyzer, StatisticalResults,
};
pub use report::{ExperimentReport, ObservedAnalysis, ReportFormatter};
pub use roi::{evaluate_roi, PaybackPeriod, RoiAnalysis, RoiEvaluator};
pub use sample_size::{plan_sample_size, two_proportion_sample_size, SamplePlan, SampleSizePlanner};
pub use srm::{check_sample_ratio, SrmCheck, SrmSeverity};
