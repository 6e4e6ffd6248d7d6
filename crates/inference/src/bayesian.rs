//! Beta-Binomial posterior comparison via Monte Carlo simulation.
//!
//! Each arm's conversion rate gets a `Beta(prior_alpha + conversions,
//! prior_beta + total - conversions)` posterior. Paired draws from the two
//! posteriors estimate:
//!
//! - `P(treatment > control)`, with standard error `sqrt(p(1-p)/N)`
//! - the expected relative lift in percent
//! - the expected loss of shipping either arm
//! - a 95% credible interval for the lift, from a separate batch of draws
//!
//! The estimates are unbiased; their variance shrinks as `1/N`. Draws are
//! independent, so a host may split `N` across workers and sum the counts.
//!
//! # Example
//!
//! ```
//! use abtest_core::{BayesianSettings, TestData};
//! use abtest_inference::bayesian::BayesianAnalyzer;
//!
//! let settings = BayesianSettings {
//!     simulations: 20_000,
//!     interval_simulations: 5_000,
//!     seed: Some(42),
//!     ..Default::default()
//! };
//! let results = BayesianAnalyzer::new(settings)
//!     .analyze(&TestData::new(1247, 12500, 1398, 12500))
//!     .unwrap();
//! assert!(results.probability_b_wins > 0.99);
//! ```

use abtest_core::random::source_from_seed;
use std::sync::atomic::{AtomicBool, Ordering};

use abtest_core::{
    beta_random, BayesianSettings, DegenerateResult, EngineError, Result, TestData, UniformSource,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Below this many draws the estimates are noticeably noisy.
pub const MIN_RECOMMENDED_SIMULATIONS: usize = 10_000;

/// Draws between polls of a cancellation flag.
pub const CANCEL_CHECK_INTERVAL: usize = 4096;

const INTERVAL_LOWER: f64 = 0.025;
const INTERVAL_UPPER: f64 = 0.975;

/// Shape parameters of a Beta distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaParameters {
    pub alpha: f64,
    pub beta: f64,
}

impl BetaParameters {
    /// Creates shape parameters.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParameter`] unless both shapes are
    /// positive and finite.
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        let valid = |x: f64| x > 0.0 && x.is_finite();
        if !(valid(alpha) && valid(beta)) {
            return Err(EngineError::invalid_parameter(format!(
                "beta shapes must be positive and finite, got ({alpha}, {beta})"
            )));
        }
        Ok(Self { alpha, beta })
    }

    /// The uniform prior, Beta(1, 1).
    #[must_use]
    pub fn uniform() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
        }
    }

    /// Posterior after observing `conversions` out of `total`.
    #[must_use]
    pub fn posterior(&self, conversions: u64, total: u64) -> Self {
        Self {
            alpha: self.alpha + conversions as f64,
            beta: self.beta + total.saturating_sub(conversions) as f64,
        }
    }

    /// Mean of the distribution.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }
}

impl Default for BetaParameters {
    fn default() -> Self {
        Self::uniform()
    }
}

/// Output of the Bayesian analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayesianResults {
    /// Estimated probability that treatment converts better than control.
    pub probability_b_wins: f64,
    /// Estimated probability that control converts better than treatment.
    pub probability_a_wins: f64,
    /// Monte Carlo standard error of `probability_b_wins`.
    pub probability_std_error: f64,
    /// Mean relative lift in percent.
    pub expected_lift: f64,
    /// 95% credible interval for the lift, in percent. Lower <= upper.
    pub credible_interval: (f64, f64),
    /// Expected lift forgone (percent) if treatment ships and control is better.
    pub expected_loss_treatment: f64,
    /// Expected lift forgone (percent) if control is kept and treatment is better.
    pub expected_loss_control: f64,
    /// Control posterior.
    pub posterior_a: BetaParameters,
    /// Treatment posterior.
    pub posterior_b: BetaParameters,
    /// Draws used for the probability, lift, and loss estimates.
    pub simulations: usize,
    /// Draws used for the credible interval.
    pub interval_simulations: usize,
    /// Degenerate conditions met during the simulation.
    #[serde(default)]
    pub warnings: Vec<DegenerateResult>,
}

/// Monte Carlo Bayesian analyzer.
#[derive(Debug, Clone)]
pub struct BayesianAnalyzer {
    settings: BayesianSettings,
}

impl Default for BayesianAnalyzer {
    fn default() -> Self {
        Self::new(BayesianSettings::default())
    }
}

impl BayesianAnalyzer {
    /// Creates an analyzer with the given simulation settings.
    #[must_use]
    pub fn new(settings: BayesianSettings) -> Self {
        Self { settings }
    }

    /// Returns the analyzer settings.
    #[must_use]
    pub fn settings(&self) -> &BayesianSettings {
        &self.settings
    }

    /// Sets a seed for reproducible simulations.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.settings.seed = Some(seed);
        self
    }

    /// Sets the number of draws for the probability estimate.
    #[must_use]
    pub fn with_simulations(mut self, simulations: usize) -> Self {
        self.settings.simulations = simulations;
        self
    }

    /// Sets the prior shared by both arms.
    #[must_use]
    pub fn with_prior(mut self, prior: BetaParameters) -> Self {
        self.settings.prior_alpha = prior.alpha;
        self.settings.prior_beta = prior.beta;
        self
    }

    /// Runs the simulation with a ChaCha source seeded from the settings,
    /// or from OS entropy when no seed is configured.
    ///
    /// # Errors
    ///
    /// See [`BayesianAnalyzer::analyze_with_source`].
    pub fn analyze(&self, data: &TestData) -> Result<BayesianResults> {
        let mut source = source_from_seed(self.settings.seed);
        self.run(data, &mut source, None)
    }

    /// Like [`BayesianAnalyzer::analyze`], but stops early once `cancel` is set.
    ///
    /// The flag is polled every [`CANCEL_CHECK_INTERVAL`] draws, so a caller
    /// running the simulation on another thread can bound its wall time.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Cancelled`] if the flag was set before the
    /// simulation finished; otherwise see
    /// [`BayesianAnalyzer::analyze_with_source`].
    pub fn analyze_cancellable(
        &self,
        data: &TestData,
        cancel: &AtomicBool,
    ) -> Result<BayesianResults> {
        let mut source = source_from_seed(self.settings.seed);
        self.run(data, &mut source, Some(cancel))
    }

    /// Runs the simulation drawing from an injected uniform source.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidSample`] if either arm is empty or has more
    /// conversions than visitors, and [`EngineError::InvalidParameter`] if a
    /// simulation count is zero or a prior shape is not positive.
    pub fn analyze_with_source<S: UniformSource + ?Sized>(
        &self,
        data: &TestData,
        source: &mut S,
    ) -> Result<BayesianResults> {
        self.run(data, source, None)
    }

    fn run<S: UniformSource + ?Sized>(
        &self,
        data: &TestData,
        source: &mut S,
        cancel: Option<&AtomicBool>,
    ) -> Result<BayesianResults> {
        data.validate()?;
        let prior = BetaParameters::new(self.settings.prior_alpha, self.settings.prior_beta)?;
        let simulations = self.settings.simulations;
        let interval_simulations = self.settings.interval_simulations;
        if simulations == 0 || interval_simulations == 0 {
            return Err(EngineError::invalid_parameter(
                "simulation counts must be positive",
            ));
        }
        if simulations < MIN_RECOMMENDED_SIMULATIONS {
            warn!(
                simulations,
                recommended = MIN_RECOMMENDED_SIMULATIONS,
                "low simulation count; estimates will be noisy"
            );
        }

        let cancelled = |completed: usize| {
            completed % CANCEL_CHECK_INTERVAL == 0
                && cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
        };

        let posterior_a = prior.posterior(data.control_conversions, data.control_total);
        let posterior_b = prior.posterior(data.treatment_conversions, data.treatment_total);

        let mut b_wins = 0usize;
        let mut a_wins = 0usize;
        let mut lift_draws = 0usize;
        let mut lift_sum = 0.0;
        let mut loss_treatment = 0.0;
        let mut loss_control = 0.0;
        let mut excluded = 0usize;

        for i in 0..simulations {
            if cancelled(i) {
                return Err(EngineError::Cancelled { completed: i });
            }
            let (a, b) = draw_pair(source, &posterior_a, &posterior_b);
            if b > a {
                b_wins += 1;
            } else if a > b {
                a_wins += 1;
            }
            let Some(lift) = relative_lift(a, b) else {
                excluded += 1;
                continue;
            };
            lift_draws += 1;
            lift_sum += lift;
            if lift < 0.0 {
                loss_treatment -= lift;
            } else {
                loss_control += lift;
            }
        }

        let mut lifts: Vec<f64> = Vec::with_capacity(interval_simulations);
        for i in 0..interval_simulations {
            if cancelled(i) {
                return Err(EngineError::Cancelled {
                    completed: simulations + i,
                });
            }
            let (a, b) = draw_pair(source, &posterior_a, &posterior_b);
            match relative_lift(a, b) {
                Some(lift) => lifts.push(lift),
                None => excluded += 1,
            }
        }
        lifts.sort_by(f64::total_cmp);
        let credible_interval = (
            percentile_index(&lifts, INTERVAL_LOWER),
            percentile_index(&lifts, INTERVAL_UPPER),
        );

        let mut warnings = Vec::new();
        let mut finite_mean = |sum: f64| {
            let mean = if lift_draws > 0 { sum / lift_draws as f64 } else { 0.0 };
            if mean.is_finite() {
                mean
            } else {
                excluded += 1;
                0.0
            }
        };
        let expected_lift = finite_mean(lift_sum);
        let expected_loss_treatment = finite_mean(loss_treatment);
        let expected_loss_control = finite_mean(loss_control);
        if excluded > 0 {
            warnings.push(DegenerateResult::NonFiniteLiftDraws);
            warn!(
                excluded,
                simulations, "lift draws with a near-zero control rate were excluded"
            );
        }

        let n = simulations as f64;
        let probability_b_wins = b_wins as f64 / n;
        let probability_std_error = (probability_b_wins * (1.0 - probability_b_wins) / n).sqrt();

        let results = BayesianResults {
            probability_b_wins,
            probability_a_wins: a_wins as f64 / n,
            probability_std_error,
            expected_lift,
            credible_interval,
            expected_loss_treatment,
            expected_loss_control,
            posterior_a,
            posterior_b,
            simulations,
            interval_simulations,
            warnings,
        };

        debug!(
            probability_b_wins,
            probability_std_error,
            expected_lift = results.expected_lift,
            simulations,
            "bayesian analysis complete"
        );

        Ok(results)
    }
}

/// Runs the Bayesian analysis with an optional prior and simulation count,
/// using default settings otherwise.
///
/// # Errors
///
/// See [`BayesianAnalyzer::analyze_with_source`].
pub fn analyze_bayesian(
    data: &TestData,
    prior: Option<BetaParameters>,
    simulations: Option<usize>,
) -> Result<BayesianResults> {
    let mut analyzer = BayesianAnalyzer::default().with_prior(prior.unwrap_or_default());
    if let Some(simulations) = simulations {
        analyzer = analyzer.with_simulations(simulations);
    }
    analyzer.analyze(data)
}

fn draw_pair<S: UniformSource + ?Sized>(
    source: &mut S,
    posterior_a: &BetaParameters,
    posterior_b: &BetaParameters,
) -> (f64, f64) {
    let a = beta_random(source, posterior_a.alpha, posterior_a.beta);
    let b = beta_random(source, posterior_b.alpha, posterior_b.beta);
    (a, b)
}

/// Lift of `b` over `a` in percent; `None` unless it is finite.
fn relative_lift(a: f64, b: f64) -> Option<f64> {
    if a <= 0.0 {
        return None;
    }
    let lift = (b - a) / a * 100.0;
    lift.is_finite().then_some(lift)
}

/// Value at index `floor(p * n)` of a sorted slice.
fn percentile_index(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (p * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use abtest_core::seeded_source;

    fn analyzer(seed: u64) -> BayesianAnalyzer {
        BayesianAnalyzer::new(BayesianSettings {
            simulations: 20_000,
            interval_simulations: 5_000,
            seed: Some(seed),
            ..Default::default()
        })
    }

    // ============================================================
    // BetaParameters Tests
    // ============================================================

    #[test]
    fn uniform_prior_is_beta_one_one() {
        let prior = BetaParameters::default();
        assert_eq!(prior, BetaParameters { alpha: 1.0, beta: 1.0 });
        assert!((prior.mean() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn posterior_adds_successes_and_failures() {
        let posterior = BetaParameters::uniform().posterior(50, 1000);
        assert_eq!(posterior, BetaParameters { alpha: 51.0, beta: 951.0 });
    }

    #[test]
    fn invalid_shapes_rejected() {
        assert!(BetaParameters::new(0.0, 1.0).is_err());
        assert!(BetaParameters::new(1.0, -2.0).is_err());
        assert!(BetaParameters::new(f64::INFINITY, 1.0).is_err());
        assert!(BetaParameters::new(0.5, 0.5).is_ok());
    }

    // ============================================================
    // percentile_index Tests
    // ============================================================

    #[test]
    fn percentile_index_uses_floor() {
        let sorted: Vec<f64> = (0..1000).map(f64::from).collect();
        assert_eq!(percentile_index(&sorted, 0.025), 25.0);
        assert_eq!(percentile_index(&sorted, 0.975), 975.0);
        assert_eq!(percentile_index(&sorted, 1.0), 999.0);
        assert_eq!(percentile_index(&[], 0.5), 0.0);
    }

    // ============================================================
    // Simulation Tests
    // ============================================================

    #[test]
    fn clear_winner_has_high_probability() {
        let results = analyzer(42)
            .analyze(&TestData::new(1247, 12500, 1398, 12500))
            .unwrap();

        assert!(results.probability_b_wins > 0.99, "P was {}", results.probability_b_wins);
        assert!(
            results.expected_lift > 11.0 && results.expected_lift < 13.5,
            "lift was {}",
            results.expected_lift
        );
        let (lower, upper) = results.credible_interval;
        assert!(lower > 0.0 && lower < results.expected_lift, "lower was {lower}");
        assert!(upper > results.expected_lift && upper < 30.0, "upper was {upper}");
        assert!(results.expected_loss_treatment < results.expected_loss_control);
    }

    #[test]
    fn identical_arms_are_a_coin_flip() {
        let results = analyzer(7)
            .analyze(&TestData::new(100, 1000, 100, 1000))
            .unwrap();

        assert!(
            (results.probability_b_wins - 0.5).abs() < 0.03,
            "P was {}",
            results.probability_b_wins
        );
        let (lower, upper) = results.credible_interval;
        assert!(lower < 0.0 && upper > 0.0);
    }

    #[test]
    fn probabilities_are_complementary() {
        let results = analyzer(3)
            .analyze(&TestData::new(50, 1000, 65, 1000))
            .unwrap();
        let sum = results.probability_a_wins + results.probability_b_wins;
        assert!((sum - 1.0).abs() < 1e-3, "sum was {sum}");
    }

    #[test]
    fn standard_error_matches_binomial_formula() {
        let results = analyzer(5)
            .analyze(&TestData::new(50, 1000, 65, 1000))
            .unwrap();
        let p = results.probability_b_wins;
        let expected = (p * (1.0 - p) / 20_000.0).sqrt();
        assert!((results.probability_std_error - expected).abs() < 1e-15);
        assert!(results.probability_std_error < 0.01);
    }

    #[test]
    fn posteriors_reported_for_both_arms() {
        let results = analyzer(1)
            .analyze(&TestData::new(50, 1000, 65, 1000))
            .unwrap();
        assert_eq!(results.posterior_a, BetaParameters { alpha: 51.0, beta: 951.0 });
        assert_eq!(results.posterior_b, BetaParameters { alpha: 66.0, beta: 936.0 });
        assert_eq!(results.simulations, 20_000);
        assert_eq!(results.interval_simulations, 5_000);
    }

    #[test]
    fn custom_prior_shifts_posterior() {
        let results = analyzer(1)
            .with_prior(BetaParameters { alpha: 0.5, beta: 0.5 })
            .analyze(&TestData::new(50, 1000, 65, 1000))
            .unwrap();
        assert_eq!(results.posterior_a, BetaParameters { alpha: 50.5, beta: 950.5 });
    }

    #[test]
    fn same_seed_reproduces_results() {
        let data = TestData::new(50, 1000, 65, 1000);
        let first = analyzer(99).analyze(&data).unwrap();
        let second = analyzer(99).analyze(&data).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn injected_source_matches_configured_seed() {
        let data = TestData::new(50, 1000, 65, 1000);
        let configured = analyzer(17).analyze(&data).unwrap();
        let mut source = seeded_source(17);
        let injected = analyzer(0).analyze_with_source(&data, &mut source).unwrap();
        assert_eq!(configured, injected);
    }

    #[test]
    fn zero_conversion_arms_are_well_defined() {
        let results = analyzer(8)
            .analyze(&TestData::new(0, 500, 0, 500))
            .unwrap();
        assert!(results.expected_lift.is_finite());
        assert!(results.credible_interval.0.is_finite());
        assert!(results.credible_interval.1.is_finite());
    }

    #[test]
    fn tiny_prior_keeps_lift_estimates_finite() {
        // Beta(0.01, 1001) control draws underflow toward zero.
        let data = TestData::new(0, 1000, 5, 1000);
        for seed in 0..5 {
            let results = BayesianAnalyzer::new(BayesianSettings {
                simulations: 20_000,
                interval_simulations: 5_000,
                prior_alpha: 0.01,
                prior_beta: 1.0,
                seed: Some(seed),
            })
            .analyze(&data)
            .unwrap();

            assert!(results.expected_lift.is_finite(), "lift was {}", results.expected_lift);
            assert!(results.expected_loss_treatment.is_finite());
            assert!(results.expected_loss_control.is_finite());
            let (lower, upper) = results.credible_interval;
            assert!(lower.is_finite() && upper.is_finite(), "interval was ({lower}, {upper})");
            assert!(lower <= upper);
            assert!(results.probability_b_wins.is_finite());
        }
    }

    #[test]
    fn non_finite_lift_draws_are_excluded() {
        assert_eq!(relative_lift(0.0, 0.5), None);
        assert_eq!(relative_lift(f64::MIN_POSITIVE / 1e10, 0.5), None);
        assert_eq!(relative_lift(0.1, 0.12).map(|l| (l * 1e6).round() / 1e6), Some(20.0));
    }

    #[test]
    fn regular_data_has_no_warnings() {
        let results = analyzer(4)
            .analyze(&TestData::new(50, 1000, 65, 1000))
            .unwrap();
        assert!(results.warnings.is_empty());
    }

    // ============================================================
    // Cancellation
    // ============================================================

    #[test]
    fn preset_cancel_flag_stops_before_drawing() {
        let cancel = AtomicBool::new(true);
        let err = analyzer(1)
            .analyze_cancellable(&TestData::new(50, 1000, 65, 1000), &cancel)
            .unwrap_err();
        assert_eq!(err, EngineError::Cancelled { completed: 0 });
    }

    #[test]
    fn unset_cancel_flag_matches_plain_run() {
        let data = TestData::new(50, 1000, 65, 1000);
        let cancel = AtomicBool::new(false);
        let cancellable = analyzer(21).analyze_cancellable(&data, &cancel).unwrap();
        assert_eq!(cancellable, analyzer(21).analyze(&data).unwrap());
    }

    #[test]
    fn cancel_from_another_thread_bounds_wall_time() {
        use std::sync::Arc;
        use std::time::{Duration, Instant};

        let cancel = Arc::new(AtomicBool::new(false));
        let worker_flag = Arc::clone(&cancel);
        let started = Instant::now();
        let worker = std::thread::spawn(move || {
            BayesianAnalyzer::new(BayesianSettings {
                simulations: 500_000_000,
                seed: Some(1),
                ..Default::default()
            })
            .analyze_cancellable(&TestData::new(50, 1000, 65, 1000), &worker_flag)
        });

        std::thread::sleep(Duration::from_millis(50));
        cancel.store(true, Ordering::Relaxed);
        let result = worker.join().unwrap();

        assert!(matches!(result, Err(EngineError::Cancelled { .. })));
        assert!(started.elapsed() < Duration::from_secs(10), "took {:?}", started.elapsed());
    }

    // ============================================================
    // Error Cases
    // ============================================================

    #[test]
    fn empty_arm_fails() {
        let err = analyzer(1).analyze(&TestData::new(0, 0, 1, 10)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSample(_)));
        let err = analyzer(1).analyze(&TestData::new(1, 10, 0, 0)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSample(_)));
    }

    #[test]
    fn zero_simulations_fails() {
        let err = analyzer(1)
            .with_simulations(0)
            .analyze(&TestData::new(1, 10, 2, 10))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter(_)));
    }

    #[test]
    fn invalid_prior_fails() {
        let err = analyzer(1)
            .with_prior(BetaParameters { alpha: 0.0, beta: 1.0 })
            .analyze(&TestData::new(1, 10, 2, 10))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter(_)));
    }

    #[test]
    fn free_function_accepts_prior_and_simulations() {
        let results = analyze_bayesian(
            &TestData::new(1247, 12500, 1398, 12500),
            Some(BetaParameters::uniform()),
            Some(10_000),
        )
        .unwrap();
        assert_eq!(results.simulations, 10_000);
        assert!(results.probability_b_wins > 0.98);
    }
}
