//! Two-proportion z-test for conversion experiments.
//!
//! Rates are reported as proportions in [0, 1]. Lift and the confidence
//! interval are reported in percent of the control rate, so a lift of `12.1`
//! means the treatment converts 12.1% better than control.

use abtest_core::{
    inverse_normal, normal_cdf, validate_probability, DegenerateResult, FrequentistSettings,
    Result, TestData,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::sample_size::two_proportion_sample_size;

/// Cohen's conventional bands for the magnitude of h.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectSizeInterpretation {
    /// |h| < 0.2
    Negligible,
    /// 0.2 <= |h| < 0.5
    Small,
    /// 0.5 <= |h| < 0.8
    Medium,
    /// |h| >= 0.8
    Large,
}

impl EffectSizeInterpretation {
    /// Classifies an effect size by magnitude.
    #[must_use]
    pub fn from_cohens_h(h: f64) -> Self {
        let magnitude = h.abs();
        if magnitude < 0.2 {
            Self::Negligible
        } else if magnitude < 0.5 {
            Self::Small
        } else if magnitude < 0.8 {
            Self::Medium
        } else {
            Self::Large
        }
    }
}

/// Output of the frequentist analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalResults {
    /// Control conversion rate (proportion).
    pub control_rate: f64,
    /// Treatment conversion rate (proportion).
    pub treatment_rate: f64,
    /// Absolute difference `treatment_rate - control_rate`.
    pub absolute_difference: f64,
    /// Relative lift in percent. 0 when the control rate is 0.
    pub lift: f64,
    /// Two-tailed p-value.
    pub p_value: f64,
    /// Pooled z statistic. 0 when the standard error is 0.
    pub z_score: f64,
    /// Pooled standard error of the difference.
    pub standard_error: f64,
    /// Confidence interval for the lift, in percent. Lower <= upper.
    pub confidence_interval: (f64, f64),
    /// Confidence level of the interval, `1 - alpha`.
    pub confidence_level: f64,
    /// `p_value < alpha`.
    pub is_significant: bool,
    /// Cohen's h, `2 asin(sqrt(p2)) - 2 asin(sqrt(p1))`.
    pub effect_size: f64,
    /// Magnitude band of `effect_size`.
    pub effect_interpretation: EffectSizeInterpretation,
    /// Per-arm sample size needed to detect the observed rates at the
    /// analyzer's alpha and power. `None` when the rates are equal.
    pub required_sample_size: Option<u64>,
    /// Significance level used.
    pub alpha: f64,
    /// Degenerate conditions whose fields hold sentinels.
    pub warnings: Vec<DegenerateResult>,
}

impl StatisticalResults {
    /// Returns true if the result carries the given degenerate marker.
    #[must_use]
    pub fn has_warning(&self, warning: DegenerateResult) -> bool {
        self.warnings.contains(&warning)
    }

    /// Returns true if both arms have already reached the required sample size.
    #[must_use]
    pub fn has_sufficient_samples(&self, data: &TestData) -> bool {
        self.required_sample_size
            .is_some_and(|n| data.control_total >= n && data.treatment_total >= n)
    }
}

/// Frequentist analyzer for two-variant conversion tests.
#[derive(Debug, Clone)]
pub struct FrequentistAnalyzer {
    settings: FrequentistSettings,
}

impl Default for FrequentistAnalyzer {
    fn default() -> Self {
        Self::new(FrequentistSettings::default())
    }
}

impl FrequentistAnalyzer {
    /// Creates an analyzer with the given significance level and power.
    #[must_use]
    pub fn new(settings: FrequentistSettings) -> Self {
        Self { settings }
    }

    /// Creates an analyzer at the given alpha with default power.
    #[must_use]
    pub fn with_alpha(alpha: f64) -> Self {
        Self::new(FrequentistSettings {
            alpha,
            ..FrequentistSettings::default()
        })
    }

    /// Returns the analyzer settings.
    #[must_use]
    pub fn settings(&self) -> &FrequentistSettings {
        &self.settings
    }

    /// Runs the two-proportion z-test on observed counts.
    ///
    /// # Errors
    ///
    /// Returns [`abtest_core::EngineError::InvalidSample`] if either arm is empty
    /// or has more conversions than visitors, and
    /// [`abtest_core::EngineError::InvalidParameter`] if alpha or power is
    /// outside (0, 1).
    pub fn analyze(&self, data: &TestData) -> Result<StatisticalResults> {
        let alpha = self.settings.alpha;
        validate_probability("alpha", alpha)?;
        validate_probability("power", self.settings.power)?;
        data.validate()?;

        let mut warnings = Vec::new();

        let n1 = data.control_total as f64;
        let n2 = data.treatment_total as f64;
        let p1 = data.control_rate();
        let p2 = data.treatment_rate();
        let difference = p2 - p1;

        let pooled =
            (data.control_conversions + data.treatment_conversions) as f64 / (n1 + n2);
        let standard_error = (pooled * (1.0 - pooled) * (1.0 / n1 + 1.0 / n2)).sqrt();

        let (z_score, p_value) = if standard_error > 0.0 {
            let z = difference / standard_error;
            let p = 2.0 * (1.0 - normal_cdf(z.abs()));
            (z, p.clamp(0.0, 1.0))
        } else {
            warnings.push(DegenerateResult::ZeroStandardError);
            (0.0, 1.0)
        };

        let z_critical = inverse_normal(1.0 - alpha / 2.0)?;
        let margin = z_critical * (p1 * (1.0 - p1) / n1 + p2 * (1.0 - p2) / n2).sqrt();

        let (lift, confidence_interval) = if p1 > 0.0 {
            (
                difference / p1 * 100.0,
                (
                    (difference - margin) / p1 * 100.0,
                    (difference + margin) / p1 * 100.0,
                ),
            )
        } else {
            warnings.push(DegenerateResult::UndefinedLift);
            (0.0, (0.0, 0.0))
        };

        let effect_size = 2.0 * (p2.sqrt().asin() - p1.sqrt().asin());
        let required_sample_size =
            two_proportion_sample_size(p1, p2, alpha, self.settings.power).ok();

        if !warnings.is_empty() {
            warn!(?warnings, ?data, "frequentist analysis is degenerate");
        }
        debug!(
            control_rate = p1,
            treatment_rate = p2,
            z_score,
            p_value,
            lift,
            "frequentist analysis complete"
        );

        Ok(StatisticalResults {
            control_rate: p1,
            treatment_rate: p2,
            absolute_difference: difference,
            lift,
            p_value,
            z_score,
            standard_error,
            confidence_interval,
            confidence_level: 1.0 - alpha,
            is_significant: p_value < alpha,
            effect_size,
            effect_interpretation: EffectSizeInterpretation::from_cohens_h(effect_size),
            required_sample_size,
            alpha,
            warnings,
        })
    }
}

/// Runs the z-test at significance level `alpha` with default power.
///
/// # Errors
///
/// See [`FrequentistAnalyzer::analyze`].
pub fn analyze_frequentist(data: &TestData, alpha: f64) -> Result<StatisticalResults> {
    FrequentistAnalyzer::with_alpha(alpha).analyze(data)
}
