//! Sample ratio mismatch detection.
//!
//! A mismatch between the configured traffic split and the observed arm sizes
//! usually points at a broken assignment or logging pipeline, and invalidates
//! the comparison. The check is a chi-squared goodness-of-fit test with one
//! degree of freedom, whose p-value equals `2 * (1 - Phi(sqrt(chi2)))`.

use abtest_core::{normal_cdf, EngineError, Result, TestData};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// p-value below which a mismatch is reported.
pub const SRM_P_THRESHOLD: f64 = 0.01;

/// Observed deviation beyond which a detected mismatch is critical.
pub const SRM_CRITICAL_DEVIATION: f64 = 0.01;

/// How serious a detected mismatch is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SrmSeverity {
    /// No mismatch detected.
    None,
    /// Statistically detectable but under one percentage point of deviation.
    Warning,
    /// Statistically detectable and at least one percentage point off.
    Critical,
}

/// Result of a sample ratio mismatch check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrmCheck {
    /// Configured treatment share (proportion).
    pub expected_ratio: f64,
    /// Observed treatment share (proportion).
    pub observed_ratio: f64,
    /// Chi-squared statistic.
    pub chi_squared: f64,
    /// p-value of the statistic.
    pub p_value: f64,
    /// `p_value < SRM_P_THRESHOLD`.
    pub mismatch_detected: bool,
    pub severity: SrmSeverity,
}

/// Checks observed arm totals against the configured treatment share.
///
/// `traffic_split` is the treatment share in percent.
///
/// # Errors
///
/// Returns [`EngineError::InvalidParameter`] if the split is not in (0, 100)
/// and [`EngineError::InvalidSample`] for invalid counts.
pub fn check_sample_ratio(data: &TestData, traffic_split: f64) -> Result<SrmCheck> {
    if !(traffic_split > 0.0 && traffic_split < 100.0) {
        return Err(EngineError::invalid_parameter(format!(
            "traffic split must be in (0, 100), got {traffic_split}"
        )));
    }
    data.validate()?;

    let expected_ratio = traffic_split / 100.0;
    let total = data.total_visitors() as f64;
    let observed_ratio = data.treatment_total as f64 / total;

    let expected_treatment = total * expected_ratio;
    let expected_control = total - expected_treatment;
    let chi_squared = (data.control_total as f64 - expected_control).powi(2) / expected_control
        + (data.treatment_total as f64 - expected_treatment).powi(2) / expected_treatment;

    let p_value = (2.0 * (1.0 - normal_cdf(chi_squared.sqrt()))).clamp(0.0, 1.0);
    let mismatch_detected = p_value < SRM_P_THRESHOLD;

    let severity = if !mismatch_detected {
        SrmSeverity::None
    } else if (observed_ratio - expected_ratio).abs() < SRM_CRITICAL_DEVIATION {
        SrmSeverity::Warning
    } else {
        SrmSeverity::Critical
    };

    if mismatch_detected {
        warn!(
            expected_ratio,
            observed_ratio, p_value, "sample ratio mismatch detected"
        );
    }

    Ok(SrmCheck {
        expected_ratio,
        observed_ratio,
        chi_squared,
        p_value,
        mismatch_detected,
        severity,
    })
}
