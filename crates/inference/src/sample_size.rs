//! Sample size planning for two-proportion tests.
//!
//! Computes the per-arm sample size needed to detect a relative lift over a
//! baseline conversion rate with a two-sided z-test:
//!
//! ```text
//! n = (z_a * sqrt(2 p(1-p)) + z_b * sqrt(p1(1-p1) + p2(1-p2)))^2 / (p2 - p1)^2
//! ```
//!
//! where `z_a = z(1 - alpha/2)`, `z_b = z(power)` and `p = (p1 + p2) / 2`.

use abtest_core::{
    inverse_normal, validate_probability, EngineError, Result, TestConfiguration,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Output of the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePlan {
    /// Required visitors per arm.
    pub per_arm: u64,
    /// Required visitors across both arms.
    pub total: u64,
    /// Baseline conversion rate as a proportion.
    pub baseline_proportion: f64,
    /// Target treatment conversion rate as a proportion.
    pub target_proportion: f64,
    /// Days until the smaller arm reaches `per_arm`, `None` without traffic.
    pub estimated_days: Option<u64>,
}

/// Sample size planner.
pub struct SampleSizePlanner;

impl SampleSizePlanner {
    /// Plans the sample size for a test configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParameter`] if the configuration is out of
    /// domain or the target rate reaches 100%.
    pub fn plan(config: &TestConfiguration) -> Result<SamplePlan> {
        config.validate_design()?;

        let p1 = config.baseline_rate / 100.0;
        let p2 = p1 * (1.0 + config.minimum_detectable_effect / 100.0);
        if p2 >= 1.0 {
            return Err(EngineError::invalid_parameter(format!(
                "target rate {:.4}% must be below 100%",
                p2 * 100.0
            )));
        }

        let per_arm = two_proportion_sample_size(p1, p2, config.alpha, config.power)?;
        let estimated_days = estimate_days(per_arm, config.daily_traffic, config.traffic_split);

        debug!(
            baseline = p1,
            target = p2,
            alpha = config.alpha,
            power = config.power,
            per_arm,
            ?estimated_days,
            "planned sample size"
        );

        Ok(SamplePlan {
            per_arm,
            total: per_arm.saturating_mul(2),
            baseline_proportion: p1,
            target_proportion: p2,
            estimated_days,
        })
    }
}

/// Required per-arm sample size for a test configuration.
///
/// # Errors
///
/// See [`SampleSizePlanner::plan`].
pub fn plan_sample_size(config: &TestConfiguration) -> Result<u64> {
    SampleSizePlanner::plan(config).map(|plan| plan.per_arm)
}

/// Per-arm sample size to distinguish proportions `p1` and `p2`, rounded up.
///
/// # Errors
///
/// Returns [`EngineError::InvalidParameter`] if alpha or power is outside
/// (0, 1), a proportion is outside [0, 1], or `p1 == p2`.
pub fn two_proportion_sample_size(p1: f64, p2: f64, alpha: f64, power: f64) -> Result<u64> {
    validate_probability("alpha", alpha)?;
    validate_probability("power", power)?;
    for (name, p) in [("p1", p1), ("p2", p2)] {
        if !(0.0..=1.0).contains(&p) {
            return Err(EngineError::invalid_parameter(format!(
                "{name} must be a proportion, got {p}"
            )));
        }
    }
    let delta = p2 - p1;
    if delta == 0.0 {
        return Err(EngineError::invalid_parameter(
            "proportions are equal; no effect to detect",
        ));
    }

    let z_alpha = inverse_normal(1.0 - alpha / 2.0)?;
    let z_beta = inverse_normal(power)?;
    let p_bar = (p1 + p2) / 2.0;

    let numerator = z_alpha * (2.0 * p_bar * (1.0 - p_bar)).sqrt()
        + z_beta * (p1 * (1.0 - p1) + p2 * (1.0 - p2)).sqrt();
    let n = (numerator * numerator) / (delta * delta);

    Ok(n.ceil() as u64)
}

fn estimate_days(per_arm: u64, daily_traffic: u64, traffic_split: f64) -> Option<u64> {
    let split = traffic_split / 100.0;
    let smaller_arm_daily = daily_traffic as f64 * split.min(1.0 - split);
    if smaller_arm_daily <= 0.0 {
        return None;
    }
    Some((per_arm as f64 / smaller_arm_daily).ceil() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(baseline_rate: f64, mde: f64) -> TestConfiguration {
        TestConfiguration {
            baseline_rate,
            minimum_detectable_effect: mde,
            ..Default::default()
        }
    }

    // ============================================
    // two_proportion_sample_size Tests
    // ============================================

    #[test]
    fn ten_percent_baseline_twenty_percent_lift() {
        // 10% -> 12% at alpha 0.05, power 0.80 needs ~3841 per arm.
        let n = two_proportion_sample_size(0.10, 0.12, 0.05, 0.80).unwrap();
        assert_eq!(n, 3841);
    }

    #[test]
    fn higher_power_needs_more_samples() {
        let n = two_proportion_sample_size(0.10, 0.12, 0.05, 0.90).unwrap();
        assert_eq!(n, 5142);
    }

    #[test]
    fn symmetric_in_direction_of_effect() {
        let up = two_proportion_sample_size(0.10, 0.12, 0.05, 0.80).unwrap();
        let down = two_proportion_sample_size(0.12, 0.10, 0.05, 0.80).unwrap();
        assert_eq!(up, down);
    }

    #[test]
    fn equal_proportions_rejected() {
        let err = two_proportion_sample_size(0.1, 0.1, 0.05, 0.8).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter(_)));
    }

    #[test]
    fn alpha_and_power_domain_checked() {
        assert!(two_proportion_sample_size(0.1, 0.12, 0.0, 0.8).is_err());
        assert!(two_proportion_sample_size(0.1, 0.12, 0.05, 1.0).is_err());
    }

    // ============================================
    // SampleSizePlanner Tests
    // ============================================

    #[test]
    fn plan_converts_percentages_to_proportions() {
        let plan = SampleSizePlanner::plan(&config(10.0, 20.0)).unwrap();
        assert!((plan.baseline_proportion - 0.10).abs() < 1e-12);
        assert!((plan.target_proportion - 0.12).abs() < 1e-12);
        assert_eq!(plan.per_arm, 3841);
        assert_eq!(plan.total, 7682);
    }

    #[test]
    fn plan_estimates_duration_from_smaller_arm() {
        // 1000 visitors/day split 50/50 -> 500 per arm per day.
        let plan = SampleSizePlanner::plan(&config(10.0, 20.0)).unwrap();
        assert_eq!(plan.estimated_days, Some(8));

        // 80/20 split: the 20% arm gets 200/day.
        let uneven = TestConfiguration {
            traffic_split: 80.0,
            ..config(10.0, 20.0)
        };
        let plan = SampleSizePlanner::plan(&uneven).unwrap();
        assert_eq!(plan.estimated_days, Some(20));
    }

    #[test]
    fn plan_without_traffic_has_no_duration() {
        let no_traffic = TestConfiguration {
            daily_traffic: 0,
            ..config(10.0, 20.0)
        };
        let plan = SampleSizePlanner::plan(&no_traffic).unwrap();
        assert!(plan.estimated_days.is_none());
    }

    #[test]
    fn smaller_effects_need_at_least_as_many_samples() {
        let mut previous = 0;
        for mde in [50.0, 30.0, 20.0, 10.0, 5.0, 2.0, 1.0] {
            let n = plan_sample_size(&config(5.0, mde)).unwrap();
            assert!(n >= previous, "mde {mde}% needed {n}, less than {previous}");
            previous = n;
        }
    }

    #[test]
    fn lower_power_needs_no_more_samples() {
        let mut previous = u64::MAX;
        for power in [0.99, 0.95, 0.9, 0.8, 0.7, 0.5] {
            let plan_config = TestConfiguration {
                power,
                ..config(10.0, 20.0)
            };
            let n = plan_sample_size(&plan_config).unwrap();
            assert!(n <= previous, "power {power} needed {n}, more than {previous}");
            previous = n;
        }
    }

    #[test]
    fn target_rate_at_or_above_one_rejected() {
        let err = plan_sample_size(&config(60.0, 100.0)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter(_)));
    }

    #[test]
    fn invalid_alpha_rejected() {
        let bad = TestConfiguration {
            alpha: 1.2,
            ..Default::default()
        };
        assert!(matches!(
            plan_sample_size(&bad),
            Err(EngineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn planning_is_idempotent() {
        let config = config(3.5, 12.0);
        let first = SampleSizePlanner::plan(&config).unwrap();
        let second = SampleSizePlanner::plan(&config).unwrap();
        assert_eq!(first, second);
    }
}
