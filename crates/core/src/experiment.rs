//! Experiment inputs: design-time configuration and observed counts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Design-time parameters of a two-variant experiment.
///
/// Rates are percentages (`baseline_rate = 10.0` means 10%). The minimum
/// detectable effect is relative to the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfiguration {
    /// Baseline conversion rate in percent, 0 < x < 100.
    pub baseline_rate: f64,
    /// Minimum detectable relative effect in percent, > 0.
    pub minimum_detectable_effect: f64,
    /// Significance level, 0 < x < 1.
    pub alpha: f64,
    /// Target statistical power, 0 < x < 1.
    pub power: f64,
    /// Share of traffic sent to the treatment arm, in percent.
    pub traffic_split: f64,
    /// Planned test duration in days.
    pub test_duration: u32,
    /// Visitors per day across both arms.
    pub daily_traffic: u64,
    /// Cost per visitor.
    pub cost_per_visitor: Decimal,
    /// Revenue per conversion.
    pub revenue_per_conversion: Decimal,
    /// Industry tag (informational).
    #[serde(default)]
    pub industry: String,
    /// Test type tag (informational).
    #[serde(default)]
    pub test_type: String,
}

impl Default for TestConfiguration {
    fn default() -> Self {
        Self {
            baseline_rate: 10.0,
            minimum_detectable_effect: 20.0,
            alpha: 0.05,
            power: 0.80,
            traffic_split: 50.0,
            test_duration: 14,
            daily_traffic: 1000,
            cost_per_visitor: Decimal::new(50, 2),
            revenue_per_conversion: Decimal::new(50, 0),
            industry: "ecommerce".to_string(),
            test_type: "conversion".to_string(),
        }
    }
}

impl TestConfiguration {
    /// Checks the parameters the sample size planner depends on.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParameter`] if the baseline rate, minimum
    /// detectable effect, alpha, power, or traffic split is out of domain.
    pub fn validate_design(&self) -> Result<()> {
        if !(self.baseline_rate > 0.0 && self.baseline_rate < 100.0) {
            return Err(EngineError::invalid_parameter(format!(
                "baseline rate must be in (0, 100), got {}",
                self.baseline_rate
            )));
        }
        if !(self.minimum_detectable_effect > 0.0 && self.minimum_detectable_effect.is_finite()) {
            return Err(EngineError::invalid_parameter(format!(
                "minimum detectable effect must be positive, got {}",
                self.minimum_detectable_effect
            )));
        }
        validate_probability("alpha", self.alpha)?;
        validate_probability("power", self.power)?;
        if !(self.traffic_split > 0.0 && self.traffic_split < 100.0) {
            return Err(EngineError::invalid_parameter(format!(
                "traffic split must be in (0, 100), got {}",
                self.traffic_split
            )));
        }
        Ok(())
    }

    /// Checks the financial parameters the ROI evaluator depends on.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParameter`] if a cost or revenue is
    /// negative or the test duration is zero.
    pub fn validate_financials(&self) -> Result<()> {
        if self.cost_per_visitor < Decimal::ZERO {
            return Err(EngineError::invalid_parameter(format!(
                "cost per visitor must be non-negative, got {}",
                self.cost_per_visitor
            )));
        }
        if self.revenue_per_conversion < Decimal::ZERO {
            return Err(EngineError::invalid_parameter(format!(
                "revenue per conversion must be non-negative, got {}",
                self.revenue_per_conversion
            )));
        }
        if self.test_duration == 0 {
            return Err(EngineError::invalid_parameter(
                "test duration must be at least one day",
            ));
        }
        Ok(())
    }
}

/// Checks that `value` lies in the open interval (0, 1).
///
/// # Errors
///
/// Returns [`EngineError::InvalidParameter`] naming the offending parameter.
pub fn validate_probability(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(EngineError::invalid_parameter(format!(
            "{name} must be in (0, 1), got {value}"
        )))
    }
}

/// Observed conversion counts for both arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TestData {
    pub control_conversions: u64,
    pub control_total: u64,
    pub treatment_conversions: u64,
    pub treatment_total: u64,
}

impl TestData {
    /// Creates observed counts from (conversions, total) pairs.
    #[must_use]
    pub fn new(
        control_conversions: u64,
        control_total: u64,
        treatment_conversions: u64,
        treatment_total: u64,
    ) -> Self {
        Self {
            control_conversions,
            control_total,
            treatment_conversions,
            treatment_total,
        }
    }

    /// Checks that both arms are non-empty and no arm has more conversions
    /// than visitors.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidSample`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.control_total == 0 {
            return Err(EngineError::invalid_sample("control total must be positive"));
        }
        if self.treatment_total == 0 {
            return Err(EngineError::invalid_sample(
                "treatment total must be positive",
            ));
        }
        if self.control_conversions > self.control_total {
            return Err(EngineError::invalid_sample(format!(
                "control conversions ({}) exceed control total ({})",
                self.control_conversions, self.control_total
            )));
        }
        if self.treatment_conversions > self.treatment_total {
            return Err(EngineError::invalid_sample(format!(
                "treatment conversions ({}) exceed treatment total ({})",
                self.treatment_conversions, self.treatment_total
            )));
        }
        Ok(())
    }

    /// Control conversion rate as a proportion. Zero for an empty arm.
    #[must_use]
    pub fn control_rate(&self) -> f64 {
        rate(self.control_conversions, self.control_total)
    }

    /// Treatment conversion rate as a proportion. Zero for an empty arm.
    #[must_use]
    pub fn treatment_rate(&self) -> f64 {
        rate(self.treatment_conversions, self.treatment_total)
    }

    /// Total visitors across both arms.
    #[must_use]
    pub fn total_visitors(&self) -> u64 {
        self.control_total + self.treatment_total
    }

    /// Returns the data with control and treatment exchanged.
    #[must_use]
    pub fn swapped(&self) -> Self {
        Self {
            control_conversions: self.treatment_conversions,
            control_total: self.treatment_total,
            treatment_conversions: self.control_conversions,
            treatment_total: self.control_total,
        }
    }
}

fn rate(conversions: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        conversions as f64 / total as f64
    }
}
