//! Financial evaluation of a finished test.
//!
//! The evaluator assumes an even split, so test traffic is counted as twice
//! the treatment arm. Incremental revenue is the observed lift applied to the
//! control arm's conversions:
//!
//! ```text
//! visitors           = 2 * treatment_total
//! total_cost         = visitors * cost_per_visitor [+ opportunity cost]
//! additional_revenue = lift/100 * control_conversions * revenue_per_conversion
//! npv                = additional_revenue - total_cost
//! roi                = npv / total_cost * 100
//! payback_days       = total_cost / (additional_revenue / test_duration)
//! annualized         = additional_revenue * 365 / test_duration
//! ```
//!
//! The opportunity cost term, when enabled, is
//! `daily_traffic * test_duration * cost_per_visitor * opportunity_cost_rate`.

use abtest_core::{DegenerateResult, EngineError, Result, RoiSettings, TestConfiguration, TestData};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::frequentist::StatisticalResults;

/// Days until the test cost is recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaybackPeriod {
    /// Cost is recovered after this many days.
    Days(Decimal),
    /// Additional revenue is not positive; cost is never recovered.
    Unbounded,
}

impl PaybackPeriod {
    /// Returns the number of days, or `None` when unbounded.
    #[must_use]
    pub fn days(&self) -> Option<Decimal> {
        match self {
            Self::Days(days) => Some(*days),
            Self::Unbounded => None,
        }
    }

    /// Returns true if the cost is never recovered.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }
}

/// Output of the ROI evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiAnalysis {
    /// Visitors counted against the test, `2 * treatment_total`.
    pub test_visitors: u64,
    /// Opportunity cost included in `total_cost` (zero when disabled).
    pub opportunity_cost: Decimal,
    /// Total cost of running the test.
    pub total_cost: Decimal,
    /// Incremental revenue attributed to the treatment.
    pub additional_revenue: Decimal,
    /// `additional_revenue - total_cost`.
    pub net_present_value: Decimal,
    /// Return on investment in percent. 0 when the cost is 0.
    pub roi: Decimal,
    /// Days to recover the cost.
    pub payback_period: PaybackPeriod,
    /// Additional revenue extrapolated to a year.
    pub annualized_revenue: Decimal,
    /// Degenerate conditions whose fields hold sentinels.
    pub warnings: Vec<DegenerateResult>,
}

impl RoiAnalysis {
    /// Returns true if the test paid for itself.
    #[must_use]
    pub fn is_profitable(&self) -> bool {
        self.net_present_value > Decimal::ZERO
    }
}

/// ROI evaluator.
#[derive(Debug, Clone, Default)]
pub struct RoiEvaluator {
    settings: RoiSettings,
}

impl RoiEvaluator {
    /// Creates an evaluator with the given options.
    #[must_use]
    pub fn new(settings: RoiSettings) -> Self {
        Self { settings }
    }

    /// Evaluates the financial outcome of a test.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParameter`] for negative costs or revenues,
    /// a zero test duration, a negative opportunity cost rate, a non-finite
    /// lift, or amounts too large to represent; [`EngineError::InvalidSample`]
    /// for invalid counts.
    pub fn evaluate(
        &self,
        data: &TestData,
        config: &TestConfiguration,
        stats: &StatisticalResults,
    ) -> Result<RoiAnalysis> {
        config.validate_financials()?;
        data.validate()?;
        if self.settings.opportunity_cost_rate < Decimal::ZERO {
            return Err(EngineError::invalid_parameter(
                "opportunity cost rate must be non-negative",
            ));
        }
        let lift = Decimal::try_from(stats.lift).map_err(|_| {
            EngineError::invalid_parameter(format!("lift must be finite, got {}", stats.lift))
        })?;

        let mut warnings = Vec::new();
        let duration = Decimal::from(config.test_duration);

        let test_visitors = data.treatment_total.saturating_mul(2);
        let opportunity_cost = if self.settings.include_opportunity_cost {
            checked_product(
                "opportunity cost",
                &[
                    Decimal::from(config.daily_traffic),
                    duration,
                    config.cost_per_visitor,
                    self.settings.opportunity_cost_rate,
                ],
            )?
        } else {
            Decimal::ZERO
        };
        let total_cost = checked_product(
            "visitor cost",
            &[Decimal::from(test_visitors), config.cost_per_visitor],
        )?
        .checked_add(opportunity_cost)
        .ok_or_else(|| overflow("total cost"))?;

        let additional_revenue = checked_product(
            "additional revenue",
            &[
                lift / dec!(100),
                Decimal::from(data.control_conversions),
                config.revenue_per_conversion,
            ],
        )?;
        let net_present_value = additional_revenue
            .checked_sub(total_cost)
            .ok_or_else(|| overflow("net present value"))?;

        let roi = if total_cost > Decimal::ZERO {
            net_present_value
                .checked_div(total_cost)
                .and_then(|ratio| ratio.checked_mul(dec!(100)))
                .ok_or_else(|| overflow("roi"))?
        } else {
            warnings.push(DegenerateResult::ZeroCost);
            Decimal::ZERO
        };

        // A daily revenue too small to divide by never recovers the cost either.
        let payback_days = if additional_revenue > Decimal::ZERO {
            total_cost.checked_div(additional_revenue / duration)
        } else {
            None
        };
        let payback_period = match payback_days {
            Some(days) => PaybackPeriod::Days(days),
            None => {
                warnings.push(DegenerateResult::UnboundedPayback);
                PaybackPeriod::Unbounded
            }
        };

        let annualized_revenue = additional_revenue
            .checked_mul(dec!(365))
            .ok_or_else(|| overflow("annualized revenue"))?
            / duration;

        if !warnings.is_empty() {
            warn!(?warnings, "roi evaluation is degenerate");
        }
        debug!(
            %total_cost,
            %additional_revenue,
            %roi,
            ?payback_period,
            "roi evaluation complete"
        );

        Ok(RoiAnalysis {
            test_visitors,
            opportunity_cost,
            total_cost,
            additional_revenue,
            net_present_value,
            roi,
            payback_period,
            annualized_revenue,
            warnings,
        })
    }
}

fn overflow(quantity: &str) -> EngineError {
    EngineError::invalid_parameter(format!("{quantity} exceeds the representable money range"))
}

fn checked_product(quantity: &str, factors: &[Decimal]) -> Result<Decimal> {
    factors
        .iter()
        .try_fold(Decimal::ONE, |acc, factor| acc.checked_mul(*factor))
        .ok_or_else(|| overflow(quantity))
}

/// Evaluates ROI with default options (no opportunity cost).
///
/// # Errors
///
/// See [`RoiEvaluator::evaluate`].
pub fn evaluate_roi(
    data: &TestData,
    config: &TestConfiguration,
    stats: &StatisticalResults,
) -> Result<RoiAnalysis> {
    RoiEvaluator::default().evaluate(data, config, stats)
}
