use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::experiment::validate_probability;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub frequentist: FrequentistSettings,
    pub bayesian: BayesianSettings,
    pub roi: RoiSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequentistSettings {
    pub alpha: f64,
    pub power: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BayesianSettings {
    pub simulations: usize,
    pub interval_simulations: usize,
    pub prior_alpha: f64,
    pub prior_beta: f64,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiSettings {
    pub include_opportunity_cost: bool,
    pub opportunity_cost_rate: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frequentist: FrequentistSettings::default(),
            bayesian: BayesianSettings::default(),
            roi: RoiSettings::default(),
        }
    }
}

impl Default for FrequentistSettings {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            power: 0.80,
        }
    }
}

impl Default for BayesianSettings {
    fn default() -> Self {
        Self {
            simulations: 100_000,
            interval_simulations: 10_000,
            prior_alpha: 1.0,
            prior_beta: 1.0,
            seed: None,
        }
    }
}

impl Default for RoiSettings {
    fn default() -> Self {
        Self {
            include_opportunity_cost: false,
            opportunity_cost_rate: Decimal::new(10, 2),
        }
    }
}

impl EngineConfig {
    /// Checks every section for out-of-domain values.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParameter`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        validate_probability("alpha", self.frequentist.alpha)?;
        validate_probability("power", self.frequentist.power)?;

        let bayesian = &self.bayesian;
        if bayesian.simulations == 0 || bayesian.interval_simulations == 0 {
            return Err(EngineError::invalid_parameter(
                "simulation counts must be positive",
            ));
        }
        if !(bayesian.prior_alpha > 0.0 && bayesian.prior_beta > 0.0) {
            return Err(EngineError::invalid_parameter(format!(
                "prior shapes must be positive, got ({}, {})",
                bayesian.prior_alpha, bayesian.prior_beta
            )));
        }
        if self.roi.opportunity_cost_rate < Decimal::ZERO {
            return Err(EngineError::invalid_parameter(
                "opportunity cost rate must be non-negative",
            ));
        }
        Ok(())
    }
}
