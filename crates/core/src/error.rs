//! Error types for the inference engine.
//!
//! Fatal input errors are returned as [`EngineError`]. Degenerate but
//! well-defined outcomes (an undefined lift, an unbounded payback period)
//! are not errors; they are reported through [`DegenerateResult`] markers
//! attached to each result so callers can observe them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort an engine computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A configuration value is outside its domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Observed counts cannot be analyzed (empty arm, conversions > total).
    #[error("invalid sample: {0}")]
    InvalidSample(String),

    /// A simulation was stopped by its caller before finishing.
    #[error("simulation cancelled after {completed} draws")]
    Cancelled { completed: usize },
}

impl EngineError {
    /// Creates an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    /// Creates an invalid sample error.
    pub fn invalid_sample(message: impl Into<String>) -> Self {
        Self::InvalidSample(message.into())
    }
}

/// Result alias for engine computations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Non-fatal condition under which a result field holds a sentinel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DegenerateResult {
    /// Control rate is zero, so relative lift and its interval are reported as 0.
    UndefinedLift,
    /// Pooled rate is 0 or 1, so the z-score is 0 and the p-value is 1.
    ZeroStandardError,
    /// Total test cost is zero, so ROI is reported as 0.
    ZeroCost,
    /// Additional revenue is not positive, so the payback period is unbounded.
    UnboundedPayback,
    /// Some control draws were so close to zero that their relative lift was
    /// not finite; those draws are excluded from the lift estimates.
    NonFiniteLiftDraws,
}

impl DegenerateResult {
    /// Short human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::UndefinedLift => "control rate is zero; lift reported as 0",
            Self::ZeroStandardError => "pooled rate is 0 or 1; z-score reported as 0",
            Self::ZeroCost => "total cost is zero; ROI reported as 0",
            Self::UnboundedPayback => "additional revenue is not positive; payback unbounded",
            Self::NonFiniteLiftDraws => {
                "some control draws were near zero; their lift draws were excluded"
            }
        }
    }
}
