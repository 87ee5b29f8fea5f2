//! Discount-curve error types.

use thiserror::Error;

/// Errors raised by discount-curve lookups and construction.
///
/// # Examples
/// ```
/// use tranche_core::market_data::CurveError;
///
/// let err = CurveError::InvalidMaturity { t: -1.5 };
/// assert_eq!(format!("{}", err), "Invalid maturity: t = -1.5");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurveError {
    /// Negative or non-finite maturity.
    #[error("Invalid maturity: t = {t}")]
    InvalidMaturity {
        /// Requested maturity
        t: f64,
    },

    /// Too few pillars to build a curve.
    #[error("Insufficient data: got {got}, need {need}")]
    InsufficientData {
        /// Pillars supplied
        got: usize,
        /// Pillars required
        need: usize,
    },

    /// Pillar times are not strictly increasing, or factors are not positive.
    #[error("Invalid pillar at index {index}: {reason}")]
    InvalidPillar {
        /// Offending pillar
        index: usize,
        /// Why it was rejected
        reason: String,
    },
}
