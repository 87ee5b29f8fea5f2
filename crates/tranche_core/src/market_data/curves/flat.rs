//! Flat discount curve.

use super::traits::DiscountCurve;
use crate::market_data::error::CurveError;

/// Constant continuously compounded rate: `DF(t) = exp(-r·t)`.
///
/// # Examples
/// ```
/// use tranche_core::market_data::{DiscountCurve, FlatCurve};
///
/// let curve = FlatCurve::new(0.045);
/// let df = curve.discount_factor(1.0).unwrap();
/// assert!((df - (-0.045_f64).exp()).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatCurve {
    rate: f64,
}

impl FlatCurve {
    /// Create a flat curve at `rate`.
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    /// The flat rate.
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl DiscountCurve for FlatCurve {
    fn discount_factor(&self, t: f64) -> Result<f64, CurveError> {
        if !t.is_finite() || t < 0.0 {
            return Err(CurveError::InvalidMaturity { t });
        }
        Ok((-self.rate * t).exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_df_at_zero_is_one() {
        assert_eq!(FlatCurve::new(0.07).discount_factor(0.0).unwrap(), 1.0);
    }

    #[test]
    fn test_negative_maturity_rejected() {
        assert!(FlatCurve::new(0.07).discount_factor(-0.1).is_err());
    }
}
