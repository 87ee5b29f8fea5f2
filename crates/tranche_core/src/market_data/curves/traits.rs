//! Discount curve trait definition.

use crate::market_data::error::CurveError;

/// Source of discount factors for present-value reporting.
///
/// Implementations must be `Send + Sync` so a curve can be shared with the
/// reporting step of a parallel run.
pub trait DiscountCurve: Send + Sync {
    /// Discount factor for maturity `t` in years.
    ///
    /// # Errors
    ///
    /// Returns `CurveError::InvalidMaturity` for negative or non-finite `t`.
    fn discount_factor(&self, t: f64) -> Result<f64, CurveError>;

    /// Continuously compounded zero rate for maturity `t`.
    ///
    /// # Errors
    ///
    /// Returns `CurveError::InvalidMaturity` if `t <= 0`.
    fn zero_rate(&self, t: f64) -> Result<f64, CurveError> {
        if t <= 0.0 {
            return Err(CurveError::InvalidMaturity { t });
        }
        Ok(-self.discount_factor(t)?.ln() / t)
    }

    /// Present value of `flows`, where `flows[i]` occurs at `(i + 1) * period_length` years.
    ///
    /// # Errors
    ///
    /// Propagates any lookup error from [`DiscountCurve::discount_factor`].
    fn present_value(&self, flows: &[f64], period_length: f64) -> Result<f64, CurveError> {
        flows.iter().enumerate().try_fold(0.0, |acc, (i, cf)| {
            let t = (i + 1) as f64 * period_length;
            Ok(acc + cf * self.discount_factor(t)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct MockCurve {
        rate: f64,
    }

    impl DiscountCurve for MockCurve {
        fn discount_factor(&self, t: f64) -> Result<f64, CurveError> {
            if t < 0.0 {
                return Err(CurveError::InvalidMaturity { t });
            }
            Ok((-self.rate * t).exp())
        }
    }

    #[test]
    fn test_default_zero_rate() {
        let curve = MockCurve { rate: 0.05 };
        assert_relative_eq!(curve.zero_rate(2.0).unwrap(), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_rate_at_origin_fails() {
        let curve = MockCurve { rate: 0.05 };
        assert_eq!(
            curve.zero_rate(0.0),
            Err(CurveError::InvalidMaturity { t: 0.0 })
        );
    }

    #[test]
    fn test_present_value() {
        let curve = MockCurve { rate: 0.05 };
        let pv = curve.present_value(&[100.0, 100.0], 0.5).unwrap();
        let expected = 100.0 * (-0.025_f64).exp() + 100.0 * (-0.05_f64).exp();
        assert_relative_eq!(pv, expected, epsilon = 1e-12);
    }
}
