//! Discount-factor table supplied by an external curve builder.

use super::traits::DiscountCurve;
use crate::market_data::error::CurveError;

/// Pillar discount factors with log-linear interpolation.
///
/// Before the first pillar the curve interpolates from `DF(0) = 1`; beyond
/// the last pillar the last zero rate is held flat.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountFactorTable {
    times: Vec<f64>,
    log_factors: Vec<f64>,
}

impl DiscountFactorTable {
    /// Build from `(time, discount factor)` pillars.
    ///
    /// # Errors
    ///
    /// * `CurveError::InsufficientData` - no pillars
    /// * `CurveError::InvalidPillar` - times not strictly increasing and
    ///   positive, or a non-positive factor
    pub fn new(pillars: &[(f64, f64)]) -> Result<Self, CurveError> {
        if pillars.is_empty() {
            return Err(CurveError::InsufficientData { got: 0, need: 1 });
        }
        let mut prev = 0.0;
        for (index, &(t, df)) in pillars.iter().enumerate() {
            if t.is_nan() || t <= prev {
                return Err(CurveError::InvalidPillar {
                    index,
                    reason: format!("time {} does not follow {}", t, prev),
                });
            }
            if df.is_nan() || df <= 0.0 {
                return Err(CurveError::InvalidPillar {
                    index,
                    reason: format!("discount factor {} is not positive", df),
                });
            }
            prev = t;
        }
        Ok(Self {
            times: pillars.iter().map(|p| p.0).collect(),
            log_factors: pillars.iter().map(|p| p.1.ln()).collect(),
        })
    }
}

impl DiscountCurve for DiscountFactorTable {
    fn discount_factor(&self, t: f64) -> Result<f64, CurveError> {
        if !t.is_finite() || t < 0.0 {
            return Err(CurveError::InvalidMaturity { t });
        }
        let idx = self.times.partition_point(|&x| x < t);
        let log_df = if idx == self.times.len() {
            let last = self.times.len() - 1;
            self.log_factors[last] / self.times[last] * t
        } else {
            let (t0, l0) = if idx == 0 {
                (0.0, 0.0)
            } else {
                (self.times[idx - 1], self.log_factors[idx - 1])
            };
            let (t1, l1) = (self.times[idx], self.log_factors[idx]);
            l0 + (l1 - l0) * (t - t0) / (t1 - t0)
        };
        Ok(log_df.exp())
    }
}
