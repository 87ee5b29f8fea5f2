//! Discrete mean-reverting short rate.
//!
//! Per period:
//! ```text
//! r[t] = r[t-1] + k·(θ − r[t-1]) + σ·z[t]
//! ```
//! with `r[-1]` the initial rate. This is the one-step Euler form of a
//! Hull-White/Vasicek rate with the period as the time unit, so `k` and `σ`
//! are per-period quantities.

use serde::{Deserialize, Serialize};
use tranche_core::types::ConfigError;

/// Short-rate dynamics.
///
/// # Examples
/// ```
/// use tranche_models::models::ShortRateParams;
///
/// let params = ShortRateParams {
///     initial_rate: 0.03,
///     long_run_rate: 0.05,
///     mean_reversion: 0.5,
///     volatility: 0.01,
/// };
/// assert!((params.step(0.03, 0.0) - 0.04).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShortRateParams {
    /// Rate before the first period.
    pub initial_rate: f64,
    /// Long-run level θ.
    pub long_run_rate: f64,
    /// Per-period pull towards θ, in `[0, 1]`.
    #[serde(default)]
    pub mean_reversion: f64,
    /// Per-period volatility σ.
    #[serde(default)]
    pub volatility: f64,
}

impl ShortRateParams {
    /// A constant rate.
    pub fn flat(rate: f64) -> Self {
        Self {
            initial_rate: rate,
            long_run_rate: rate,
            mean_reversion: 0.0,
            volatility: 0.0,
        }
    }

    /// Advance one period from `prev` with standard normal shock `z`.
    #[inline]
    pub fn step(&self, prev: f64, z: f64) -> f64 {
        prev + self.mean_reversion * (self.long_run_rate - prev) + self.volatility * z
    }

    /// Unconditional mean of `r[t]`.
    pub fn expected(&self, t: usize) -> f64 {
        let decay = (1.0 - self.mean_reversion).powi(t as i32 + 1);
        self.long_run_rate + (self.initial_rate - self.long_run_rate) * decay
    }

    /// Validate parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter` if `mean_reversion` is outside
    /// `[0, 1]`, `volatility` is negative, or a rate is not finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_rate.is_finite() || !self.long_run_rate.is_finite() {
            return Err(ConfigError::invalid("short_rate", "rates must be finite"));
        }
        if !(0.0..=1.0).contains(&self.mean_reversion) {
            return Err(ConfigError::invalid("short_rate.mean_reversion", "must lie in [0, 1]"));
        }
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(ConfigError::invalid("short_rate.volatility", "must be non-negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_rate_is_constant() {
        let p = ShortRateParams::flat(0.045);
        let mut r = p.initial_rate;
        for z in [1.5, -2.0, 0.3] {
            r = p.step(r, z);
            assert_eq!(r, 0.045);
        }
    }

    #[test]
    fn test_expected_matches_noise_free_path() {
        let p = ShortRateParams {
            initial_rate: 0.02,
            long_run_rate: 0.05,
            mean_reversion: 0.3,
            volatility: 0.0,
        };
        let mut r = p.initial_rate;
        for t in 0..6 {
            r = p.step(r, 0.0);
            assert_relative_eq!(r, p.expected(t), epsilon = 1e-14);
        }
    }

    #[test]
    fn test_rejects_overshooting_reversion() {
        let p = ShortRateParams {
            mean_reversion: 1.5,
            ..ShortRateParams::flat(0.03)
        };
        assert!(p.validate().is_err());
    }
}
