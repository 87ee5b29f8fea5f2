//! Latent asset-value model with first-passage default.
//!
//! Each tranche carries its own log asset value
//!
//! ```text
//! x[t] = x[t-1] + (μ_r − σ_r²/2)·Δt + σ_r·√Δt·(ρ·z_sys[t] + √(1−ρ²)·ε[t])
//! ```
//!
//! where `r` is the period's regime. A tranche defaults the first period
//! `x[t]` falls below the log of its barrier; [`CreditState`] makes that
//! absorbing.

use crate::models::Regime;
use serde::{Deserialize, Serialize};
use tranche_core::math::distributions::norm_cdf;
use tranche_core::types::ConfigError;

/// Drift and volatility for one regime (annualised).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeParams {
    /// Annual drift μ.
    pub drift: f64,
    /// Annual volatility σ.
    pub volatility: f64,
}

fn default_barrier_ratio() -> f64 {
    1.0
}
fn default_loading() -> f64 {
    0.5
}
fn default_divergence_tolerance() -> f64 {
    0.05
}

/// Parameters of the per-tranche asset-value process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetValueParams {
    /// Asset value at close, shared by every tranche's process.
    pub initial_value: f64,
    /// Barrier as a multiple of scheduled outstanding at or above the tranche's rank.
    #[serde(default = "default_barrier_ratio")]
    pub barrier_ratio: f64,
    /// Loading ρ on the systematic shock.
    #[serde(default = "default_loading")]
    pub systematic_loading: f64,
    /// Dynamics in the Normal regime.
    pub normal: RegimeParams,
    /// Dynamics in the Stress regime.
    pub stress: RegimeParams,
    /// Absolute gap between simulated and analytic PD above which a
    /// miscalibration warning is raised.
    #[serde(default = "default_divergence_tolerance")]
    pub divergence_tolerance: f64,
}

impl AssetValueParams {
    /// Parameters for `regime`.
    #[inline]
    pub fn params(&self, regime: Regime) -> RegimeParams {
        match regime {
            Regime::Normal => self.normal,
            Regime::Stress => self.stress,
        }
    }

    /// Advance a log asset value by one period.
    #[inline]
    pub fn log_step(&self, x_prev: f64, regime: Regime, dt: f64, z_sys: f64, eps: f64) -> f64 {
        let RegimeParams { drift, volatility } = self.params(regime);
        let rho = self.systematic_loading;
        let w = rho * z_sys + (1.0 - rho * rho).sqrt() * eps;
        x_prev + (drift - 0.5 * volatility * volatility) * dt + volatility * dt.sqrt() * w
    }

    /// Validate parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_value > 0.0 && self.initial_value.is_finite()) {
            return Err(ConfigError::invalid("asset.initial_value", "must be positive"));
        }
        if !self.barrier_ratio.is_finite() || self.barrier_ratio < 0.0 {
            return Err(ConfigError::invalid("asset.barrier_ratio", "must be non-negative"));
        }
        if !(-1.0..=1.0).contains(&self.systematic_loading) {
            return Err(ConfigError::invalid("asset.systematic_loading", "must lie in [-1, 1]"));
        }
        for (name, p) in [("asset.normal", self.normal), ("asset.stress", self.stress)] {
            if !p.drift.is_finite() || !p.volatility.is_finite() || p.volatility < 0.0 {
                return Err(ConfigError::invalid(name, "needs finite drift and non-negative volatility"));
            }
        }
        if !self.divergence_tolerance.is_finite() || self.divergence_tolerance < 0.0 {
            return Err(ConfigError::invalid("asset.divergence_tolerance", "must be non-negative"));
        }
        Ok(())
    }
}

/// Credit state of one tranche within one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CreditState {
    /// No default so far.
    #[default]
    Performing,
    /// Defaulted in `period`; absorbing.
    Defaulted {
        /// First period in which the barrier was breached
        period: usize,
    },
}

impl CreditState {
    /// Transition function for period `period`.
    ///
    /// `log_barrier` is `None` when the tranche has nothing outstanding and
    /// so cannot default.
    #[inline]
    pub fn advance(self, period: usize, log_value: f64, log_barrier: Option<f64>) -> Self {
        match self {
            CreditState::Defaulted { .. } => self,
            CreditState::Performing => match log_barrier {
                Some(b) if log_value < b => CreditState::Defaulted { period },
                _ => CreditState::Performing,
            },
        }
    }

    /// Whether the tranche is in default.
    #[inline]
    pub fn is_defaulted(self) -> bool {
        matches!(self, CreditState::Defaulted { .. })
    }

    /// Default period, if any.
    #[inline]
    pub fn default_period(self) -> Option<usize> {
        match self {
            CreditState::Defaulted { period } => Some(period),
            CreditState::Performing => None,
        }
    }
}

/// Black–Cox probability that a GBM asset value hits a constant barrier before `horizon`.
///
/// ```text
/// ν = μ − σ²/2,  b = ln(B / V0)
/// P(τ ≤ T) = Φ((b − νT)/(σ√T)) + exp(2νb/σ²)·Φ((b + νT)/(σ√T))
/// ```
///
/// # Examples
/// ```
/// use tranche_models::credit::black_cox_pd;
///
/// let pd = black_cox_pd(150.0, 100.0, 0.05, 0.25, 5.0);
/// assert!(pd > 0.0 && pd < 1.0);
/// assert_eq!(black_cox_pd(90.0, 100.0, 0.05, 0.25, 5.0), 1.0);
/// ```
pub fn black_cox_pd(v0: f64, barrier: f64, drift: f64, volatility: f64, horizon: f64) -> f64 {
    if barrier <= 0.0 || horizon <= 0.0 {
        return 0.0;
    }
    if barrier >= v0 {
        return 1.0;
    }
    let nu = drift - 0.5 * volatility * volatility;
    let b = (barrier / v0).ln();
    if volatility <= 0.0 {
        return if nu * horizon <= b { 1.0 } else { 0.0 };
    }
    let s = volatility * horizon.sqrt();
    let direct = norm_cdf((b - nu * horizon) / s);
    let reflected = (2.0 * nu * b / (volatility * volatility)).exp() * norm_cdf((b + nu * horizon) / s);
    (direct + reflected).clamp(0.0, 1.0)
}

/// Merton distance to default at `horizon`: `(ln(V0/B) + νT)/(σ√T)`.
///
/// The at-maturity default probability is `Φ(−DD)`, a lower bound for the
/// first-passage probability.
pub fn merton_distance_to_default(
    v0: f64,
    barrier: f64,
    drift: f64,
    volatility: f64,
    horizon: f64,
) -> f64 {
    if barrier <= 0.0 {
        return f64::INFINITY;
    }
    let nu = drift - 0.5 * volatility * volatility;
    let s = volatility * horizon.sqrt();
    if s <= 0.0 {
        let gap = (v0 / barrier).ln() + nu * horizon;
        return if gap >= 0.0 { f64::INFINITY } else { f64::NEG_INFINITY };
    }
    ((v0 / barrier).ln() + nu * horizon) / s
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn params() -> AssetValueParams {
        AssetValueParams {
            initial_value: 150.0,
            barrier_ratio: 1.0,
            systematic_loading: 0.6,
            normal: RegimeParams {
                drift: 0.05,
                volatility: 0.2,
            },
            stress: RegimeParams {
                drift: -0.05,
                volatility: 0.4,
            },
            divergence_tolerance: 0.05,
        }
    }

    #[test]
    fn test_default_is_absorbing() {
        let s = CreditState::Performing.advance(2, 4.0, Some(4.5));
        assert_eq!(s, CreditState::Defaulted { period: 2 });
        let s = s.advance(3, 10.0, Some(4.5));
        assert_eq!(s.default_period(), Some(2));
        let s = s.advance(4, 10.0, None);
        assert!(s.is_defaulted());
    }

    #[test]
    fn test_no_barrier_no_default() {
        let s = CreditState::Performing.advance(0, -100.0, None);
        assert_eq!(s, CreditState::Performing);
    }

    #[test]
    fn test_log_step_uses_regime() {
        let p = params();
        let normal = p.log_step(0.0, Regime::Normal, 1.0, 0.0, 0.0);
        let stress = p.log_step(0.0, Regime::Stress, 1.0, 0.0, 0.0);
        assert_abs_diff_eq!(normal, 0.05 - 0.02, epsilon = 1e-15);
        assert_abs_diff_eq!(stress, -0.05 - 0.08, epsilon = 1e-15);
    }

    #[test]
    fn test_log_step_variance_split() {
        let p = params();
        let sys = p.log_step(0.0, Regime::Normal, 1.0, 1.0, 0.0) - p.log_step(0.0, Regime::Normal, 1.0, 0.0, 0.0);
        let idio = p.log_step(0.0, Regime::Normal, 1.0, 0.0, 1.0) - p.log_step(0.0, Regime::Normal, 1.0, 0.0, 0.0);
        assert_abs_diff_eq!(sys * sys + idio * idio, 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_black_cox_exceeds_merton() {
        let (v0, b, mu, sigma, t) = (150.0, 100.0, 0.03, 0.3, 5.0);
        let first_passage = black_cox_pd(v0, b, mu, sigma, t);
        let at_maturity = norm_cdf(-merton_distance_to_default(v0, b, mu, sigma, t));
        assert!(first_passage > at_maturity);
    }

    #[test]
    fn test_black_cox_zero_drift_reflection() {
        // With ν = 0 the first-passage probability is 2·Φ(b/(σ√T)).
        let sigma: f64 = 0.2;
        let mu = 0.5 * sigma * sigma;
        let pd = black_cox_pd(120.0, 100.0, mu, sigma, 4.0);
        let b = (100.0_f64 / 120.0).ln();
        assert_abs_diff_eq!(pd, 2.0 * norm_cdf(b / (sigma * 2.0)), epsilon = 1e-12);
    }

    #[test]
    fn test_black_cox_no_barrier() {
        assert_eq!(black_cox_pd(100.0, 0.0, 0.0, 0.2, 1.0), 0.0);
    }

    #[test]
    fn test_validate_loading_range() {
        let p = AssetValueParams {
            systematic_loading: 1.2,
            ..params()
        };
        assert!(p.validate().is_err());
        assert!(params().validate().is_ok());
    }
}
