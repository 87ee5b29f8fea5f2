//! Collateral recovery seam.
//!
//! Loss-given-default is driven by an external recovery analysis. The engine
//! consumes it through [`RecoveryWaterfall`]; [`AbsolutePriorityRecovery`] is
//! the stock implementation used when nothing else is supplied.

use serde::{Deserialize, Serialize};
use tranche_core::types::ConfigError;

/// Snapshot handed to a recovery waterfall at the default period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoveryContext {
    /// Index of the defaulting tranche in priority order.
    pub tranche: usize,
    /// Default period.
    pub period: usize,
    /// Asset value at default.
    pub asset_value: f64,
    /// Exposure at default of the tranche.
    pub exposure: f64,
    /// Claims ranking strictly ahead of the tranche.
    pub claims_ahead: f64,
    /// Claims ranking equally with the tranche, its own included.
    pub pari_passu_claims: f64,
}

/// Present value of what a defaulted tranche recovers.
pub trait RecoveryWaterfall: Send + Sync {
    /// Discounted recovery for the defaulted tranche.
    fn recovery(&self, ctx: &RecoveryContext) -> f64;

    /// `1 − recovery / exposure`, clamped to `[0, 1]`.
    fn loss_given_default(&self, ctx: &RecoveryContext) -> f64 {
        if ctx.exposure <= 0.0 {
            return 0.0;
        }
        (1.0 - self.recovery(ctx) / ctx.exposure).clamp(0.0, 1.0)
    }
}

fn default_liquidation_cost() -> f64 {
    0.3
}
fn default_liquidation_lag() -> f64 {
    1.0
}
fn default_discount_rate() -> f64 {
    0.08
}

/// Liquidate the assets, pay claims by absolute priority (pro rata within a
/// rank) and discount the proceeds over the liquidation lag.
///
/// # Examples
/// ```
/// use tranche_models::credit::{AbsolutePriorityRecovery, RecoveryContext, RecoveryWaterfall};
///
/// let waterfall = AbsolutePriorityRecovery {
///     liquidation_cost: 0.2,
///     liquidation_lag_years: 0.0,
///     discount_rate: 0.0,
/// };
/// let ctx = RecoveryContext {
///     tranche: 1,
///     period: 3,
///     asset_value: 100.0,
///     exposure: 40.0,
///     claims_ahead: 60.0,
///     pari_passu_claims: 40.0,
/// };
/// // Net proceeds 80; 60 to seniors leaves 20 of the 40 claim.
/// assert!((waterfall.loss_given_default(&ctx) - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbsolutePriorityRecovery {
    /// Fraction of asset value lost to liquidation.
    #[serde(default = "default_liquidation_cost")]
    pub liquidation_cost: f64,
    /// Years between default and receipt of proceeds.
    #[serde(default = "default_liquidation_lag")]
    pub liquidation_lag_years: f64,
    /// Annual rate used to discount proceeds back to the default date.
    #[serde(default = "default_discount_rate")]
    pub discount_rate: f64,
}

impl Default for AbsolutePriorityRecovery {
    fn default() -> Self {
        Self {
            liquidation_cost: default_liquidation_cost(),
            liquidation_lag_years: default_liquidation_lag(),
            discount_rate: default_discount_rate(),
        }
    }
}

impl AbsolutePriorityRecovery {
    /// Validate parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.liquidation_cost) {
            return Err(ConfigError::invalid("recovery.liquidation_cost", "must lie in [0, 1]"));
        }
        if !self.liquidation_lag_years.is_finite() || self.liquidation_lag_years < 0.0 {
            return Err(ConfigError::invalid("recovery.liquidation_lag_years", "must be non-negative"));
        }
        if !self.discount_rate.is_finite() {
            return Err(ConfigError::invalid("recovery.discount_rate", "must be finite"));
        }
        Ok(())
    }
}

impl RecoveryWaterfall for AbsolutePriorityRecovery {
    fn recovery(&self, ctx: &RecoveryContext) -> f64 {
        if ctx.exposure <= 0.0 || ctx.pari_passu_claims <= 0.0 {
            return 0.0;
        }
        let proceeds = ctx.asset_value.max(0.0) * (1.0 - self.liquidation_cost);
        let residual = (proceeds - ctx.claims_ahead).max(0.0);
        let share = ctx.exposure / ctx.pari_passu_claims;
        let recovered = (residual * share).min(ctx.exposure);
        recovered * (-self.discount_rate * self.liquidation_lag_years).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ctx(asset_value: f64) -> RecoveryContext {
        RecoveryContext {
            tranche: 0,
            period: 1,
            asset_value,
            exposure: 50.0,
            claims_ahead: 0.0,
            pari_passu_claims: 50.0,
        }
    }

    #[test]
    fn test_full_recovery_discounted() {
        let w = AbsolutePriorityRecovery {
            liquidation_cost: 0.0,
            liquidation_lag_years: 2.0,
            discount_rate: 0.05,
        };
        let lgd = w.loss_given_default(&ctx(1_000.0));
        assert_abs_diff_eq!(lgd, 1.0 - (-0.1_f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_junior_wiped_out() {
        let w = AbsolutePriorityRecovery::default();
        let c = RecoveryContext {
            claims_ahead: 500.0,
            ..ctx(100.0)
        };
        assert_eq!(w.loss_given_default(&c), 1.0);
    }

    #[test]
    fn test_pro_rata_within_rank() {
        let w = AbsolutePriorityRecovery {
            liquidation_cost: 0.0,
            liquidation_lag_years: 0.0,
            discount_rate: 0.0,
        };
        let c = RecoveryContext {
            pari_passu_claims: 100.0,
            ..ctx(60.0)
        };
        // 60 shared between 100 of claims: this tranche gets 30 of 50.
        assert_abs_diff_eq!(w.recovery(&c), 30.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_exposure_has_no_loss() {
        let w = AbsolutePriorityRecovery::default();
        let c = RecoveryContext {
            exposure: 0.0,
            ..ctx(10.0)
        };
        assert_eq!(w.loss_given_default(&c), 0.0);
    }
}
