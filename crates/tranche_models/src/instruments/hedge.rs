//! Interest-rate hedge overlays.
//!
//! A hedge is a pure transform of CFADS: its per-period payout is added to
//! CFADS before the waterfall runs and never interacts with allocation.

use serde::{Deserialize, Serialize};
use tranche_core::types::ConfigError;

/// Reporting key for a hedge configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HedgeMode {
    /// No hedge.
    Unhedged,
    /// Interest-rate cap.
    CapHedged,
    /// Interest-rate collar (long cap, short floor).
    CollarHedged,
}

impl HedgeMode {
    /// Snake-case name used in exported reports.
    pub fn as_str(self) -> &'static str {
        match self {
            HedgeMode::Unhedged => "unhedged",
            HedgeMode::CapHedged => "cap_hedged",
            HedgeMode::CollarHedged => "collar_hedged",
        }
    }
}

/// Hedge overlay applied to CFADS.
///
/// `payout = max(0, r − cap)·N − max(0, floor − r)·N`, with the floor term
/// absent for a cap.
///
/// # Examples
/// ```
/// use tranche_models::instruments::HedgeOverlay;
///
/// let cap = HedgeOverlay::Cap { strike: 0.04, notional: 50_000_000.0 };
/// assert!((cap.payout(0.05) - 500_000.0).abs() < 1e-6);
///
/// let collar = HedgeOverlay::Collar {
///     cap_strike: 0.04,
///     floor_strike: 0.03,
///     notional: 50_000_000.0,
/// };
/// assert!((collar.payout(0.025) + 250_000.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HedgeOverlay {
    /// No hedge.
    #[default]
    Unhedged,
    /// Long cap.
    Cap {
        /// Cap strike rate
        strike: f64,
        /// Hedged notional
        notional: f64,
    },
    /// Long cap, short floor.
    Collar {
        /// Cap strike rate
        cap_strike: f64,
        /// Floor strike rate
        floor_strike: f64,
        /// Hedged notional
        notional: f64,
    },
}

impl HedgeOverlay {
    /// Payout for a period in which the short rate is `rate`.
    #[inline]
    pub fn payout(&self, rate: f64) -> f64 {
        match *self {
            HedgeOverlay::Unhedged => 0.0,
            HedgeOverlay::Cap { strike, notional } => (rate - strike).max(0.0) * notional,
            HedgeOverlay::Collar {
                cap_strike,
                floor_strike,
                notional,
            } => {
                (rate - cap_strike).max(0.0) * notional - (floor_strike - rate).max(0.0) * notional
            }
        }
    }

    /// Reporting key.
    pub fn mode(&self) -> HedgeMode {
        match self {
            HedgeOverlay::Unhedged => HedgeMode::Unhedged,
            HedgeOverlay::Cap { .. } => HedgeMode::CapHedged,
            HedgeOverlay::Collar { .. } => HedgeMode::CollarHedged,
        }
    }

    /// Reject negative notionals and inverted collars.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            HedgeOverlay::Unhedged => Ok(()),
            HedgeOverlay::Cap { strike, notional } => {
                if !strike.is_finite() {
                    return Err(ConfigError::invalid("hedge.strike", "must be finite"));
                }
                if notional.is_nan() || notional < 0.0 {
                    return Err(ConfigError::invalid("hedge.notional", "must be non-negative"));
                }
                Ok(())
            }
            HedgeOverlay::Collar {
                cap_strike,
                floor_strike,
                notional,
            } => {
                if notional.is_nan() || notional < 0.0 {
                    return Err(ConfigError::invalid("hedge.notional", "must be non-negative"));
                }
                if floor_strike.is_nan() || floor_strike > cap_strike {
                    return Err(ConfigError::invalid(
                        "hedge.floor_strike",
                        "must not exceed the cap strike",
                    ));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const NOTIONAL: f64 = 50_000_000.0;

    #[test]
    fn test_cap_in_the_money() {
        let cap = HedgeOverlay::Cap {
            strike: 0.04,
            notional: NOTIONAL,
        };
        assert_abs_diff_eq!(cap.payout(0.05), 500_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cap_out_of_the_money() {
        let cap = HedgeOverlay::Cap {
            strike: 0.04,
            notional: NOTIONAL,
        };
        assert_eq!(cap.payout(0.03), 0.0);
    }

    #[test]
    fn test_collar_below_floor() {
        let collar = HedgeOverlay::Collar {
            cap_strike: 0.04,
            floor_strike: 0.03,
            notional: NOTIONAL,
        };
        assert_abs_diff_eq!(collar.payout(0.025), -250_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_collar_inside_band() {
        let collar = HedgeOverlay::Collar {
            cap_strike: 0.04,
            floor_strike: 0.03,
            notional: NOTIONAL,
        };
        assert_eq!(collar.payout(0.035), 0.0);
    }

    #[test]
    fn test_modes() {
        assert_eq!(HedgeOverlay::Unhedged.mode().as_str(), "unhedged");
        assert_eq!(
            HedgeOverlay::Cap {
                strike: 0.0,
                notional: 0.0
            }
            .mode(),
            HedgeMode::CapHedged
        );
    }

    #[test]
    fn test_inverted_collar_rejected() {
        let collar = HedgeOverlay::Collar {
            cap_strike: 0.03,
            floor_strike: 0.04,
            notional: NOTIONAL,
        };
        assert!(collar.validate().is_err());
    }

    #[test]
    fn test_deserialise_collar_from_toml() {
        let overlay: HedgeOverlay = toml::from_str(
            "type = \"collar\"\ncap_strike = 0.04\nfloor_strike = 0.03\nnotional = 1.0",
        )
        .unwrap();
        assert_eq!(overlay.mode(), HedgeMode::CollarHedged);
    }
}
