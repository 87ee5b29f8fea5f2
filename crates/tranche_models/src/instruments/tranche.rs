//! Tranche definitions and amortisation schedules.

use super::phase::CovenantSchedule;
use serde::{Deserialize, Serialize};
use tranche_core::types::ConfigError;

/// Tolerance on custom amortisation fractions summing to one.
const FRACTION_TOL: f64 = 1e-9;

/// Priority rank of a tranche. Lower ranks are paid first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seniority {
    /// Paid first.
    Senior,
    /// Paid after senior debt.
    Mezzanine,
    /// Paid last among debt.
    Subordinated,
}

/// Coupon terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Coupon {
    /// Fixed annual rate.
    Fixed {
        /// Annual coupon rate
        rate: f64,
    },
    /// Spread over the simulated short rate.
    Floating {
        /// Annual spread
        spread: f64,
    },
}

impl Coupon {
    /// Annual coupon rate given the period's short rate.
    #[inline]
    pub fn rate(&self, short_rate: f64) -> f64 {
        match *self {
            Coupon::Fixed { rate } => rate,
            Coupon::Floating { spread } => short_rate + spread,
        }
    }
}

/// How principal is repaid between the first repayment period and maturity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Amortisation {
    /// Everything in the maturity period.
    Bullet,
    /// Equal instalments.
    #[default]
    Linear,
    /// Explicit fractions of principal, starting at the first repayment period.
    Custom {
        /// Fraction repaid in each period; must sum to one
        fractions: Vec<f64>,
    },
}

/// A priority-ranked slice of debt.
///
/// Periods are zero-based indices into the baseline horizon. Principal is
/// repaid in `[first_repayment_period, maturity_period)`.
///
/// # Examples
/// ```
/// use tranche_models::instruments::{Amortisation, Coupon, Seniority, Tranche};
///
/// let senior = Tranche::new("senior", Seniority::Senior, 100.0, Coupon::Fixed { rate: 0.05 }, 4);
/// let schedule = senior.schedule(4).unwrap();
/// assert_eq!(schedule.principal(0), 25.0);
/// assert_eq!(schedule.outstanding_begin(3), 25.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tranche {
    /// Identifier used in reports.
    pub name: String,
    /// Priority rank.
    pub seniority: Seniority,
    /// Initial principal. Overwritten when a structure is re-weighted.
    #[serde(default)]
    pub principal: f64,
    /// Coupon terms.
    pub coupon: Coupon,
    /// Repayment profile.
    #[serde(default)]
    pub amortisation: Amortisation,
    /// First period with scheduled principal.
    #[serde(default)]
    pub first_repayment_period: usize,
    /// One past the last period with scheduled principal.
    pub maturity_period: usize,
    /// Covenant thresholds per phase.
    #[serde(default)]
    pub covenants: CovenantSchedule,
}

impl Tranche {
    /// Linear-amortising tranche repaying from period zero.
    pub fn new(
        name: impl Into<String>,
        seniority: Seniority,
        principal: f64,
        coupon: Coupon,
        maturity_period: usize,
    ) -> Self {
        Self {
            name: name.into(),
            seniority,
            principal,
            coupon,
            amortisation: Amortisation::Linear,
            first_repayment_period: 0,
            maturity_period,
            covenants: CovenantSchedule::default(),
        }
    }

    /// Validate the tranche against a horizon of `n_periods`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter` for negative principal,
    /// non-finite coupon, an empty or out-of-horizon repayment window, or
    /// custom fractions that are negative, too long, or do not sum to one.
    pub fn validate(&self, n_periods: usize) -> Result<(), ConfigError> {
        let field = |f: &str| format!("tranche[{}].{}", self.name, f);

        if !self.principal.is_finite() || self.principal < 0.0 {
            return Err(ConfigError::invalid(field("principal"), "must be non-negative"));
        }
        let coupon_ok = match self.coupon {
            Coupon::Fixed { rate } => rate.is_finite(),
            Coupon::Floating { spread } => spread.is_finite(),
        };
        if !coupon_ok {
            return Err(ConfigError::invalid(field("coupon"), "must be finite"));
        }
        if self.maturity_period == 0 || self.maturity_period > n_periods {
            return Err(ConfigError::invalid(
                field("maturity_period"),
                format!("must lie in 1..={}", n_periods),
            ));
        }
        if self.first_repayment_period >= self.maturity_period {
            return Err(ConfigError::invalid(
                field("first_repayment_period"),
                "must precede maturity",
            ));
        }
        if let Amortisation::Custom { fractions } = &self.amortisation {
            let window = self.maturity_period - self.first_repayment_period;
            if fractions.len() > window {
                return Err(ConfigError::invalid(
                    field("amortisation.fractions"),
                    format!("{} fractions exceed the {}-period window", fractions.len(), window),
                ));
            }
            if fractions.iter().any(|f| !f.is_finite() || *f < 0.0) {
                return Err(ConfigError::invalid(
                    field("amortisation.fractions"),
                    "must be non-negative",
                ));
            }
            let sum: f64 = fractions.iter().sum();
            if (sum - 1.0).abs() > FRACTION_TOL {
                return Err(ConfigError::invalid(
                    field("amortisation.fractions"),
                    format!("sum to {}, expected 1", sum),
                ));
            }
        }
        self.covenants.validate()
    }

    /// Scheduled principal and outstanding balances over `n_periods`.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Tranche::validate`].
    pub fn schedule(&self, n_periods: usize) -> Result<AmortisationSchedule, ConfigError> {
        self.validate(n_periods)?;

        let mut principal = vec![0.0; n_periods];
        let start = self.first_repayment_period;
        let end = self.maturity_period;
        match &self.amortisation {
            Amortisation::Bullet => principal[end - 1] = self.principal,
            Amortisation::Linear => {
                let instalment = self.principal / (end - start) as f64;
                for p in &mut principal[start..end] {
                    *p = instalment;
                }
            }
            Amortisation::Custom { fractions } => {
                for (i, f) in fractions.iter().enumerate() {
                    principal[start + i] = f * self.principal;
                }
            }
        }

        let mut outstanding_begin = Vec::with_capacity(n_periods);
        let mut outstanding = self.principal;
        for p in &principal {
            outstanding_begin.push(outstanding.max(0.0));
            outstanding -= p;
        }

        Ok(AmortisationSchedule {
            principal,
            outstanding_begin,
        })
    }
}

/// Scheduled principal per period and outstanding balance at the start of each period.
#[derive(Debug, Clone, PartialEq)]
pub struct AmortisationSchedule {
    principal: Vec<f64>,
    outstanding_begin: Vec<f64>,
}

impl AmortisationSchedule {
    /// Scheduled principal in period `t`.
    #[inline]
    pub fn principal(&self, t: usize) -> f64 {
        self.principal[t]
    }

    /// Scheduled outstanding before period `t`'s repayment.
    #[inline]
    pub fn outstanding_begin(&self, t: usize) -> f64 {
        self.outstanding_begin[t]
    }

    /// Scheduled outstanding after period `t`'s repayment.
    #[inline]
    pub fn outstanding_end(&self, t: usize) -> f64 {
        (self.outstanding_begin[t] - self.principal[t]).max(0.0)
    }

    /// Last period with positive scheduled principal.
    pub fn last_principal_period(&self) -> Option<usize> {
        self.principal.iter().rposition(|&p| p > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fixed(principal: f64, maturity: usize) -> Tranche {
        Tranche::new("t", Seniority::Senior, principal, Coupon::Fixed { rate: 0.05 }, maturity)
    }

    #[test]
    fn test_linear_schedule() {
        let s = fixed(100.0, 4).schedule(6).unwrap();
        for t in 0..4 {
            assert_relative_eq!(s.principal(t), 25.0);
        }
        assert_eq!(s.principal(4), 0.0);
        assert_relative_eq!(s.outstanding_begin(2), 50.0);
        assert_relative_eq!(s.outstanding_end(3), 0.0);
        assert_eq!(s.last_principal_period(), Some(3));
    }

    #[test]
    fn test_bullet_schedule() {
        let mut t = fixed(80.0, 3);
        t.amortisation = Amortisation::Bullet;
        let s = t.schedule(3).unwrap();
        assert_eq!(s.principal(0), 0.0);
        assert_eq!(s.principal(2), 80.0);
        assert_eq!(s.outstanding_begin(2), 80.0);
    }

    #[test]
    fn test_custom_schedule_with_grace() {
        let mut t = fixed(100.0, 5);
        t.first_repayment_period = 2;
        t.amortisation = Amortisation::Custom {
            fractions: vec![0.2, 0.3, 0.5],
        };
        let s = t.schedule(5).unwrap();
        assert_eq!(s.principal(1), 0.0);
        assert_relative_eq!(s.principal(2), 20.0);
        assert_relative_eq!(s.principal(4), 50.0);
        assert_relative_eq!(s.outstanding_begin(4), 50.0);
    }

    #[test]
    fn test_custom_fractions_must_sum_to_one() {
        let mut t = fixed(100.0, 3);
        t.amortisation = Amortisation::Custom {
            fractions: vec![0.5, 0.4],
        };
        assert!(t.validate(3).is_err());
    }

    #[test]
    fn test_maturity_beyond_horizon() {
        assert!(fixed(100.0, 5).validate(4).is_err());
    }

    #[test]
    fn test_floating_coupon_rate() {
        let c = Coupon::Floating { spread: 0.02 };
        assert_relative_eq!(c.rate(0.03), 0.05);
    }

    #[test]
    fn test_seniority_order() {
        assert!(Seniority::Senior < Seniority::Mezzanine);
        assert!(Seniority::Mezzanine < Seniority::Subordinated);
    }
}
