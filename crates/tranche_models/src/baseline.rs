//! Deterministic baseline cash-flow projection.
//!
//! The baseline is produced by an external financial model. It arrives as a
//! [`BaselineInput`] whose series are all optional so that a missing field
//! can be reported by name, and is validated once into a
//! [`BaselineProjection`] before any scenario runs.

use serde::{Deserialize, Serialize};
use tranche_core::types::ConfigError;

fn default_period_length() -> f64 {
    1.0
}

/// Raw per-period baseline series as supplied by the external model.
///
/// `revenue` and `opex` are required. `taxes`, `rcapex` and
/// `reserve_movements` default to zero in every period when absent.
///
/// # Examples
/// ```
/// use tranche_models::baseline::BaselineInput;
///
/// let input = BaselineInput {
///     revenue: Some(vec![100.0, 100.0]),
///     opex: Some(vec![40.0, 40.0]),
///     ..Default::default()
/// };
/// let projection = input.validate().unwrap();
/// assert_eq!(projection.n_periods(), 2);
/// assert_eq!(projection.cfads(0), 60.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineInput {
    /// Length of one period in years.
    #[serde(default = "default_period_length")]
    pub period_length_years: f64,
    /// Revenue per period.
    #[serde(default)]
    pub revenue: Option<Vec<f64>>,
    /// Operating expenditure per period.
    #[serde(default)]
    pub opex: Option<Vec<f64>>,
    /// Cash taxes per period.
    #[serde(default)]
    pub taxes: Option<Vec<f64>>,
    /// Replacement capital expenditure per period.
    #[serde(default)]
    pub rcapex: Option<Vec<f64>>,
    /// Net movement into non-debt reserves per period.
    #[serde(default)]
    pub reserve_movements: Option<Vec<f64>>,
}

impl Default for BaselineInput {
    fn default() -> Self {
        Self {
            period_length_years: default_period_length(),
            revenue: None,
            opex: None,
            taxes: None,
            rcapex: None,
            reserve_movements: None,
        }
    }
}

impl BaselineInput {
    /// Validate into a [`BaselineProjection`].
    ///
    /// # Errors
    ///
    /// * `ConfigError::MissingBaselineField` - `revenue` or `opex` absent
    /// * `ConfigError::BaselineLengthMismatch` - series of unequal length
    /// * `ConfigError::InvalidParameter` - empty horizon, non-positive period
    ///   length or non-finite values
    pub fn validate(&self) -> Result<BaselineProjection, ConfigError> {
        let revenue = self
            .revenue
            .clone()
            .ok_or_else(|| ConfigError::MissingBaselineField {
                field: "revenue".to_string(),
            })?;
        let opex = self
            .opex
            .clone()
            .ok_or_else(|| ConfigError::MissingBaselineField {
                field: "opex".to_string(),
            })?;

        let n = revenue.len();
        if n == 0 {
            return Err(ConfigError::invalid("revenue", "baseline has no periods"));
        }
        if !(self.period_length_years > 0.0 && self.period_length_years.is_finite()) {
            return Err(ConfigError::invalid(
                "period_length_years",
                "must be positive and finite",
            ));
        }

        let or_zero = |series: &Option<Vec<f64>>| series.clone().unwrap_or_else(|| vec![0.0; n]);
        let taxes = or_zero(&self.taxes);
        let rcapex = or_zero(&self.rcapex);
        let reserve_movements = or_zero(&self.reserve_movements);

        for (field, series) in [
            ("opex", &opex),
            ("taxes", &taxes),
            ("rcapex", &rcapex),
            ("reserve_movements", &reserve_movements),
        ] {
            if series.len() != n {
                return Err(ConfigError::BaselineLengthMismatch {
                    field: field.to_string(),
                    expected: n,
                    got: series.len(),
                });
            }
        }
        for (field, series) in [
            ("revenue", &revenue),
            ("opex", &opex),
            ("taxes", &taxes),
            ("rcapex", &rcapex),
            ("reserve_movements", &reserve_movements),
        ] {
            if series.iter().any(|v| !v.is_finite()) {
                return Err(ConfigError::invalid(field, "contains a non-finite value"));
            }
        }

        Ok(BaselineProjection {
            period_length: self.period_length_years,
            revenue,
            opex,
            taxes,
            rcapex,
            reserve_movements,
        })
    }
}

/// Validated baseline projection.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineProjection {
    period_length: f64,
    revenue: Vec<f64>,
    opex: Vec<f64>,
    taxes: Vec<f64>,
    rcapex: Vec<f64>,
    reserve_movements: Vec<f64>,
}

impl BaselineProjection {
    /// Number of periods.
    #[inline]
    pub fn n_periods(&self) -> usize {
        self.revenue.len()
    }

    /// Period length in years.
    #[inline]
    pub fn period_length(&self) -> f64 {
        self.period_length
    }

    /// Baseline revenue in period `t`.
    #[inline]
    pub fn revenue(&self, t: usize) -> f64 {
        self.revenue[t]
    }

    /// Baseline opex in period `t`.
    #[inline]
    pub fn opex(&self, t: usize) -> f64 {
        self.opex[t]
    }

    /// Baseline taxes in period `t`.
    #[inline]
    pub fn taxes(&self, t: usize) -> f64 {
        self.taxes[t]
    }

    /// Replacement capex in period `t`.
    #[inline]
    pub fn rcapex(&self, t: usize) -> f64 {
        self.rcapex[t]
    }

    /// Reserve movement in period `t`.
    #[inline]
    pub fn reserve_movement(&self, t: usize) -> f64 {
        self.reserve_movements[t]
    }

    /// Baseline EBITDA (revenue less opex) in period `t`.
    #[inline]
    pub fn ebitda(&self, t: usize) -> f64 {
        self.revenue[t] - self.opex[t]
    }

    /// Unshocked CFADS in period `t`.
    #[inline]
    pub fn cfads(&self, t: usize) -> f64 {
        self.ebitda(t) - self.taxes[t] - self.rcapex[t] - self.reserve_movements[t]
    }
}
