//! Capital structure: ordered tranches plus equity.

use super::tranche::{AmortisationSchedule, Seniority, Tranche};
use tranche_core::types::ConfigError;

/// Tolerance on tranche weights summing to one.
pub const WEIGHT_TOL: f64 = 1e-9;

/// Validate a tranche-weight vector.
///
/// # Errors
///
/// * `ConfigError::WeightCountMismatch` - wrong length
/// * `ConfigError::NegativeWeight` - any weight below zero
/// * `ConfigError::WeightsNotNormalised` - sum differs from one by more than [`WEIGHT_TOL`]
///
/// # Examples
/// ```
/// use tranche_models::instruments::structure::validate_weights;
///
/// assert!(validate_weights(&[0.6, 0.4], 2).is_ok());
/// assert!(validate_weights(&[0.6, 0.3], 2).is_err());
/// ```
pub fn validate_weights(weights: &[f64], expected: usize) -> Result<(), ConfigError> {
    if weights.len() != expected {
        return Err(ConfigError::WeightCountMismatch {
            expected,
            got: weights.len(),
        });
    }
    if let Some((index, &weight)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| w.is_nan() || **w < 0.0)
    {
        return Err(ConfigError::NegativeWeight { index, weight });
    }
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_TOL {
        return Err(ConfigError::WeightsNotNormalised { sum });
    }
    Ok(())
}

/// Ordered tranches with precomputed amortisation schedules.
///
/// Tranches are stably sorted by seniority at construction, so the index
/// order is the payment priority order for the lifetime of the structure.
#[derive(Debug, Clone, PartialEq)]
pub struct CapitalStructure {
    tranches: Vec<Tranche>,
    schedules: Vec<AmortisationSchedule>,
    equity_investment: f64,
    n_periods: usize,
}

impl CapitalStructure {
    /// Build and validate a structure over `n_periods`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter` for an empty structure, a
    /// negative equity investment, or any invalid tranche.
    pub fn new(
        mut tranches: Vec<Tranche>,
        equity_investment: f64,
        n_periods: usize,
    ) -> Result<Self, ConfigError> {
        if tranches.is_empty() {
            return Err(ConfigError::invalid("tranches", "at least one tranche is required"));
        }
        if !equity_investment.is_finite() || equity_investment < 0.0 {
            return Err(ConfigError::invalid("equity_investment", "must be non-negative"));
        }
        tranches.sort_by_key(|t| t.seniority);
        let schedules = tranches
            .iter()
            .map(|t| t.schedule(n_periods))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            tranches,
            schedules,
            equity_investment,
            n_periods,
        })
    }

    /// Same tranche terms with principal reallocated as `weights × total_debt`.
    ///
    /// `weights` is in priority order (the order of [`CapitalStructure::tranches`]).
    ///
    /// # Errors
    ///
    /// Returns any error from [`validate_weights`].
    pub fn reweighted(&self, weights: &[f64]) -> Result<Self, ConfigError> {
        validate_weights(weights, self.tranches.len())?;
        let total = self.total_debt();
        let tranches = self
            .tranches
            .iter()
            .zip(weights)
            .map(|(t, w)| Tranche {
                principal: w * total,
                ..t.clone()
            })
            .collect();
        Self::new(tranches, self.equity_investment, self.n_periods)
    }

    /// Tranches in priority order.
    #[inline]
    pub fn tranches(&self) -> &[Tranche] {
        &self.tranches
    }

    /// Number of tranches.
    #[inline]
    pub fn len(&self) -> usize {
        self.tranches.len()
    }

    /// Always false for a validated structure.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tranches.is_empty()
    }

    /// Amortisation schedule of tranche `k`.
    #[inline]
    pub fn schedule(&self, k: usize) -> &AmortisationSchedule {
        &self.schedules[k]
    }

    /// Horizon in periods.
    #[inline]
    pub fn n_periods(&self) -> usize {
        self.n_periods
    }

    /// Sponsor equity invested at close.
    #[inline]
    pub fn equity_investment(&self) -> f64 {
        self.equity_investment
    }

    /// Sum of tranche principals.
    pub fn total_debt(&self) -> f64 {
        self.tranches.iter().map(|t| t.principal).sum()
    }

    /// Principal shares in priority order.
    pub fn weights(&self) -> Vec<f64> {
        let total = self.total_debt();
        if total <= 0.0 {
            return vec![0.0; self.tranches.len()];
        }
        self.tranches.iter().map(|t| t.principal / total).collect()
    }

    /// Scheduled interest of tranche `k` in period `t`.
    #[inline]
    pub fn scheduled_interest(&self, k: usize, t: usize, short_rate: f64, period_length: f64) -> f64 {
        self.tranches[k].coupon.rate(short_rate) * self.schedules[k].outstanding_begin(t) * period_length
    }

    /// Scheduled interest plus principal across all tranches in period `t`.
    pub fn scheduled_debt_service(&self, t: usize, short_rate: f64, period_length: f64) -> f64 {
        (0..self.tranches.len())
            .map(|k| {
                self.scheduled_interest(k, t, short_rate, period_length)
                    + self.schedules[k].principal(t)
            })
            .sum()
    }

    /// Scheduled outstanding after period `t` of every tranche ranked at or above tranche `k`.
    pub fn outstanding_at_or_above(&self, k: usize, t: usize) -> f64 {
        let rank = self.tranches[k].seniority;
        self.ranked(|s| s <= rank)
            .map(|j| self.schedules[j].outstanding_end(t))
            .sum()
    }

    /// Scheduled outstanding at the start of period `t` of tranches strictly senior to `k`.
    pub fn claims_ahead(&self, k: usize, t: usize) -> f64 {
        let rank = self.tranches[k].seniority;
        self.ranked(|s| s < rank)
            .map(|j| self.schedules[j].outstanding_begin(t))
            .sum()
    }

    /// Scheduled outstanding at the start of period `t` of tranches ranking equally with `k`.
    pub fn pari_passu_claims(&self, k: usize, t: usize) -> f64 {
        let rank = self.tranches[k].seniority;
        self.ranked(|s| s == rank)
            .map(|j| self.schedules[j].outstanding_begin(t))
            .sum()
    }

    /// First period after every tranche's final scheduled repayment.
    pub fn wind_down_start(&self) -> usize {
        self.schedules
            .iter()
            .filter_map(|s| s.last_principal_period())
            .max()
            .map_or(self.n_periods, |p| p + 1)
    }

    /// Index of the most senior tranche.
    #[inline]
    pub fn senior_index(&self) -> usize {
        0
    }

    fn ranked<'a>(&'a self, keep: impl Fn(Seniority) -> bool + 'a) -> impl Iterator<Item = usize> + 'a {
        self.tranches
            .iter()
            .enumerate()
            .filter(move |(_, t)| keep(t.seniority))
            .map(|(j, _)| j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::tranche::Coupon;
    use approx::assert_relative_eq;

    fn structure() -> CapitalStructure {
        CapitalStructure::new(
            vec![
                Tranche::new("sub", Seniority::Subordinated, 10.0, Coupon::Fixed { rate: 0.10 }, 4),
                Tranche::new("senior", Seniority::Senior, 70.0, Coupon::Fixed { rate: 0.05 }, 4),
                Tranche::new("mezz", Seniority::Mezzanine, 20.0, Coupon::Fixed { rate: 0.08 }, 4),
            ],
            25.0,
            5,
        )
        .unwrap()
    }

    #[test]
    fn test_sorted_by_seniority() {
        let s = structure();
        let names: Vec<_> = s.tranches().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["senior", "mezz", "sub"]);
    }

    #[test]
    fn test_weights_and_total() {
        let s = structure();
        assert_relative_eq!(s.total_debt(), 100.0);
        let w = s.weights();
        assert_relative_eq!(w[0], 0.7);
        assert_relative_eq!(w[2], 0.1);
    }

    #[test]
    fn test_reweighted() {
        let s = structure().reweighted(&[0.5, 0.3, 0.2]).unwrap();
        assert_relative_eq!(s.tranches()[0].principal, 50.0);
        assert_relative_eq!(s.tranches()[2].principal, 20.0);
        assert_relative_eq!(s.total_debt(), 100.0);
    }

    #[test]
    fn test_reweighted_rejects_bad_sum() {
        assert_eq!(
            structure().reweighted(&[0.5, 0.3, 0.1]),
            Err(ConfigError::WeightsNotNormalised { sum: 0.5 + 0.3 + 0.1 })
        );
    }

    #[test]
    fn test_reweighted_rejects_negative() {
        assert!(matches!(
            structure().reweighted(&[1.2, -0.2, 0.0]),
            Err(ConfigError::NegativeWeight { index: 1, .. })
        ));
    }

    #[test]
    fn test_scheduled_debt_service() {
        let s = structure();
        // Period 0: interest 70*5% + 20*8% + 10*10% = 6.1, principal 25.
        assert_relative_eq!(s.scheduled_debt_service(0, 0.0, 1.0), 31.1, epsilon = 1e-12);
        assert_relative_eq!(s.scheduled_debt_service(4, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_barrier_claims() {
        let s = structure();
        // After period 0, each tranche has 3/4 of principal left.
        assert_relative_eq!(s.outstanding_at_or_above(0, 0), 52.5, epsilon = 1e-12);
        assert_relative_eq!(s.outstanding_at_or_above(2, 0), 75.0, epsilon = 1e-12);
        assert_relative_eq!(s.claims_ahead(2, 0), 90.0, epsilon = 1e-12);
        assert_relative_eq!(s.pari_passu_claims(1, 0), 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_wind_down_start() {
        assert_eq!(structure().wind_down_start(), 4);
    }

    #[test]
    fn test_empty_structure_rejected() {
        assert!(CapitalStructure::new(vec![], 0.0, 3).is_err());
    }
}
