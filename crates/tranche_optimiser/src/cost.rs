//! Cost of debt for a candidate structure.

use serde::{Deserialize, Serialize};
use tranche_models::instruments::CapitalStructure;

/// Cost-of-debt model supplied by the caller.
///
/// Implemented for any `Fn(&CapitalStructure) -> f64`, so a closure can be
/// passed wherever a model is expected.
pub trait CostOfDebt: Send + Sync {
    /// Cost of `structure`, lower is better.
    fn cost(&self, structure: &CapitalStructure) -> f64;
}

impl<F> CostOfDebt for F
where
    F: Fn(&CapitalStructure) -> f64 + Send + Sync,
{
    fn cost(&self, structure: &CapitalStructure) -> f64 {
        self(structure)
    }
}

/// Principal-weighted average coupon.
///
/// Floating coupons are evaluated at `reference_rate`.
///
/// # Examples
///
/// ```
/// use tranche_models::instruments::{CapitalStructure, Coupon, Seniority, Tranche};
/// use tranche_optimiser::cost::{CostOfDebt, WeightedCouponCost};
///
/// let structure = CapitalStructure::new(
///     vec![
///         Tranche::new("senior", Seniority::Senior, 75.0, Coupon::Floating { spread: 0.01 }, 5),
///         Tranche::new("junior", Seniority::Subordinated, 25.0, Coupon::Fixed { rate: 0.09 }, 5),
///     ],
///     20.0,
///     5,
/// )
/// .unwrap();
///
/// let cost = WeightedCouponCost::new(0.04).cost(&structure);
/// assert!((cost - (0.75 * 0.05 + 0.25 * 0.09)).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeightedCouponCost {
    /// Rate at which floating coupons are evaluated.
    pub reference_rate: f64,
}

impl WeightedCouponCost {
    /// Cost model with the given reference rate.
    pub fn new(reference_rate: f64) -> Self {
        Self { reference_rate }
    }
}

impl CostOfDebt for WeightedCouponCost {
    fn cost(&self, structure: &CapitalStructure) -> f64 {
        let total = structure.total_debt();
        if total <= 0.0 {
            return 0.0;
        }
        structure
            .tranches()
            .iter()
            .map(|t| t.principal * t.coupon.rate(self.reference_rate))
            .sum::<f64>()
            / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tranche_models::instruments::{Coupon, Seniority, Tranche};

    fn structure() -> CapitalStructure {
        CapitalStructure::new(
            vec![
                Tranche::new("senior", Seniority::Senior, 80.0, Coupon::Fixed { rate: 0.05 }, 4),
                Tranche::new("junior", Seniority::Subordinated, 20.0, Coupon::Fixed { rate: 0.10 }, 4),
            ],
            10.0,
            4,
        )
        .unwrap()
    }

    #[test]
    fn test_reweighting_moves_cost() {
        let model = WeightedCouponCost::default();
        let base = model.cost(&structure());
        assert_relative_eq!(base, 0.06, epsilon = 1e-12);
        let junior_heavy = structure().reweighted(&[0.5, 0.5]).unwrap();
        assert_relative_eq!(model.cost(&junior_heavy), 0.075, epsilon = 1e-12);
    }

    #[test]
    fn test_closure_as_model() {
        let flat = |s: &CapitalStructure| s.total_debt() * 0.001;
        assert_relative_eq!(flat.cost(&structure()), 0.1, epsilon = 1e-12);
    }
}
