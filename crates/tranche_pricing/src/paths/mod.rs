//! Path simulation: from a scenario's shocks to a CFADS trajectory.
//!
//! Per period `t`:
//!
//! ```text
//! Revenue[t] = base_revenue[t] × revenue_factor[t] × group.revenue_multiplier
//! Opex[t]    = base_opex[t]    × opex_factor[t]    × group.opex_multiplier
//! Taxes[t]   = base_taxes[t]   × max(0, EBITDA[t] / base_EBITDA[t])   (base EBITDA > 0)
//! CFADS[t]   = Revenue − Opex − Taxes − RCAPEX − ΔReserves
//! ```
//!
//! A missing factor contributes a multiplier of one. Under
//! [`ShockApplication::Cumulative`] the factor for period `t` is the product
//! of the draws for periods `0..=t`.
//!
//! The short rate and the regime are advanced as explicit per-scenario state;
//! nothing is carried between scenarios.

use crate::context::SimulationContext;
use crate::generator::{Scenario, ShockApplication};
use crate::plan::ScenarioGroup;
use tranche_models::models::Regime;

/// Simulated cash-flow and state trajectory of one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedPath {
    /// Revenue per period.
    pub revenue: Vec<f64>,
    /// Operating expenditure per period.
    pub opex: Vec<f64>,
    /// Cash taxes per period.
    pub taxes: Vec<f64>,
    /// Cash flow available for debt service per period, before hedging.
    pub cfads: Vec<f64>,
    /// Short rate per period, group shift included.
    pub rate: Vec<f64>,
    /// Regime per period.
    pub regime: Vec<Regime>,
    /// Systematic asset-value shock per period.
    pub z_sys: Vec<f64>,
}

impl SimulatedPath {
    /// Number of periods.
    #[inline]
    pub fn n_periods(&self) -> usize {
        self.cfads.len()
    }
}

/// Maps scenarios to paths under a fixed context.
#[derive(Debug, Clone, Copy)]
pub struct PathSimulator<'a> {
    ctx: &'a SimulationContext,
}

impl<'a> PathSimulator<'a> {
    /// Simulator bound to `ctx`.
    pub fn new(ctx: &'a SimulationContext) -> Self {
        Self { ctx }
    }

    /// Simulate one path.
    ///
    /// # Arguments
    ///
    /// * `scenario` - Correlated draws for the scenario
    /// * `group` - The scenario's group, supplying deterministic overlays
    pub fn simulate(&self, scenario: &Scenario, group: &ScenarioGroup) -> SimulatedPath {
        let ctx = self.ctx;
        let base = ctx.baseline();
        let generator = ctx.generator();
        let index = generator.index();
        let specs = generator.specs();
        let n = ctx.n_periods();

        let mut path = SimulatedPath {
            revenue: Vec::with_capacity(n),
            opex: Vec::with_capacity(n),
            taxes: Vec::with_capacity(n),
            cfads: Vec::with_capacity(n),
            rate: Vec::with_capacity(n),
            regime: Vec::with_capacity(n),
            z_sys: Vec::with_capacity(n),
        };

        let mut revenue_acc = 1.0;
        let mut opex_acc = 1.0;
        let mut rate = ctx.short_rate().initial_rate;
        let mut regime = Regime::Normal;

        for t in 0..n {
            let revenue_factor = match index.revenue {
                Some(f) => shock(&mut revenue_acc, scenario.value(t, f), specs[f].application),
                None => 1.0,
            };
            let opex_factor = match index.opex {
                Some(f) => shock(&mut opex_acc, scenario.value(t, f), specs[f].application),
                None => 1.0,
            };

            let revenue = base.revenue(t) * revenue_factor * group.revenue_multiplier;
            let opex = base.opex(t) * opex_factor * group.opex_multiplier;

            let base_ebitda = base.ebitda(t);
            let taxes = if base_ebitda > 0.0 {
                base.taxes(t) * ((revenue - opex) / base_ebitda).max(0.0)
            } else {
                base.taxes(t)
            };
            let cfads = revenue - opex - taxes - base.rcapex(t) - base.reserve_movement(t);

            let z_rate = index.rate.map_or(0.0, |f| scenario.z(t, f));
            rate = ctx.short_rate().step(rate, z_rate);

            regime = if group.force_stress {
                Regime::Stress
            } else {
                match index.regime {
                    Some(f) => ctx.regime().advance(regime, scenario.u(t, f), scenario.value(t, f)),
                    None => regime,
                }
            };

            let z_sys = index
                .asset
                .or(index.revenue)
                .map_or(0.0, |f| scenario.z(t, f));

            path.revenue.push(revenue);
            path.opex.push(opex);
            path.taxes.push(taxes);
            path.cfads.push(cfads);
            path.rate.push(rate + group.rate_shift);
            path.regime.push(regime);
            path.z_sys.push(z_sys);
        }

        path
    }
}

#[inline]
fn shock(acc: &mut f64, draw: f64, application: ShockApplication) -> f64 {
    match application {
        ShockApplication::Level => draw,
        ShockApplication::Cumulative => {
            *acc *= draw;
            *acc
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{FactorSpec, GeneratorConfig, Marginal, RiskFactor};
    use crate::plan::{ScenarioId, ScenarioSlot};
    use approx::assert_relative_eq;
    use tranche_models::baseline::BaselineInput;
    use tranche_models::instruments::{Coupon, Seniority, Tranche};
    use tranche_models::models::{RegimeDynamics, ShortRateParams, TransitionMatrix};

    fn builder(generator: GeneratorConfig) -> crate::context::SimulationContextBuilder {
        SimulationContext::builder()
            .baseline(BaselineInput {
                revenue: Some(vec![100.0; 3]),
                opex: Some(vec![40.0; 3]),
                taxes: Some(vec![12.0; 3]),
                rcapex: Some(vec![3.0; 3]),
                ..BaselineInput::default()
            })
            .tranches(vec![Tranche::new(
                "senior",
                Seniority::Senior,
                90.0,
                Coupon::Floating { spread: 0.02 },
                3,
            )])
            .generator(generator)
            .short_rate(ShortRateParams {
                initial_rate: 0.03,
                long_run_rate: 0.05,
                mean_reversion: 0.5,
                volatility: 0.0,
            })
    }

    fn context(generator: GeneratorConfig) -> SimulationContext {
        builder(generator).build().unwrap()
    }

    fn slot() -> ScenarioSlot {
        ScenarioSlot {
            id: ScenarioId { group: 0, index: 0 },
            group_count: 1,
            weight: 1.0,
        }
    }

    #[test]
    fn test_deterministic_factors_reproduce_baseline() {
        let ctx = context(GeneratorConfig::default());
        let scenario = ctx.generator().generate(1, &slot());
        let path = PathSimulator::new(&ctx).simulate(&scenario, &ScenarioGroup::base());
        for t in 0..3 {
            assert_relative_eq!(path.cfads[t], ctx.baseline().cfads(t));
            assert_eq!(path.regime[t], Regime::Normal);
        }
        assert_relative_eq!(path.rate[0], 0.04);
        assert_relative_eq!(path.rate[1], 0.045);
    }

    #[test]
    fn test_taxes_scale_with_ebitda() {
        let ctx = context(GeneratorConfig::default());
        let scenario = ctx.generator().generate(1, &slot());
        let group = ScenarioGroup {
            revenue_multiplier: 0.7,
            ..ScenarioGroup::base()
        };
        let path = PathSimulator::new(&ctx).simulate(&scenario, &group);
        // EBITDA 70 - 40 = 30 against a base of 60 halves taxes.
        assert_relative_eq!(path.taxes[0], 6.0, epsilon = 1e-12);
        assert_relative_eq!(path.cfads[0], 70.0 - 40.0 - 6.0 - 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_taxes_floor_at_zero() {
        let ctx = context(GeneratorConfig::default());
        let scenario = ctx.generator().generate(1, &slot());
        let group = ScenarioGroup {
            revenue_multiplier: 0.3,
            ..ScenarioGroup::base()
        };
        let path = PathSimulator::new(&ctx).simulate(&scenario, &group);
        assert_eq!(path.taxes[1], 0.0);
    }

    #[test]
    fn test_cumulative_compounds() {
        let generator = GeneratorConfig {
            factors: vec![FactorSpec {
                factor: RiskFactor::RevenueGrowth,
                marginal: Marginal::LogNormal {
                    mu: None,
                    sigma: 0.2,
                },
                application: ShockApplication::Cumulative,
            }],
            ..GeneratorConfig::default()
        };
        let ctx = context(generator);
        let scenario = ctx.generator().generate(9, &slot());
        let path = PathSimulator::new(&ctx).simulate(&scenario, &ScenarioGroup::base());
        let product = scenario.value(0, 0) * scenario.value(1, 0);
        assert_relative_eq!(path.revenue[1], 100.0 * product, epsilon = 1e-9);
        assert_relative_eq!(path.z_sys[1], scenario.z(1, 0));
    }

    #[test]
    fn test_regime_chain_and_forced_stress() {
        let generator = GeneratorConfig {
            factors: vec![FactorSpec::level(
                RiskFactor::Regime,
                Marginal::Uniform { min: 0.0, max: 1.0 },
            )],
            ..GeneratorConfig::default()
        };
        let ctx = builder(generator)
            .regime(RegimeDynamics::Markov {
                transition: TransitionMatrix([[0.0, 1.0], [0.0, 1.0]]),
            })
            .build()
            .unwrap();
        let scenario = ctx.generator().generate(4, &slot());
        let sim = PathSimulator::new(&ctx);
        // Every row transitions to Stress with certainty.
        let path = sim.simulate(&scenario, &ScenarioGroup::base());
        assert!(path.regime.iter().all(|r| *r == Regime::Stress));

        let forced = sim.simulate(
            &scenario,
            &ScenarioGroup {
                force_stress: true,
                rate_shift: 0.01,
                ..ScenarioGroup::base()
            },
        );
        assert!(forced.regime.iter().all(|r| *r == Regime::Stress));
        assert_relative_eq!(forced.rate[0], 0.05);
    }
}
