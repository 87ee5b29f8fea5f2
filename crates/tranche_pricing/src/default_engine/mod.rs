//! Regime-switching structural default engine.
//!
//! Each tranche carries a latent log asset value advanced by
//! [`AssetValueParams::log_step`] using the path's regime and systematic
//! shock plus the scenario's idiosyncratic draw for that tranche. A tranche
//! defaults in the first period its asset value falls below
//! `barrier_ratio × scheduled outstanding at or above its rank`; the
//! [`CreditState`] transition makes that absorbing.
//!
//! # Numerical anomalies
//!
//! A non-finite log value is replaced by the previous period's value and a
//! value outside `ln(V0) ± 50` is clamped. Each such event is counted in
//! [`DefaultOutcome::anomalies`]; none aborts the scenario.

use crate::generator::Scenario;
use crate::paths::SimulatedPath;
use serde::{Deserialize, Serialize};
use tranche_core::math::distributions::norm_cdf;
use tranche_models::credit::{
    black_cox_pd, merton_distance_to_default, AssetValueParams, CreditState, RecoveryContext,
    RecoveryWaterfall,
};
use tranche_models::instruments::CapitalStructure;

/// Half-width of the admissible band around `ln(V0)`.
pub const LOG_VALUE_BAND: f64 = 50.0;

/// Credit outcome of one tranche in one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrancheDefault {
    /// Final credit state.
    pub state: CreditState,
    /// Exposure at default; zero if performing.
    pub exposure: f64,
    /// Loss given default; zero if performing.
    pub lgd: f64,
}

/// Credit outcome of every tranche in one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultOutcome {
    /// Per tranche, in priority order.
    pub tranches: Vec<TrancheDefault>,
    /// Asset value per period and tranche, period-major.
    pub asset_values: Vec<f64>,
    /// Clipped or replaced values.
    pub anomalies: u64,
    n_tranches: usize,
}

impl DefaultOutcome {
    /// Outcome with no credit model: every tranche performs.
    pub fn performing(n_periods: usize, n_tranches: usize) -> Self {
        Self {
            tranches: vec![TrancheDefault::default(); n_tranches],
            asset_values: vec![f64::NAN; n_periods * n_tranches],
            anomalies: 0,
            n_tranches,
        }
    }

    /// Asset value of tranche `k` at the end of period `t`.
    #[inline]
    pub fn asset_value(&self, t: usize, k: usize) -> f64 {
        self.asset_values[t * self.n_tranches + k]
    }

    /// Whether tranche `k` is in default at the end of period `t`.
    #[inline]
    pub fn is_defaulted_at(&self, t: usize, k: usize) -> bool {
        self.tranches[k].state.default_period().is_some_and(|p| p <= t)
    }
}

/// Closed-form cross-check for one tranche.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyticDefault {
    /// Black–Cox first-passage PD over the full horizon.
    pub black_cox_pd: f64,
    /// Merton distance to default at the horizon.
    pub merton_distance: f64,
    /// Merton at-horizon PD, `Φ(−DD)`.
    pub merton_pd: f64,
}

/// Structural default engine bound to a capital structure.
pub struct StructuralDefaultEngine<'a> {
    structure: &'a CapitalStructure,
    asset: &'a AssetValueParams,
    dt: f64,
    recovery: &'a dyn RecoveryWaterfall,
}

impl<'a> StructuralDefaultEngine<'a> {
    /// Engine for `structure` with periods of `dt` years.
    pub fn new(
        structure: &'a CapitalStructure,
        asset: &'a AssetValueParams,
        dt: f64,
        recovery: &'a dyn RecoveryWaterfall,
    ) -> Self {
        Self {
            structure,
            asset,
            dt,
            recovery,
        }
    }

    /// Log default barrier of tranche `k` for period `t`, or `None` when the
    /// tranche has nothing outstanding.
    #[inline]
    pub fn log_barrier(&self, k: usize, t: usize) -> Option<f64> {
        if self.structure.schedule(k).outstanding_begin(t) <= 0.0 {
            return None;
        }
        let barrier = self.asset.barrier_ratio * self.structure.outstanding_at_or_above(k, t);
        (barrier > 0.0).then(|| barrier.ln())
    }

    /// Simulate every tranche's asset value over the path.
    pub fn simulate(&self, path: &SimulatedPath, scenario: &Scenario) -> DefaultOutcome {
        let n_k = self.structure.len();
        let n_p = path.n_periods();
        let x0 = self.asset.initial_value.ln();
        let (lo, hi) = (x0 - LOG_VALUE_BAND, x0 + LOG_VALUE_BAND);

        let mut outcome = DefaultOutcome::performing(n_p, n_k);
        let mut x = vec![x0; n_k];

        for t in 0..n_p {
            for k in 0..n_k {
                let mut next =
                    self.asset
                        .log_step(x[k], path.regime[t], self.dt, path.z_sys[t], scenario.idio(t, k));
                if !next.is_finite() {
                    next = x[k];
                    outcome.anomalies += 1;
                }
                if next < lo || next > hi {
                    next = next.clamp(lo, hi);
                    outcome.anomalies += 1;
                }
                x[k] = next;
                outcome.asset_values[t * n_k + k] = next.exp();

                let state = &mut outcome.tranches[k];
                let was_defaulted = state.state.is_defaulted();
                state.state = state.state.advance(t, next, self.log_barrier(k, t));
                if !was_defaulted && state.state.is_defaulted() {
                    let ctx = RecoveryContext {
                        tranche: k,
                        period: t,
                        asset_value: next.exp(),
                        exposure: self.structure.schedule(k).outstanding_begin(t),
                        claims_ahead: self.structure.claims_ahead(k, t),
                        pari_passu_claims: self.structure.pari_passu_claims(k, t),
                    };
                    state.exposure = ctx.exposure;
                    state.lgd = self.recovery.loss_given_default(&ctx);
                }
            }
        }

        outcome
    }

    /// Closed-form default probabilities per tranche, using Normal-regime
    /// dynamics, the barrier at close and the full horizon.
    pub fn analytic(&self) -> Vec<AnalyticDefault> {
        let horizon = self.structure.n_periods() as f64 * self.dt;
        let v0 = self.asset.initial_value;
        let normal = self.asset.normal;
        (0..self.structure.len())
            .map(|k| {
                let rank = self.structure.tranches()[k].seniority;
                let at_or_above: f64 = self
                    .structure
                    .tranches()
                    .iter()
                    .filter(|t| t.seniority <= rank)
                    .map(|t| t.principal)
                    .sum();
                let barrier = self.asset.barrier_ratio * at_or_above;
                let dd = merton_distance_to_default(v0, barrier, normal.drift, normal.volatility, horizon);
                AnalyticDefault {
                    black_cox_pd: black_cox_pd(v0, barrier, normal.drift, normal.volatility, horizon),
                    merton_distance: dd,
                    merton_pd: norm_cdf(-dd),
                }
            })
            .collect()
    }
}
