//! End-to-end evaluation of a single scenario.
//!
//! [`ScenarioEvaluator`] chains the generator, path simulator, structural
//! default engine and waterfall for one [`ScenarioSlot`]. The result is a
//! pure function of the master seed, the slot and the frozen context.

use crate::context::SimulationContext;
use crate::default_engine::{DefaultOutcome, StructuralDefaultEngine};
use crate::paths::PathSimulator;
use crate::plan::{ScenarioId, ScenarioSlot};
use crate::state::PathState;
use crate::waterfall::WaterfallEngine;
use tranche_models::credit::RecoveryWaterfall;

/// Per-tranche summary of one scenario.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrancheOutcome {
    /// First default period, if the tranche defaulted.
    pub default_period: Option<usize>,
    /// Exposure at default.
    pub exposure: f64,
    /// Loss given default.
    pub lgd: f64,
    /// Arrears outstanding after the final period.
    pub terminal_arrears: f64,
    /// Interest and principal received.
    pub received: f64,
}

/// Everything the aggregator needs from one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioOutcome {
    /// Scenario identity.
    pub id: ScenarioId,
    /// Aggregation weight.
    pub weight: f64,
    /// DSCR per period.
    pub dscr: Vec<Option<f64>>,
    /// Whether any period breached.
    pub breach_any: bool,
    /// Per tranche, in priority order.
    pub tranches: Vec<TrancheOutcome>,
    /// Net equity flow per period.
    pub equity_flows: Vec<f64>,
    /// Sum of equity flows.
    pub terminal_equity: f64,
    /// Numerical anomalies clipped in this scenario.
    pub anomalies: u64,
}

/// Evaluates scenarios against a frozen context.
#[derive(Clone, Copy)]
pub struct ScenarioEvaluator<'a> {
    ctx: &'a SimulationContext,
    recovery: &'a dyn RecoveryWaterfall,
    master_seed: u64,
}

impl<'a> ScenarioEvaluator<'a> {
    /// Evaluator for `ctx` using `recovery` for loss given default.
    pub fn new(
        ctx: &'a SimulationContext,
        recovery: &'a dyn RecoveryWaterfall,
        master_seed: u64,
    ) -> Self {
        Self {
            ctx,
            recovery,
            master_seed,
        }
    }

    /// Context in use.
    #[inline]
    pub fn context(&self) -> &'a SimulationContext {
        self.ctx
    }

    /// Structural default engine for this context, if enabled.
    pub fn default_engine(&self) -> Option<StructuralDefaultEngine<'a>> {
        self.ctx.asset().map(|asset| {
            StructuralDefaultEngine::new(
                self.ctx.structure(),
                asset,
                self.ctx.period_length(),
                self.recovery,
            )
        })
    }

    /// Evaluate one scenario.
    pub fn evaluate(&self, slot: &ScenarioSlot) -> ScenarioOutcome {
        self.run(slot, None)
    }

    /// Evaluate one scenario and return its per-period states.
    pub fn evaluate_states(&self, slot: &ScenarioSlot) -> Vec<PathState> {
        let mut rows = Vec::with_capacity(self.ctx.n_periods());
        self.run(slot, Some(&mut rows));
        rows
    }

    fn run(&self, slot: &ScenarioSlot, states: Option<&mut Vec<PathState>>) -> ScenarioOutcome {
        let ctx = self.ctx;
        let n_k = ctx.structure().len();
        let scenario = ctx.generator().generate(self.master_seed, slot);
        let group = &ctx.groups()[slot.id.group];
        let path = PathSimulator::new(ctx).simulate(&scenario, group);
        let defaults = match self.default_engine() {
            Some(engine) => engine.simulate(&path, &scenario),
            None => DefaultOutcome::performing(ctx.n_periods(), n_k),
        };
        let waterfall = WaterfallEngine::new(ctx).allocate(&path, &defaults, states);

        let tranches = (0..n_k)
            .map(|k| {
                let d = defaults.tranches[k];
                TrancheOutcome {
                    default_period: d.state.default_period(),
                    exposure: d.exposure,
                    lgd: d.lgd,
                    terminal_arrears: waterfall.terminal_arrears[k],
                    received: waterfall.received[k],
                }
            })
            .collect();

        ScenarioOutcome {
            id: slot.id,
            weight: slot.weight,
            breach_any: waterfall.breach_any(),
            terminal_equity: waterfall.terminal_equity(),
            dscr: waterfall.dscr,
            tranches,
            equity_flows: waterfall.equity_flows,
            anomalies: defaults.anomalies,
        }
    }
}
