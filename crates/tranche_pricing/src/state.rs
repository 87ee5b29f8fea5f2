//! Per-period path state.
//!
//! A [`PathState`] row is the complete record of one period of one
//! scenario. Rows are produced only for diagnostics
//! ([`ScenarioEvaluator::evaluate_states`](crate::ScenarioEvaluator::evaluate_states));
//! the aggregation path keeps just the summary in
//! [`ScenarioOutcome`](crate::ScenarioOutcome).

use serde::{Deserialize, Serialize};
use tranche_models::instruments::ProjectPhase;
use tranche_models::models::Regime;

/// One period of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathState {
    /// Period index.
    pub period: usize,
    /// Project phase.
    pub phase: ProjectPhase,
    /// Economic regime.
    pub regime: Regime,
    /// Short rate.
    pub short_rate: f64,
    /// Revenue.
    pub revenue: f64,
    /// Operating expenditure.
    pub opex: f64,
    /// CFADS before the hedge.
    pub cfads: f64,
    /// Hedge payout for the period.
    pub hedge_payout: f64,
    /// CFADS after the hedge.
    pub cfads_hedged: f64,
    /// Scheduled debt service across tranches.
    pub scheduled_debt_service: f64,
    /// Debt service due per tranche, arrears included.
    pub debt_service_due: Vec<f64>,
    /// Interest due per tranche, arrears included.
    pub interest_due: Vec<f64>,
    /// Interest paid per tranche.
    pub interest_paid: Vec<f64>,
    /// Principal paid per tranche.
    pub principal_paid: Vec<f64>,
    /// Outstanding arrears per tranche after allocation.
    pub arrears: Vec<f64>,
    /// Debt service coverage ratio; `None` without scheduled debt service.
    pub dscr: Option<f64>,
    /// Whether DSCR fell below the phase's covenant threshold.
    pub breach: bool,
    /// Structural default flag per tranche.
    pub defaulted: Vec<bool>,
    /// Latent asset value per tranche; NaN when structural default is off.
    pub asset_values: Vec<f64>,
    /// DSRA draw used for debt service.
    pub dsra_draw: f64,
    /// DSRA balance above target returned to available cash, including the
    /// final-period sweep.
    pub dsra_release: f64,
    /// DSRA balance at period end.
    pub dsra_balance: f64,
    /// MRA release for maintenance, plus the final-period sweep.
    pub mra_release: f64,
    /// MRA balance at period end.
    pub mra_balance: f64,
    /// Net flow to equity (negative for a sponsor deficit).
    pub equity_flow: f64,
}
