//! Strict-priority cash waterfall with reserve accounts.
//!
//! Each period:
//!
//! 1. Apply the hedge overlay to CFADS. A negative hedged CFADS is a sponsor
//!    deficit booked straight to equity; it is never allocated.
//! 2. Release the MRA for any maintenance falling due, and return any DSRA
//!    balance above the period's target to available cash. In the final
//!    period both reserves are swept into available cash.
//! 3. In Grace only, draw the DSRA to cover a shortfall against total debt
//!    service due.
//! 4. For each tranche in priority order pay interest (arrears first), then
//!    principal (arrears first). Anything unpaid becomes arrears, without
//!    interest on arrears.
//! 5. Top the DSRA up to its target.
//! 6. Top the MRA up to its target.
//! 7. Pay the residual to equity.
//!
//! Reserve cash reaches equity only through the residual, so equity receives
//! nothing in a period that ends with arrears outstanding.
//!
//! DSCR is hedged CFADS over scheduled debt service; a period without
//! scheduled debt service has no DSCR and cannot breach.

use crate::context::SimulationContext;
use crate::default_engine::DefaultOutcome;
use crate::paths::SimulatedPath;
use crate::state::PathState;
use tranche_models::instruments::{ProjectPhase, ReserveAccount};

/// Arrears and cumulative payments of one tranche.
#[derive(Debug, Clone, Copy, Default)]
struct TrancheLedger {
    interest_arrears: f64,
    principal_arrears: f64,
    received: f64,
}

impl TrancheLedger {
    /// Pay from `cash` in the order interest then principal; returns the amounts paid.
    #[inline]
    fn settle(&mut self, cash: &mut f64, interest_due: f64, principal_due: f64) -> (f64, f64) {
        let interest = interest_due.min(*cash);
        *cash -= interest;
        let principal = principal_due.min(*cash);
        *cash -= principal;
        self.interest_arrears = interest_due - interest;
        self.principal_arrears = principal_due - principal;
        self.received += interest + principal;
        (interest, principal)
    }

    #[inline]
    fn arrears(&self) -> f64 {
        self.interest_arrears + self.principal_arrears
    }
}

/// Summary of one scenario's allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterfallOutcome {
    /// DSCR per period.
    pub dscr: Vec<Option<f64>>,
    /// Breach flag per period.
    pub breach: Vec<bool>,
    /// Net equity flow per period.
    pub equity_flows: Vec<f64>,
    /// Total interest and principal received per tranche.
    pub received: Vec<f64>,
    /// Arrears outstanding per tranche after the final period.
    pub terminal_arrears: Vec<f64>,
}

impl WaterfallOutcome {
    /// Whether any period breached.
    #[inline]
    pub fn breach_any(&self) -> bool {
        self.breach.iter().any(|b| *b)
    }

    /// Sum of equity flows.
    #[inline]
    pub fn terminal_equity(&self) -> f64 {
        self.equity_flows.iter().sum()
    }
}

/// Waterfall engine bound to a context.
#[derive(Debug, Clone, Copy)]
pub struct WaterfallEngine<'a> {
    ctx: &'a SimulationContext,
}

impl<'a> WaterfallEngine<'a> {
    /// Engine for `ctx`.
    pub fn new(ctx: &'a SimulationContext) -> Self {
        Self { ctx }
    }

    /// Allocate one path's cash.
    ///
    /// # Arguments
    ///
    /// * `path` - Simulated CFADS, rates and regimes
    /// * `defaults` - Structural credit outcome, recorded in the states
    /// * `states` - When supplied, receives one [`PathState`] per period
    pub fn allocate(
        &self,
        path: &SimulatedPath,
        defaults: &DefaultOutcome,
        mut states: Option<&mut Vec<PathState>>,
    ) -> WaterfallOutcome {
        let ctx = self.ctx;
        let structure = ctx.structure();
        let n = ctx.n_periods();
        let n_k = structure.len();
        let dt = ctx.period_length();
        let wind_down_from = structure.wind_down_start();
        let covenants = structure.tranches()[structure.senior_index()].covenants;
        let dsra_cfg = ctx.dsra();
        let mra_schedule = ctx.mra();

        let mut dsra = ReserveAccount::new(dsra_cfg.initial_balance);
        let mut mra = ReserveAccount::new(0.0);
        let mut ledgers = vec![TrancheLedger::default(); n_k];
        let mut interest_due = vec![0.0; n_k];
        let mut principal_due = vec![0.0; n_k];

        let mut outcome = WaterfallOutcome {
            dscr: Vec::with_capacity(n),
            breach: Vec::with_capacity(n),
            equity_flows: Vec::with_capacity(n),
            received: vec![0.0; n_k],
            terminal_arrears: vec![0.0; n_k],
        };

        for t in 0..n {
            let phase = ctx.phases().phase_at(t, wind_down_from);
            let rate = path.rate[t];
            let hedge_payout = ctx.hedge().payout(rate) * dt;
            let hedged = path.cfads[t] + hedge_payout;

            let mut equity_flow = hedged.min(0.0);
            let mut cash = hedged.max(0.0);

            let last = t + 1 == n;
            let mut mra_release = mra.withdraw(mra_schedule.release_cost(t));
            if last {
                mra_release += mra.drain();
            }
            cash += mra_release;

            let dsra_target = if phase != ProjectPhase::WoundDown && !last {
                dsra_cfg.target_coverage * structure.scheduled_debt_service(t + 1, rate, dt)
            } else {
                0.0
            };
            let dsra_release = dsra.withdraw(dsra.balance() - dsra_target);
            cash += dsra_release;

            let mut scheduled = 0.0;
            for k in 0..n_k {
                let interest = structure.scheduled_interest(k, t, rate, dt);
                let principal = structure.schedule(k).principal(t);
                scheduled += interest + principal;
                interest_due[k] = ledgers[k].interest_arrears + interest;
                principal_due[k] = ledgers[k].principal_arrears + principal;
            }
            let total_due: f64 = interest_due.iter().chain(&principal_due).sum();

            let dsra_draw = if phase.permits_dsra_draw() && cash < total_due {
                dsra.withdraw(total_due - cash)
            } else {
                0.0
            };
            cash += dsra_draw;

            let recording = states.is_some();
            let mut interest_paid = Vec::with_capacity(if recording { n_k } else { 0 });
            let mut principal_paid = Vec::with_capacity(if recording { n_k } else { 0 });
            for k in 0..n_k {
                let (i, p) = ledgers[k].settle(&mut cash, interest_due[k], principal_due[k]);
                if recording {
                    interest_paid.push(i);
                    principal_paid.push(p);
                }
            }

            let top_up = (dsra_target - dsra.balance()).max(0.0).min(cash);
            dsra.deposit(top_up);
            cash -= top_up;

            if !last {
                let mra_top_up = (mra_schedule.target(t) - mra.balance()).max(0.0).min(cash);
                mra.deposit(mra_top_up);
                cash -= mra_top_up;
            }

            equity_flow += cash;

            let dscr = (scheduled > 0.0).then(|| hedged / scheduled);
            let breach = dscr.is_some_and(|d| d < covenants.threshold(phase));

            outcome.dscr.push(dscr);
            outcome.breach.push(breach);
            outcome.equity_flows.push(equity_flow);

            if let Some(rows) = states.as_deref_mut() {
                rows.push(PathState {
                    period: t,
                    phase,
                    regime: path.regime[t],
                    short_rate: rate,
                    revenue: path.revenue[t],
                    opex: path.opex[t],
                    cfads: path.cfads[t],
                    hedge_payout,
                    cfads_hedged: hedged,
                    scheduled_debt_service: scheduled,
                    debt_service_due: interest_due
                        .iter()
                        .zip(&principal_due)
                        .map(|(i, p)| i + p)
                        .collect(),
                    interest_due: interest_due.clone(),
                    interest_paid,
                    principal_paid,
                    arrears: ledgers.iter().map(TrancheLedger::arrears).collect(),
                    dscr,
                    breach,
                    defaulted: (0..n_k).map(|k| defaults.is_defaulted_at(t, k)).collect(),
                    asset_values: (0..n_k).map(|k| defaults.asset_value(t, k)).collect(),
                    dsra_draw,
                    dsra_release,
                    dsra_balance: dsra.balance(),
                    mra_release,
                    mra_balance: mra.balance(),
                    equity_flow,
                });
            }
        }

        for (k, ledger) in ledgers.iter().enumerate() {
            outcome.received[k] = ledger.received;
            outcome.terminal_arrears[k] = ledger.arrears();
        }
        outcome
    }
}
