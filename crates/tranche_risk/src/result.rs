//! The result of a run.
//!
//! [`AggregateResult`] is the only artifact that survives a run. It is built
//! once from the merged [`RiskAccumulator`] after the scenario loop, which is
//! also where discounting and the equity IRR are computed.

use crate::aggregator::RiskAccumulator;
use serde::{Deserialize, Serialize};
use tranche_core::market_data::DiscountCurve;
use tranche_core::math::solvers::{BrentSolver, SolverConfig};
use tranche_pricing::default_engine::AnalyticDefault;
use tranche_pricing::SimulationContext;

/// DSCR percentiles for one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DscrBand {
    /// Period index.
    pub period: usize,
    /// Scenarios with a DSCR in this period.
    pub samples: u64,
    /// 5th percentile.
    pub p5: Option<f64>,
    /// 25th percentile.
    pub p25: Option<f64>,
    /// Median.
    pub p50: Option<f64>,
    /// 75th percentile.
    pub p75: Option<f64>,
    /// 95th percentile.
    pub p95: Option<f64>,
}

/// Period-indexed DSCR percentile arrays.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DscrPercentiles {
    /// 5th percentile per period.
    pub p5: Vec<Option<f64>>,
    /// 25th percentile per period.
    pub p25: Vec<Option<f64>>,
    /// Median per period.
    pub p50: Vec<Option<f64>>,
    /// 75th percentile per period.
    pub p75: Vec<Option<f64>>,
    /// 95th percentile per period.
    pub p95: Vec<Option<f64>>,
}

/// Credit statistics for one tranche.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheRisk {
    /// Tranche name.
    pub name: String,
    /// Initial principal.
    pub principal: f64,
    /// Probability of structural default within the horizon.
    pub pd: f64,
    /// Mean loss given default; `None` if the tranche never defaulted.
    pub lgd: Option<f64>,
    /// Mean exposure at default; `None` if the tranche never defaulted.
    pub mean_ead: Option<f64>,
    /// `PD × LGD × principal`.
    pub expected_loss: f64,
    /// Mean unpaid arrears after the final period.
    pub mean_terminal_arrears: f64,
    /// Mean interest and principal received.
    pub mean_received: f64,
    /// Black–Cox PD under Normal-regime dynamics.
    pub analytic_pd: Option<f64>,
    /// Merton distance to default at the horizon.
    pub merton_distance: Option<f64>,
    /// `pd − analytic_pd`.
    pub divergence: Option<f64>,
    /// Whether `|divergence|` exceeded the configured tolerance.
    pub miscalibrated: bool,
}

/// Equity return and tail statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityRisk {
    /// Equity invested at close.
    pub investment: f64,
    /// Mean sum of equity flows.
    pub mean_terminal_value: f64,
    /// Mean equity flow per period.
    pub mean_flows: Vec<f64>,
    /// Confidence level of the tail measures.
    pub confidence: f64,
    /// Value at risk of `investment − terminal value`.
    pub var: Option<f64>,
    /// Conditional value at risk of the same loss.
    pub cvar: Option<f64>,
    /// Annualised IRR of `−investment` followed by the mean flows.
    pub irr: Option<f64>,
    /// Present value of the mean flows, when a discount curve was supplied.
    pub present_value: Option<f64>,
}

/// One non-dominated structure: `(risk, return, cost)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    /// Risk metric (lower is better).
    pub risk: f64,
    /// Return metric (higher is better).
    #[serde(rename = "return")]
    pub ret: f64,
    /// Cost of debt (lower is better).
    pub cost: f64,
}

/// Summary statistics of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Master seed.
    pub seed: u64,
    /// Scenarios requested.
    pub scenarios_requested: usize,
    /// Scenarios actually evaluated.
    pub scenarios_evaluated: u64,
    /// Whether the run was cancelled part-way.
    pub cancelled: bool,
    /// Weighted fraction of scenarios with at least one covenant breach.
    pub breach_probability: f64,
    /// Per-period DSCR percentiles.
    pub dscr_bands: Vec<DscrBand>,
    /// Per-tranche credit statistics, in priority order.
    pub tranches: Vec<TrancheRisk>,
    /// Equity statistics.
    pub equity: EquityRisk,
    /// Numerical anomalies clipped during the run.
    pub anomalies: u64,
    /// Non-fatal conditions worth a reader's attention.
    pub warnings: Vec<String>,
    /// Pareto frontier, when the run was part of a structure search.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pareto_frontier: Vec<FrontierPoint>,
}

impl AggregateResult {
    /// Period-indexed percentile arrays.
    pub fn dscr_percentiles(&self) -> DscrPercentiles {
        let pick = |f: fn(&DscrBand) -> Option<f64>| -> Vec<Option<f64>> {
            self.dscr_bands.iter().map(f).collect()
        };
        DscrPercentiles {
            p5: pick(|b| b.p5),
            p25: pick(|b| b.p25),
            p50: pick(|b| b.p50),
            p75: pick(|b| b.p75),
            p95: pick(|b| b.p95),
        }
    }

    /// Serialise to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error, which cannot occur for finite data.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Annualised IRR of `flows[0]` at time zero and `flows[i]` at
/// `i × period_length` years.
///
/// Returns `None` when the flows do not change sign or the root finder
/// fails to bracket a solution.
///
/// # Examples
/// ```
/// use tranche_risk::result::irr;
///
/// let r = irr(&[-100.0, 10.0, 110.0], 1.0).unwrap();
/// assert!((r - 0.10).abs() < 1e-9);
/// ```
pub fn irr(flows: &[f64], period_length: f64) -> Option<f64> {
    let has_negative = flows.iter().any(|&f| f < 0.0);
    let has_positive = flows.iter().any(|&f| f > 0.0);
    if !has_negative || !has_positive {
        return None;
    }
    let npv = |r: f64| -> f64 {
        let base = 1.0 + r;
        flows
            .iter()
            .enumerate()
            .map(|(i, f)| f / base.powf(i as f64 * period_length))
            .sum()
    };
    let solver = BrentSolver::new(SolverConfig::for_rates());
    solver.find_root_expanding(npv, -0.5, 0.5, -0.99).ok()
}

/// Everything known after the loop that the result needs besides the
/// accumulator.
pub(crate) struct ResultInputs<'a> {
    pub seed: u64,
    pub scenarios_requested: usize,
    pub cancelled: bool,
    pub confidence: f64,
    pub analytic: Option<Vec<AnalyticDefault>>,
    pub curve: Option<&'a dyn DiscountCurve>,
    pub warnings: Vec<String>,
}

impl AggregateResult {
    pub(crate) fn assemble(
        ctx: &SimulationContext,
        acc: &RiskAccumulator,
        inputs: ResultInputs<'_>,
    ) -> Self {
        let ResultInputs {
            seed,
            scenarios_requested,
            cancelled,
            confidence,
            analytic,
            curve,
            mut warnings,
        } = inputs;

        let dscr_bands = acc
            .dscr_percentiles()
            .into_iter()
            .enumerate()
            .map(|(period, (b, samples))| DscrBand {
                period,
                samples,
                p5: b[0],
                p25: b[1],
                p50: b[2],
                p75: b[3],
                p95: b[4],
            })
            .collect();

        let tolerance = ctx.asset().map(|a| a.divergence_tolerance);
        let tranches = ctx
            .structure()
            .tranches()
            .iter()
            .zip(acc.tranche_totals())
            .enumerate()
            .map(|(k, (tranche, totals))| {
                let pd = acc.ratio(totals.default_weight);
                let (lgd, mean_ead) = if totals.default_weight > 0.0 {
                    (
                        Some(totals.lgd_weighted / totals.default_weight),
                        Some(totals.ead_weighted / totals.default_weight),
                    )
                } else {
                    (None, None)
                };
                let a = analytic.as_ref().map(|v| v[k]);
                let divergence = a.map(|a| pd - a.black_cox_pd);
                let miscalibrated = match (divergence, tolerance) {
                    (Some(d), Some(tol)) => d.abs() > tol,
                    _ => false,
                };
                if miscalibrated {
                    tracing::warn!(
                        tranche = %tranche.name,
                        simulated_pd = pd,
                        analytic_pd = ?a.map(|a| a.black_cox_pd),
                        "structural default calibration diverges from closed form"
                    );
                    warnings.push(format!(
                        "tranche {}: simulated PD {:.4} diverges from analytic PD {:.4}",
                        tranche.name,
                        pd,
                        a.map_or(f64::NAN, |a| a.black_cox_pd)
                    ));
                }
                TrancheRisk {
                    name: tranche.name.clone(),
                    principal: tranche.principal,
                    pd,
                    lgd,
                    mean_ead,
                    expected_loss: pd * lgd.unwrap_or(0.0) * tranche.principal,
                    mean_terminal_arrears: acc.ratio(totals.arrears_weighted),
                    mean_received: acc.ratio(totals.received_weighted),
                    analytic_pd: a.map(|a| a.black_cox_pd),
                    merton_distance: a.map(|a| a.merton_distance),
                    divergence,
                    miscalibrated,
                }
            })
            .collect();

        let investment = ctx.structure().equity_investment();
        let mean_flows = acc.mean_equity_flows();
        let period_length = ctx.period_length();
        let irr = if investment > 0.0 {
            let mut flows = Vec::with_capacity(mean_flows.len() + 1);
            flows.push(-investment);
            flows.extend_from_slice(&mean_flows);
            irr(&flows, period_length)
        } else {
            None
        };
        let present_value = curve.and_then(|c| match c.present_value(&mean_flows, period_length) {
            Ok(pv) => Some(pv),
            Err(e) => {
                tracing::warn!(error = %e, "present value of equity flows unavailable");
                warnings.push(format!("equity present value unavailable: {}", e));
                None
            }
        });
        let tail = acc.loss_tail(confidence);

        AggregateResult {
            seed,
            scenarios_requested,
            scenarios_evaluated: acc.scenarios(),
            cancelled,
            breach_probability: acc.breach_probability(),
            dscr_bands,
            tranches,
            equity: EquityRisk {
                investment,
                mean_terminal_value: acc.mean_terminal_equity(),
                mean_flows,
                confidence,
                var: tail.map(|t| t.0),
                cvar: tail.map(|t| t.1),
                irr,
                present_value,
            },
            anomalies: acc.anomalies(),
            warnings,
            pareto_frontier: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_irr_annual() {
        let r = irr(&[-100.0, 60.0, 60.0], 1.0).unwrap();
        // 60/(1+r) + 60/(1+r)^2 = 100
        let npv = -100.0 + 60.0 / (1.0 + r) + 60.0 / (1.0 + r).powi(2);
        assert_relative_eq!(npv, 0.0, epsilon = 1e-8);
        assert!(r > 0.12 && r < 0.14);
    }

    #[test]
    fn test_irr_semiannual_is_annualised() {
        // 5% per half-year is 10.25% a year.
        let r = irr(&[-100.0, 5.0, 105.0], 0.5).unwrap();
        assert_relative_eq!(r, 0.1025, epsilon = 1e-8);
    }

    #[test]
    fn test_irr_negative_return() {
        let r = irr(&[-100.0, 30.0, 30.0], 1.0).unwrap();
        assert!(r < 0.0);
    }

    #[test]
    fn test_irr_without_sign_change() {
        assert_eq!(irr(&[-100.0, -5.0], 1.0), None);
        assert_eq!(irr(&[0.0, 5.0], 1.0), None);
    }

    #[test]
    fn test_dscr_percentile_arrays() {
        let band = |period, p50| DscrBand {
            period,
            samples: 10,
            p5: Some(1.0),
            p25: Some(1.1),
            p50,
            p75: Some(1.3),
            p95: Some(1.4),
        };
        let result = AggregateResult {
            seed: 1,
            scenarios_requested: 10,
            scenarios_evaluated: 10,
            cancelled: false,
            breach_probability: 0.1,
            dscr_bands: vec![band(0, Some(1.2)), band(1, None)],
            tranches: Vec::new(),
            equity: EquityRisk {
                investment: 0.0,
                mean_terminal_value: 0.0,
                mean_flows: Vec::new(),
                confidence: 0.95,
                var: None,
                cvar: None,
                irr: None,
                present_value: None,
            },
            anomalies: 0,
            warnings: Vec::new(),
            pareto_frontier: Vec::new(),
        };
        let arrays = result.dscr_percentiles();
        assert_eq!(arrays.p50, vec![Some(1.2), None]);
        assert_eq!(arrays.p5, vec![Some(1.0), Some(1.0)]);

        let json = result.to_json().unwrap();
        assert!(!json.contains("pareto_frontier"));
        let back: AggregateResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
