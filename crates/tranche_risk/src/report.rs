//! Hedge and structure comparison report.
//!
//! Runs a grid of hedge overlays × capital structures with common random
//! numbers and exports the breach statistics of every cell, a risk section
//! for the first cell, and optionally a Pareto frontier, as JSON:
//!
//! ```text
//! {
//!   "breach_statistics": { "<hedge mode>": { "<structure>": { "breach_probability", "dscr_percentiles" } } },
//!   "risk": { "tranches": [ { "name", "pd", "lgd", "expected_loss" } ], "dscr_percentiles": { "p5": [...], ... } },
//!   "pareto_frontier": [ [risk, return, cost], ... ]
//! }
//! ```

use crate::config::RunConfig;
use crate::engine::{run_context, RunControl};
use crate::error::RunError;
use crate::result::{AggregateResult, DscrPercentiles, FrontierPoint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tranche_core::market_data::{DiscountCurve, FlatCurve};
use tranche_core::types::ConfigError;
use tranche_models::instruments::{CapitalStructure, HedgeOverlay, Tranche};

/// A named capital structure to compare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureVariant {
    /// Report key, e.g. `traditional` or `tokenized`.
    pub name: String,
    /// Tranches of this structure.
    pub tranches: Vec<Tranche>,
    /// Equity at close; the configured amount when absent.
    #[serde(default)]
    pub equity_investment: Option<f64>,
}

/// The three standard overlays: unhedged, cap, and collar.
pub fn standard_hedges(cap_strike: f64, floor_strike: f64, notional: f64) -> [HedgeOverlay; 3] {
    [
        HedgeOverlay::Unhedged,
        HedgeOverlay::Cap {
            strike: cap_strike,
            notional,
        },
        HedgeOverlay::Collar {
            cap_strike,
            floor_strike,
            notional,
        },
    ]
}

/// Breach statistics of one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreachStatistics {
    /// Weighted fraction of scenarios with at least one breach.
    pub breach_probability: f64,
    /// Period-indexed DSCR percentiles.
    pub dscr_percentiles: DscrPercentiles,
}

/// Credit summary of one tranche.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheRiskSummary {
    /// Tranche name.
    pub name: String,
    /// Probability of default.
    pub pd: f64,
    /// Loss given default.
    pub lgd: Option<f64>,
    /// Expected loss.
    pub expected_loss: f64,
}

/// Risk section of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSection {
    /// Hedge mode of the cell summarised.
    pub hedge: String,
    /// Structure of the cell summarised.
    pub structure: String,
    /// Per-tranche PD, LGD and EL.
    pub tranches: Vec<TrancheRiskSummary>,
    /// Period-indexed DSCR percentiles.
    pub dscr_percentiles: DscrPercentiles,
}

/// Comparison across hedge modes and structures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Master seed shared by every cell.
    pub seed: u64,
    /// Scenarios per cell.
    pub scenario_count: usize,
    /// `breach_statistics[hedge mode][structure]`.
    pub breach_statistics: BTreeMap<String, BTreeMap<String, BreachStatistics>>,
    /// Detail for the first hedge and first structure.
    pub risk: RiskSection,
    /// Non-dominated `(risk, return, cost)` points.
    #[serde(default)]
    pub pareto_frontier: Vec<(f64, f64, f64)>,
}

impl ComparisonReport {
    /// Run every `hedges × structures` cell.
    ///
    /// An empty `hedges` slice compares only the configured hedge; an empty
    /// `structures` slice compares only the configured tranches under the
    /// name `configured`.
    ///
    /// # Errors
    ///
    /// * `RunError::Config` - invalid configuration, structure or hedge, or a
    ///   repeated hedge mode or structure name
    /// * any error from the underlying runs
    pub fn build(
        seed: u64,
        scenario_count: usize,
        config: &RunConfig,
        hedges: &[HedgeOverlay],
        structures: &[StructureVariant],
    ) -> Result<Self, RunError> {
        config.validate()?;
        let base = config.context()?;

        let hedges: Vec<HedgeOverlay> = if hedges.is_empty() {
            vec![config.hedge]
        } else {
            hedges.to_vec()
        };
        let structures: Vec<StructureVariant> = if structures.is_empty() {
            vec![StructureVariant {
                name: "configured".to_string(),
                tranches: config.tranches.clone(),
                equity_investment: None,
            }]
        } else {
            structures.to_vec()
        };
        for (i, h) in hedges.iter().enumerate() {
            if hedges[..i].iter().any(|p| p.mode() == h.mode()) {
                return Err(ConfigError::invalid("hedges", format!("repeated mode {}", h.mode().as_str())).into());
            }
        }
        for (i, s) in structures.iter().enumerate() {
            if structures[..i].iter().any(|p| p.name == s.name) {
                return Err(ConfigError::invalid("structures", format!("repeated name {}", s.name)).into());
            }
        }

        let flat = config.discount_rate.map(FlatCurve::new);
        let curve = flat.as_ref().map(|c| c as &dyn DiscountCurve);
        let control = RunControl::default();

        let mut breach_statistics: BTreeMap<String, BTreeMap<String, BreachStatistics>> =
            BTreeMap::new();
        let mut first: Option<(String, String, AggregateResult)> = None;

        for variant in &structures {
            let equity = variant
                .equity_investment
                .unwrap_or(config.equity_investment);
            let structure =
                CapitalStructure::new(variant.tranches.clone(), equity, base.n_periods())?;
            let structured = base.with_structure(structure)?;

            for hedge in &hedges {
                let ctx = structured.with_hedge(*hedge)?;
                let result = run_context(
                    seed,
                    scenario_count,
                    &ctx,
                    &config.execution,
                    &control,
                    &config.recovery,
                    curve,
                )?;
                let mode = hedge.mode().as_str().to_string();
                tracing::debug!(
                    hedge = %mode,
                    structure = %variant.name,
                    breach_probability = result.breach_probability,
                    "comparison cell complete"
                );
                breach_statistics.entry(mode.clone()).or_default().insert(
                    variant.name.clone(),
                    BreachStatistics {
                        breach_probability: result.breach_probability,
                        dscr_percentiles: result.dscr_percentiles(),
                    },
                );
                if first.is_none() {
                    first = Some((mode, variant.name.clone(), result));
                }
            }
        }

        let (hedge, structure, result) =
            first.ok_or_else(|| ConfigError::invalid("structures", "comparison grid is empty"))?;
        let risk = RiskSection {
            hedge,
            structure,
            dscr_percentiles: result.dscr_percentiles(),
            tranches: result
                .tranches
                .iter()
                .map(|t| TrancheRiskSummary {
                    name: t.name.clone(),
                    pd: t.pd,
                    lgd: t.lgd,
                    expected_loss: t.expected_loss,
                })
                .collect(),
        };

        Ok(Self {
            seed,
            scenario_count,
            breach_statistics,
            risk,
            pareto_frontier: Vec::new(),
        })
    }

    /// Attach a Pareto frontier.
    pub fn with_frontier(mut self, points: &[FrontierPoint]) -> Self {
        self.pareto_frontier = points.iter().map(|p| (p.risk, p.ret, p.cost)).collect();
        self
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
