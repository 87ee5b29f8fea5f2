//! Structure search.
//!
//! Every candidate reallocates the configured total debt across the same
//! tranches and re-runs the full pipeline with the same seed, so candidates
//! are compared on common random numbers. Candidates run in parallel; each
//! candidate's own batches nest in the same rayon pool.

use crate::candidates::SearchSpace;
use crate::cost::CostOfDebt;
use crate::error::OptimiserError;
use crate::pareto::pareto_frontier;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tranche_risk::{
    run_context, AggregateResult, ExecutionConfig, FrontierPoint, RunConfig, RunControl, RunError,
};

/// Return assigned to a candidate whose equity IRR does not exist.
pub const NO_IRR_RETURN: f64 = -1.0;

/// Which statistic is minimised as risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskMetric {
    /// Equity loss CVaR at the configured tail confidence.
    #[default]
    Cvar,
    /// Probability of at least one covenant breach.
    BreachProbability,
}

impl RiskMetric {
    /// Read the metric from a run result.
    ///
    /// A missing CVaR counts as infinite risk.
    pub fn measure(self, result: &AggregateResult) -> f64 {
        match self {
            RiskMetric::Cvar => result.equity.cvar.unwrap_or(f64::INFINITY),
            RiskMetric::BreachProbability => result.breach_probability,
        }
    }
}

/// Search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimiserConfig {
    /// Master seed shared by every candidate.
    pub seed: u64,
    /// Scenarios per candidate.
    pub scenario_count: usize,
    /// Risk objective.
    #[serde(default)]
    pub risk_metric: RiskMetric,
    /// Candidate weights.
    pub space: SearchSpace,
}

/// One evaluated structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureCandidate {
    /// Position in the enumerated search space.
    pub index: usize,
    /// Tranche weights in priority order.
    pub weights: Vec<f64>,
    /// Resulting principals in priority order.
    pub principals: Vec<f64>,
    /// Risk objective.
    pub risk: f64,
    /// Return objective: equity IRR, or [`NO_IRR_RETURN`].
    #[serde(rename = "return")]
    pub ret: f64,
    /// Cost objective.
    pub cost: f64,
    /// Equity IRR, if it exists.
    pub irr: Option<f64>,
    /// Breach probability of the candidate run.
    pub breach_probability: f64,
    /// Equity loss CVaR of the candidate run.
    pub equity_cvar: Option<f64>,
}

impl StructureCandidate {
    /// The `(risk, return, cost)` triple.
    #[inline]
    pub fn point(&self) -> FrontierPoint {
        FrontierPoint {
            risk: self.risk,
            ret: self.ret,
            cost: self.cost,
        }
    }
}

/// Evaluated candidates and their Pareto frontier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimisationResult {
    /// Risk objective used.
    pub risk_metric: RiskMetric,
    /// Every candidate, in search-space order.
    pub candidates: Vec<StructureCandidate>,
    /// Indices into `candidates` of the frontier, in frontier order.
    pub frontier: Vec<usize>,
}

impl OptimisationResult {
    /// Frontier candidates in frontier order.
    pub fn frontier_candidates(&self) -> impl Iterator<Item = &StructureCandidate> + '_ {
        self.frontier.iter().map(move |&i| &self.candidates[i])
    }

    /// Frontier `(risk, return, cost)` points in frontier order.
    pub fn frontier_points(&self) -> Vec<FrontierPoint> {
        self.frontier_candidates().map(StructureCandidate::point).collect()
    }

    /// `result` with the frontier attached.
    pub fn attach_frontier(&self, mut result: AggregateResult) -> AggregateResult {
        result.pareto_frontier = self.frontier_points();
        result
    }
}

/// Evaluate every candidate in `settings.space` and build the frontier.
///
/// # Errors
///
/// * `OptimiserError::EmptySearchSpace` - no candidate satisfies the constraints
/// * `OptimiserError::Run` - invalid configuration or a failed candidate run
///
/// # Examples
///
/// ```rust
/// use tranche_models::baseline::BaselineInput;
/// use tranche_models::instruments::{Coupon, Seniority, Tranche};
/// use tranche_optimiser::candidates::SearchSpace;
/// use tranche_optimiser::cost::WeightedCouponCost;
/// use tranche_optimiser::{optimise, OptimiserConfig, RiskMetric};
/// use tranche_risk::RunConfig;
///
/// let mut config = RunConfig::new(
///     BaselineInput {
///         revenue: Some(vec![100.0; 4]),
///         opex: Some(vec![40.0; 4]),
///         ..BaselineInput::default()
///     },
///     vec![
///         Tranche::new("senior", Seniority::Senior, 100.0, Coupon::Fixed { rate: 0.05 }, 4),
///         Tranche::new("junior", Seniority::Subordinated, 40.0, Coupon::Fixed { rate: 0.10 }, 4),
///     ],
/// );
/// config.equity_investment = 40.0;
///
/// let settings = OptimiserConfig {
///     seed: 1,
///     scenario_count: 64,
///     risk_metric: RiskMetric::BreachProbability,
///     space: SearchSpace::simplex_grid(0.25),
/// };
/// let result = optimise(&config, &settings, &WeightedCouponCost::default()).unwrap();
/// assert_eq!(result.candidates.len(), 5);
/// assert!(!result.frontier.is_empty());
/// ```
pub fn optimise(
    config: &RunConfig,
    settings: &OptimiserConfig,
    cost: &dyn CostOfDebt,
) -> Result<OptimisationResult, OptimiserError> {
    optimise_with(config, settings, cost, &RunControl::default())
}

/// [`optimise`] with cancellation and progress hooks shared by every
/// candidate run.
///
/// # Errors
///
/// See [`optimise`]. A cancellation that stops a candidate before any of its
/// batches completes surfaces as `RunError::Cancelled`.
#[tracing::instrument(level = "info", skip_all, fields(seed = settings.seed, scenarios = settings.scenario_count))]
pub fn optimise_with(
    config: &RunConfig,
    settings: &OptimiserConfig,
    cost: &dyn CostOfDebt,
    control: &RunControl,
) -> Result<OptimisationResult, OptimiserError> {
    config.validate()?;
    if settings.scenario_count == 0 {
        return Err(RunError::InvalidScenarioCount.into());
    }
    let base = config.context()?;
    let weights = settings.space.enumerate(base.structure().len())?;
    let started = Instant::now();
    tracing::info!(candidates = weights.len(), metric = ?settings.risk_metric, "structure search started");

    // Candidate runs share the outer pool.
    let inner = ExecutionConfig {
        workers: None,
        ..config.execution
    };

    let evaluate = || -> Result<Vec<StructureCandidate>, OptimiserError> {
        weights
            .par_iter()
            .enumerate()
            .map(|(index, w)| -> Result<StructureCandidate, OptimiserError> {
                let ctx = base.with_weights(w).map_err(RunError::from)?;
                let result = run_context(
                    settings.seed,
                    settings.scenario_count,
                    &ctx,
                    &inner,
                    control,
                    &config.recovery,
                    None,
                )?;
                let irr = result.equity.irr;
                let candidate = StructureCandidate {
                    index,
                    weights: w.clone(),
                    principals: ctx.structure().tranches().iter().map(|t| t.principal).collect(),
                    risk: settings.risk_metric.measure(&result),
                    ret: irr.unwrap_or(NO_IRR_RETURN),
                    cost: cost.cost(ctx.structure()),
                    irr,
                    breach_probability: result.breach_probability,
                    equity_cvar: result.equity.cvar,
                };
                tracing::debug!(
                    index,
                    risk = candidate.risk,
                    ret = candidate.ret,
                    cost = candidate.cost,
                    "candidate evaluated"
                );
                Ok(candidate)
            })
            .collect()
    };

    let candidates = match config.execution.workers {
        Some(workers) => rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| RunError::ThreadPool(e.to_string()))?
            .install(evaluate)?,
        None => evaluate()?,
    };

    let points: Vec<FrontierPoint> = candidates.iter().map(StructureCandidate::point).collect();
    let frontier = pareto_frontier(&points);
    tracing::info!(
        candidates = candidates.len(),
        frontier = frontier.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "structure search finished"
    );

    Ok(OptimisationResult {
        risk_metric: settings.risk_metric,
        candidates,
        frontier,
    })
}
