//! Parallel scenario runner.
//!
//! Scenarios are split into fixed-size batches by run index. Each batch
//! folds its scenarios in index order into a [`RiskAccumulator`]. Batches run
//! on a rayon pool in windows of a few batches per worker; each window is
//! merged into the running total in batch-index order before the next one
//! starts. At most one window of batch accumulators is alive at a time, and
//! the result is bit-identical for any worker count.
//!
//! Cancellation is cooperative: the token is checked before each batch and
//! between windows. A cancelled run returns the statistics of the batches
//! that completed, flagged `cancelled`.

use crate::aggregator::RiskAccumulator;
use crate::config::{ExecutionConfig, RunConfig};
use crate::error::RunError;
use crate::result::{AggregateResult, ResultInputs};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;
use tranche_core::market_data::{DiscountCurve, FlatCurve};
use tranche_models::credit::RecoveryWaterfall;
use tranche_pricing::{PathState, ScenarioEvaluator, SimulationContext};

/// Batches evaluated per worker thread before merging.
const BATCHES_PER_WORKER: usize = 4;

/// Consecutive batch ranges of at most `window` batches covering `0..n_batches`.
fn batch_windows(n_batches: usize, window: usize) -> impl Iterator<Item = Range<usize>> {
    let window = window.max(1);
    (0..n_batches)
        .step_by(window)
        .map(move |first| first..(first + window).min(n_batches))
}

/// Shared flag used to stop a run between batches.
///
/// # Examples
/// ```
/// use tranche_risk::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Batches already running finish normally.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Snapshot passed to a [`ProgressCallback`] after each completed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Batches completed so far.
    pub completed_batches: usize,
    /// Batches in the run.
    pub total_batches: usize,
    /// Scenarios in the batch that just completed.
    pub batch_scenarios: usize,
    /// Scenarios in the run.
    pub total_scenarios: usize,
}

/// Observer invoked from worker threads after each completed batch.
pub type ProgressCallback = Arc<dyn Fn(&Progress) + Send + Sync>;

/// Cancellation, progress and discounting hooks for a run.
#[derive(Clone, Default)]
pub struct RunControl {
    /// Cancellation flag checked before each batch.
    pub cancellation: CancellationToken,
    /// Progress observer.
    pub progress: Option<ProgressCallback>,
    /// Curve for present-value reporting; overrides `discount_rate`.
    pub discount_curve: Option<Arc<dyn DiscountCurve>>,
}

impl RunControl {
    /// Control with a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Control with a progress observer.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Control with a discount curve.
    pub fn with_discount_curve(mut self, curve: Arc<dyn DiscountCurve>) -> Self {
        self.discount_curve = Some(curve);
        self
    }
}

/// Run `scenario_count` scenarios with the configured recovery model.
///
/// # Errors
///
/// * `RunError::Config` - invalid configuration
/// * `RunError::InvalidScenarioCount` - `scenario_count` is zero
/// * `RunError::ThreadPool` - the worker pool could not be built
///
/// # Examples
///
/// ```rust
/// use tranche_models::baseline::BaselineInput;
/// use tranche_models::instruments::{Coupon, Seniority, Tranche};
/// use tranche_pricing::generator::{FactorSpec, Marginal, RiskFactor};
/// use tranche_risk::{run, RunConfig};
///
/// let mut config = RunConfig::new(
///     BaselineInput {
///         revenue: Some(vec![100.0; 5]),
///         opex: Some(vec![40.0; 5]),
///         ..BaselineInput::default()
///     },
///     vec![Tranche::new("senior", Seniority::Senior, 150.0, Coupon::Fixed { rate: 0.05 }, 5)],
/// );
/// config.equity_investment = 50.0;
/// config.generator.factors = vec![FactorSpec::level(
///     RiskFactor::RevenueGrowth,
///     Marginal::LogNormal { mu: None, sigma: 0.15 },
/// )];
///
/// let result = run(42, 500, &config).unwrap();
/// assert_eq!(result.scenarios_evaluated, 500);
/// assert!((0.0..=1.0).contains(&result.breach_probability));
/// ```
#[tracing::instrument(level = "info", skip(config))]
pub fn run(seed: u64, scenario_count: usize, config: &RunConfig) -> Result<AggregateResult, RunError> {
    run_with(seed, scenario_count, config, &RunControl::default(), &config.recovery)
}

/// Run with explicit control hooks and recovery model.
///
/// # Errors
///
/// See [`run`]. Additionally returns `RunError::Cancelled` if cancellation
/// was requested before any batch completed.
#[tracing::instrument(level = "info", skip(config, control, recovery))]
pub fn run_with(
    seed: u64,
    scenario_count: usize,
    config: &RunConfig,
    control: &RunControl,
    recovery: &dyn RecoveryWaterfall,
) -> Result<AggregateResult, RunError> {
    config.validate()?;
    if scenario_count == 0 {
        return Err(RunError::InvalidScenarioCount);
    }
    let ctx = config.context()?;

    let flat;
    let curve: Option<&dyn DiscountCurve> = match (&control.discount_curve, config.discount_rate) {
        (Some(c), _) => Some(c.as_ref()),
        (None, Some(rate)) => {
            flat = FlatCurve::new(rate);
            Some(&flat)
        }
        (None, None) => None,
    };

    run_context(seed, scenario_count, &ctx, &config.execution, control, recovery, curve)
}

/// Run against an already frozen context.
///
/// This is the entry point for callers that evaluate many variants of one
/// calibration, such as a structure search: every call with the same seed
/// sees the same random numbers. With `execution.workers` unset the run uses
/// the current rayon pool, so it nests inside an outer parallel iterator.
///
/// # Errors
///
/// See [`run_with`].
pub fn run_context(
    seed: u64,
    scenario_count: usize,
    ctx: &SimulationContext,
    execution: &ExecutionConfig,
    control: &RunControl,
    recovery: &dyn RecoveryWaterfall,
    curve: Option<&dyn DiscountCurve>,
) -> Result<AggregateResult, RunError> {
    execution.validate()?;
    if scenario_count == 0 {
        return Err(RunError::InvalidScenarioCount);
    }

    let started = Instant::now();
    let plan = ctx.plan(scenario_count)?;
    let evaluator = ScenarioEvaluator::new(ctx, recovery, seed);
    let batch_size = execution.batch_size;
    let n_batches = scenario_count.div_ceil(batch_size);
    let n_periods = ctx.n_periods();
    let n_tranches = ctx.structure().len();
    let equity = ctx.structure().equity_investment();

    tracing::info!(
        seed,
        scenario_count,
        workers = ?execution.workers,
        batches = n_batches,
        "run started"
    );

    let mut warnings = Vec::new();
    if let Some(repair) = ctx.psd_repair() {
        tracing::warn!(
            min_eigenvalue = repair.min_eigenvalue,
            floor = repair.floor,
            "correlation matrix was not positive semi-definite; eigenvalues clipped"
        );
        warnings.push(format!(
            "correlation matrix repaired: minimum eigenvalue {:.3e} clipped to {:.3e}",
            repair.min_eigenvalue, repair.floor
        ));
    }

    let completed = AtomicUsize::new(0);
    let evaluate_batch = |b: usize| -> Option<RiskAccumulator> {
        if control.cancellation.is_cancelled() {
            return None;
        }
        let start = b * batch_size;
        let end = (start + batch_size).min(scenario_count);
        let mut acc = RiskAccumulator::new(n_periods, n_tranches, execution.sample_capacity, equity);
        for i in start..end {
            acc.fold(&evaluator.evaluate(&plan.slot(i)));
        }
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(batch = b, scenarios = end - start, done, "batch complete");
        if let Some(progress) = &control.progress {
            progress(&Progress {
                completed_batches: done,
                total_batches: n_batches,
                batch_scenarios: end - start,
                total_scenarios: scenario_count,
            });
        }
        Some(acc)
    };

    let evaluate_all = || -> (RiskAccumulator, bool) {
        let window = rayon::current_num_threads() * BATCHES_PER_WORKER;
        let mut total =
            RiskAccumulator::new(n_periods, n_tranches, execution.sample_capacity, equity);
        let mut cancelled = false;
        for batches in batch_windows(n_batches, window) {
            if control.cancellation.is_cancelled() {
                cancelled = true;
                break;
            }
            let accs: Vec<Option<RiskAccumulator>> =
                batches.into_par_iter().map(&evaluate_batch).collect();
            for acc in accs {
                match acc {
                    Some(acc) => total.merge(acc),
                    None => cancelled = true,
                }
            }
        }
        (total, cancelled)
    };

    let (total, cancelled) = match execution.workers {
        Some(workers) => rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| RunError::ThreadPool(e.to_string()))?
            .install(evaluate_all),
        None => evaluate_all(),
    };

    if total.scenarios() == 0 {
        tracing::warn!("run cancelled before any batch completed");
        return Err(RunError::Cancelled);
    }
    if cancelled {
        tracing::warn!(
            evaluated = total.scenarios(),
            requested = scenario_count,
            "run cancelled; result covers completed batches only"
        );
        warnings.push(format!(
            "run cancelled after {} of {} scenarios",
            total.scenarios(),
            scenario_count
        ));
    }

    let analytic = evaluator.default_engine().map(|engine| engine.analytic());
    let result = AggregateResult::assemble(
        ctx,
        &total,
        ResultInputs {
            seed,
            scenarios_requested: scenario_count,
            cancelled,
            confidence: execution.tail_confidence,
            analytic,
            curve,
            warnings,
        },
    );

    tracing::info!(
        evaluated = result.scenarios_evaluated,
        breach_probability = result.breach_probability,
        anomalies = result.anomalies,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "run finished"
    );
    Ok(result)
}

/// Per-period states of a single scenario of a run, for diagnostics.
///
/// `index` is the run index, as in a run of `scenario_count` scenarios
/// with the same seed and configuration.
///
/// # Errors
///
/// * `RunError::Config` - invalid configuration
/// * `RunError::InvalidScenarioCount` - `scenario_count` is zero
/// * `RunError::ScenarioOutOfRange` - `index >= scenario_count`
pub fn evaluate_scenario_states(
    seed: u64,
    scenario_count: usize,
    index: usize,
    config: &RunConfig,
) -> Result<Vec<PathState>, RunError> {
    if scenario_count == 0 {
        return Err(RunError::InvalidScenarioCount);
    }
    if index >= scenario_count {
        return Err(RunError::ScenarioOutOfRange {
            index,
            count: scenario_count,
        });
    }
    config.validate()?;
    let ctx = config.context()?;
    let plan = ctx.plan(scenario_count)?;
    let evaluator = ScenarioEvaluator::new(&ctx, &config.recovery, seed);
    Ok(evaluator.evaluate_states(&plan.slot(index)))
}
