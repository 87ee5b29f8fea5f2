//! Streaming, mergeable risk accumulators.
//!
//! A [`RiskAccumulator`] folds [`ScenarioOutcome`]s one at a time. Two
//! accumulators merge into the accumulator of the concatenated streams, so a
//! run can fold batches independently and combine them afterwards. The
//! runner merges completed batches in batch-index order, which keeps
//! floating-point sums identical for any worker count.
//!
//! Quantile statistics (DSCR bands, equity-loss VaR/CVaR) use a
//! [`BottomKSketch`] keyed by [`ScenarioId::sample_key`](tranche_pricing::plan::ScenarioId::sample_key).

mod sketch;

pub use sketch::{weighted_quantile, weighted_tail_mean, BottomKSketch, Sample};

use tranche_pricing::ScenarioOutcome;

/// Percentile levels reported for DSCR.
pub const DSCR_PERCENTILES: [f64; 5] = [0.05, 0.25, 0.50, 0.75, 0.95];

/// Weighted per-tranche sums.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrancheTotals {
    /// Weight of scenarios in which the tranche defaulted.
    pub default_weight: f64,
    /// Σ weight × LGD over defaulting scenarios.
    pub lgd_weighted: f64,
    /// Σ weight × EAD over defaulting scenarios.
    pub ead_weighted: f64,
    /// Σ weight × terminal arrears.
    pub arrears_weighted: f64,
    /// Σ weight × cash received.
    pub received_weighted: f64,
}

impl TrancheTotals {
    fn merge(&mut self, other: &TrancheTotals) {
        self.default_weight += other.default_weight;
        self.lgd_weighted += other.lgd_weighted;
        self.ead_weighted += other.ead_weighted;
        self.arrears_weighted += other.arrears_weighted;
        self.received_weighted += other.received_weighted;
    }
}

/// Accumulated statistics of a stream of scenario outcomes.
///
/// # Examples
///
/// ```rust
/// use tranche_pricing::plan::ScenarioId;
/// use tranche_pricing::{ScenarioOutcome, TrancheOutcome};
/// use tranche_risk::aggregator::RiskAccumulator;
///
/// let outcome = |index: usize, breach: bool| ScenarioOutcome {
///     id: ScenarioId { group: 0, index },
///     weight: 1.0,
///     dscr: vec![Some(if breach { 0.9 } else { 1.5 })],
///     breach_any: breach,
///     tranches: vec![TrancheOutcome {
///         default_period: None,
///         exposure: 0.0,
///         lgd: 0.0,
///         terminal_arrears: 0.0,
///         received: 10.0,
///     }],
///     equity_flows: vec![5.0],
///     terminal_equity: 5.0,
///     anomalies: 0,
/// };
///
/// let mut a = RiskAccumulator::new(1, 1, 1000, 10.0);
/// a.fold(&outcome(0, true));
/// let mut b = RiskAccumulator::new(1, 1, 1000, 10.0);
/// b.fold(&outcome(1, false));
/// a.merge(b);
///
/// assert_eq!(a.scenarios(), 2);
/// assert_eq!(a.breach_probability(), 0.5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAccumulator {
    n_periods: usize,
    equity_investment: f64,
    scenarios: u64,
    weight: f64,
    breach_weight: f64,
    tranches: Vec<TrancheTotals>,
    equity_flows: Vec<f64>,
    terminal_equity: f64,
    dscr: Vec<BottomKSketch>,
    loss: BottomKSketch,
    anomalies: u64,
}

impl RiskAccumulator {
    /// Empty accumulator.
    ///
    /// # Arguments
    ///
    /// * `n_periods` - Horizon of every folded outcome
    /// * `n_tranches` - Tranches per outcome
    /// * `sample_capacity` - Sketch capacity per period and for the loss tail
    /// * `equity_investment` - Equity at close; loss is measured against it
    pub fn new(
        n_periods: usize,
        n_tranches: usize,
        sample_capacity: usize,
        equity_investment: f64,
    ) -> Self {
        Self {
            n_periods,
            equity_investment,
            scenarios: 0,
            weight: 0.0,
            breach_weight: 0.0,
            tranches: vec![TrancheTotals::default(); n_tranches],
            equity_flows: vec![0.0; n_periods],
            terminal_equity: 0.0,
            dscr: vec![BottomKSketch::new(sample_capacity); n_periods],
            loss: BottomKSketch::new(sample_capacity),
            anomalies: 0,
        }
    }

    /// Fold one scenario.
    pub fn fold(&mut self, outcome: &ScenarioOutcome) {
        let w = outcome.weight;
        let key = outcome.id.sample_key();

        self.scenarios += 1;
        self.weight += w;
        if outcome.breach_any {
            self.breach_weight += w;
        }

        for (acc, t) in self.tranches.iter_mut().zip(&outcome.tranches) {
            if t.default_period.is_some() {
                acc.default_weight += w;
                acc.lgd_weighted += w * t.lgd;
                acc.ead_weighted += w * t.exposure;
            }
            acc.arrears_weighted += w * t.terminal_arrears;
            acc.received_weighted += w * t.received;
        }

        for (acc, flow) in self.equity_flows.iter_mut().zip(&outcome.equity_flows) {
            *acc += w * flow;
        }
        self.terminal_equity += w * outcome.terminal_equity;

        for (sketch, dscr) in self.dscr.iter_mut().zip(&outcome.dscr) {
            if let Some(d) = dscr {
                sketch.insert(key, *d, w);
            }
        }
        self.loss
            .insert(key, self.equity_investment - outcome.terminal_equity, w);
        self.anomalies += outcome.anomalies;
    }

    /// Absorb an accumulator built over disjoint scenarios.
    pub fn merge(&mut self, other: RiskAccumulator) {
        self.scenarios += other.scenarios;
        self.weight += other.weight;
        self.breach_weight += other.breach_weight;
        for (a, b) in self.tranches.iter_mut().zip(&other.tranches) {
            a.merge(b);
        }
        for (a, b) in self.equity_flows.iter_mut().zip(&other.equity_flows) {
            *a += b;
        }
        self.terminal_equity += other.terminal_equity;
        for (a, b) in self.dscr.iter_mut().zip(other.dscr) {
            a.merge(b);
        }
        self.loss.merge(other.loss);
        self.anomalies += other.anomalies;
    }

    /// Scenarios folded.
    #[inline]
    pub fn scenarios(&self) -> u64 {
        self.scenarios
    }

    /// Total aggregation weight.
    #[inline]
    pub fn total_weight(&self) -> f64 {
        self.weight
    }

    /// Horizon in periods.
    #[inline]
    pub fn n_periods(&self) -> usize {
        self.n_periods
    }

    /// Anomalies clipped across all folded scenarios.
    #[inline]
    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }

    /// Weighted fraction of scenarios with at least one breach period.
    pub fn breach_probability(&self) -> f64 {
        self.ratio(self.breach_weight)
    }

    /// Weighted per-tranche sums.
    #[inline]
    pub fn tranche_totals(&self) -> &[TrancheTotals] {
        &self.tranches
    }

    /// Weighted mean of `x` over all scenarios, zero when empty.
    pub fn ratio(&self, x: f64) -> f64 {
        if self.weight > 0.0 {
            x / self.weight
        } else {
            0.0
        }
    }

    /// Weighted mean equity flow per period.
    pub fn mean_equity_flows(&self) -> Vec<f64> {
        self.equity_flows.iter().map(|&f| self.ratio(f)).collect()
    }

    /// Weighted mean terminal equity value.
    pub fn mean_terminal_equity(&self) -> f64 {
        self.ratio(self.terminal_equity)
    }

    /// Per-period DSCR percentiles at [`DSCR_PERCENTILES`], with the sample
    /// size behind each period.
    pub fn dscr_percentiles(&self) -> Vec<([Option<f64>; 5], u64)> {
        self.dscr
            .iter()
            .map(|sketch| {
                let seen = sketch.seen();
                let sorted = sketch.clone().into_sorted_values();
                let mut bands = [None; 5];
                for (b, &q) in bands.iter_mut().zip(&DSCR_PERCENTILES) {
                    *b = weighted_quantile(&sorted, q);
                }
                (bands, seen)
            })
            .collect()
    }

    /// VaR and CVaR of equity loss at `confidence`.
    pub fn loss_tail(&self, confidence: f64) -> Option<(f64, f64)> {
        let sorted = self.loss.clone().into_sorted_values();
        let var = weighted_quantile(&sorted, confidence)?;
        let cvar = weighted_tail_mean(&sorted, confidence)?;
        Some((var, cvar))
    }
}
