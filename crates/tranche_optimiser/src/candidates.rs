//! Candidate tranche-weight vectors.
//!
//! A search space is either an explicit list of weight vectors or a regular
//! grid on the probability simplex, optionally filtered by per-tranche
//! bounds. Weights are in priority order, the order of
//! `CapitalStructure::tranches`.

use crate::error::OptimiserError;
use serde::{Deserialize, Serialize};
use tranche_core::types::ConfigError;
use tranche_models::instruments::structure::validate_weights;

/// Relative tolerance when checking that a grid step divides one.
const STEP_TOL: f64 = 1e-9;

/// Largest number of grid points enumerated before giving up.
pub const MAX_GRID_POINTS: usize = 1_000_000;

/// Inclusive weight range for one tranche.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightBounds {
    /// Lower bound
    #[serde(default)]
    pub min: f64,
    /// Upper bound
    #[serde(default = "one")]
    pub max: f64,
}

fn one() -> f64 {
    1.0
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl WeightBounds {
    /// Bounds `[min, max]`.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    fn contains(&self, w: f64) -> bool {
        w >= self.min - STEP_TOL && w <= self.max + STEP_TOL
    }
}

/// Where candidates come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CandidateSource {
    /// Caller-supplied weight vectors.
    Explicit {
        /// One vector per candidate
        weights: Vec<Vec<f64>>,
    },
    /// Every vector of multiples of `step` that sums to one.
    SimplexGrid {
        /// Grid spacing; must divide one
        step: f64,
    },
}

/// Candidate source plus optional bounds.
///
/// # Examples
///
/// ```
/// use tranche_optimiser::candidates::{SearchSpace, WeightBounds};
///
/// let space = SearchSpace::simplex_grid(0.25)
///     .with_bounds(vec![WeightBounds::new(0.5, 1.0), WeightBounds::default()]);
/// let candidates = space.enumerate(2).unwrap();
/// assert_eq!(candidates, vec![vec![0.5, 0.5], vec![0.75, 0.25], vec![1.0, 0.0]]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    /// Candidate source.
    pub source: CandidateSource,
    /// Per-tranche bounds; unconstrained when empty.
    #[serde(default)]
    pub bounds: Vec<WeightBounds>,
}

impl SearchSpace {
    /// Explicit candidates.
    pub fn explicit(weights: Vec<Vec<f64>>) -> Self {
        Self {
            source: CandidateSource::Explicit { weights },
            bounds: Vec::new(),
        }
    }

    /// Simplex grid with spacing `step`.
    pub fn simplex_grid(step: f64) -> Self {
        Self {
            source: CandidateSource::SimplexGrid { step },
            bounds: Vec::new(),
        }
    }

    /// Same space with per-tranche bounds.
    pub fn with_bounds(mut self, bounds: Vec<WeightBounds>) -> Self {
        self.bounds = bounds;
        self
    }

    /// Candidate weight vectors for `n_tranches` tranches, in a stable order.
    ///
    /// Grid points are listed lexicographically by the first tranche's
    /// weight, then the second's, and so on.
    ///
    /// # Errors
    ///
    /// * `OptimiserError::Run` - malformed step, bounds or explicit weights
    /// * `OptimiserError::EmptySearchSpace` - nothing satisfies the bounds
    pub fn enumerate(&self, n_tranches: usize) -> Result<Vec<Vec<f64>>, OptimiserError> {
        if n_tranches == 0 {
            return Err(ConfigError::invalid("tranches", "at least one tranche is required").into());
        }
        self.validate_bounds(n_tranches)?;

        let raw = match &self.source {
            CandidateSource::Explicit { weights } => {
                for w in weights {
                    validate_weights(w, n_tranches)?;
                }
                weights.clone()
            }
            CandidateSource::SimplexGrid { step } => simplex_grid(*step, n_tranches)?,
        };
        let total = raw.len();

        let candidates: Vec<Vec<f64>> = raw
            .into_iter()
            .filter(|w| {
                self.bounds.is_empty()
                    || w.iter().zip(&self.bounds).all(|(&x, b)| b.contains(x))
            })
            .collect();

        tracing::debug!(total, kept = candidates.len(), "search space enumerated");
        if candidates.is_empty() {
            let reason = if total == 0 {
                "no candidates supplied".to_string()
            } else {
                format!("none of {} candidates satisfies the bounds", total)
            };
            return Err(OptimiserError::EmptySearchSpace { reason });
        }
        Ok(candidates)
    }

    fn validate_bounds(&self, n_tranches: usize) -> Result<(), OptimiserError> {
        if self.bounds.is_empty() {
            return Ok(());
        }
        if self.bounds.len() != n_tranches {
            return Err(ConfigError::invalid(
                "bounds",
                format!("expected {} entries, got {}", n_tranches, self.bounds.len()),
            )
            .into());
        }
        for (i, b) in self.bounds.iter().enumerate() {
            if !(b.min.is_finite() && b.max.is_finite()) {
                return Err(ConfigError::invalid(format!("bounds[{}]", i), "must be finite").into());
            }
            if b.min > b.max {
                return Err(OptimiserError::EmptySearchSpace {
                    reason: format!("bounds[{}] has min {} above max {}", i, b.min, b.max),
                });
            }
        }
        let min_sum: f64 = self.bounds.iter().map(|b| b.min).sum();
        let max_sum: f64 = self.bounds.iter().map(|b| b.max).sum();
        if min_sum > 1.0 + STEP_TOL || max_sum < 1.0 - STEP_TOL {
            return Err(OptimiserError::EmptySearchSpace {
                reason: format!(
                    "bounds admit weight sums in [{}, {}], which excludes one",
                    min_sum, max_sum
                ),
            });
        }
        Ok(())
    }
}

/// All compositions of `1/step` units into `n` parts, scaled to weights.
fn simplex_grid(step: f64, n: usize) -> Result<Vec<Vec<f64>>, OptimiserError> {
    if !(step.is_finite() && step > 0.0 && step <= 1.0) {
        return Err(ConfigError::invalid("step", "must lie in (0, 1]").into());
    }
    let units = (1.0 / step).round();
    if ((units * step) - 1.0).abs() > STEP_TOL * units.max(1.0) {
        return Err(ConfigError::invalid("step", format!("{} does not divide one", step)).into());
    }
    let units = units as usize;

    let count = grid_size(units, n);
    if count > MAX_GRID_POINTS {
        return Err(ConfigError::invalid(
            "step",
            format!("grid of {} points exceeds the limit of {}", count, MAX_GRID_POINTS),
        )
        .into());
    }

    let mut out = Vec::with_capacity(count);
    let mut parts = vec![0usize; n];
    compose(units, 0, &mut parts, &mut |p: &[usize]| {
        out.push(p.iter().map(|&k| k as f64 / units as f64).collect())
    });
    Ok(out)
}

/// `C(units + n − 1, n − 1)`, saturating.
fn grid_size(units: usize, n: usize) -> usize {
    let mut c: usize = 1;
    for i in 1..n {
        c = c.saturating_mul(units + i) / i;
    }
    c
}

fn compose(remaining: usize, pos: usize, parts: &mut [usize], emit: &mut impl FnMut(&[usize])) {
    if pos + 1 == parts.len() {
        parts[pos] = remaining;
        emit(parts);
        return;
    }
    for k in 0..=remaining {
        parts[pos] = k;
        compose(remaining - k, pos + 1, parts, emit);
    }
}
