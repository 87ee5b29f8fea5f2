//! Stopping rules for the root finders.

use num_traits::Float;

/// Tolerance and iteration cap shared by the bracketing solvers.
///
/// # Example
///
/// ```
/// use tranche_core::math::solvers::SolverConfig;
///
/// let rates: SolverConfig<f64> = SolverConfig::for_rates();
/// assert_eq!(rates.max_iterations, 200);
/// assert!(rates.tolerance < SolverConfig::<f64>::default().tolerance);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig<T: Float> {
    /// Accepted bracket half-width, also accepted as `|f(x)|`.
    pub tolerance: T,
    /// Iterations before the solver reports non-convergence.
    pub max_iterations: usize,
}

impl<T: Float> Default for SolverConfig<T> {
    fn default() -> Self {
        Self {
            tolerance: T::from(1e-10).unwrap(),
            max_iterations: 100,
        }
    }
}

impl<T: Float> SolverConfig<T> {
    /// Explicit stopping rule.
    ///
    /// # Panics
    ///
    /// Panics unless `tolerance` is positive and `max_iterations` non-zero.
    pub fn new(tolerance: T, max_iterations: usize) -> Self {
        assert!(tolerance > T::zero(), "solver tolerance must be positive");
        assert!(max_iterations > 0, "solver needs at least one iteration");
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Tighter rule for yield-style roots such as an IRR, where the
    /// function is a discounted sum and flat near the root.
    pub fn for_rates() -> Self {
        Self {
            tolerance: T::from(1e-12).unwrap(),
            max_iterations: 200,
        }
    }
}
