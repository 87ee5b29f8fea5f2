//! Brent's method root-finding solver.

use super::SolverConfig;
use crate::types::SolverError;
use num_traits::Float;

/// Brent's method root finder.
///
/// Keeps a bracket `[b, c]` with a sign change and at each step tries inverse
/// quadratic interpolation (or the secant step when only two distinct points
/// are available), falling back to bisection whenever the interpolated step
/// would leave the bracket or shrink it too slowly.
///
/// # Example
///
/// ```
/// use tranche_core::math::solvers::{BrentSolver, SolverConfig};
///
/// let solver = BrentSolver::new(SolverConfig::default());
/// let f = |x: f64| x * x * x - x - 2.0;
/// let root = solver.find_root(f, 1.0, 2.0).unwrap();
/// assert!(f(root).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct BrentSolver<T: Float> {
    config: SolverConfig<T>,
}

impl<T: Float> BrentSolver<T> {
    /// Create a solver with the given configuration.
    pub fn new(config: SolverConfig<T>) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(SolverConfig::default())
    }

    /// Returns a reference to the solver configuration.
    pub fn config(&self) -> &SolverConfig<T> {
        &self.config
    }

    /// Find a root of `f` in `[a, b]`.
    ///
    /// # Errors
    ///
    /// * `SolverError::NoBracket` - `f(a)` and `f(b)` have the same sign
    /// * `SolverError::MaxIterationsExceeded` - failed to converge
    pub fn find_root<F>(&self, f: F, a: T, b: T) -> Result<T, SolverError>
    where
        F: Fn(T) -> T,
    {
        let zero = T::zero();
        let half = T::from(0.5).unwrap();
        let two = T::from(2.0).unwrap();
        let three = T::from(3.0).unwrap();

        let (mut a, mut b) = (a, b);
        let (mut fa, mut fb) = (f(a), f(b));

        if fa == zero {
            return Ok(a);
        }
        if fb == zero {
            return Ok(b);
        }
        if (fa > zero) == (fb > zero) {
            return Err(SolverError::NoBracket {
                a: a.to_f64().unwrap_or(f64::NAN),
                b: b.to_f64().unwrap_or(f64::NAN),
            });
        }

        let (mut c, mut fc) = (b, fb);
        let mut d = b - a;
        let mut e = d;

        for _ in 0..self.config.max_iterations {
            // Keep c on the opposite side of the root from b.
            if (fb > zero) == (fc > zero) {
                c = a;
                fc = fa;
                d = b - a;
                e = d;
            }
            // b is always the best estimate.
            if fc.abs() < fb.abs() {
                a = b;
                b = c;
                c = a;
                fa = fb;
                fb = fc;
                fc = fa;
            }

            let tol = two * T::epsilon() * b.abs() + half * self.config.tolerance;
            let m = half * (c - b);
            if m.abs() <= tol || fb.abs() < self.config.tolerance {
                return Ok(b);
            }

            if e.abs() >= tol && fa.abs() > fb.abs() {
                let s = fb / fa;
                let (mut p, mut q) = if a == c {
                    (two * m * s, T::one() - s)
                } else {
                    let q0 = fa / fc;
                    let r = fb / fc;
                    (
                        s * (two * m * q0 * (q0 - r) - (b - a) * (r - T::one())),
                        (q0 - T::one()) * (r - T::one()) * (s - T::one()),
                    )
                };
                if p > zero {
                    q = -q;
                }
                p = p.abs();

                let limit_interp = three * m * q - (tol * q).abs();
                let limit_prev = (e * q).abs();
                if two * p < limit_interp.min(limit_prev) {
                    e = d;
                    d = p / q;
                } else {
                    d = m;
                    e = d;
                }
            } else {
                d = m;
                e = d;
            }

            a = b;
            fa = fb;
            b = if d.abs() > tol {
                b + d
            } else if m > zero {
                b + tol
            } else {
                b - tol
            };
            fb = f(b);
        }

        Err(SolverError::MaxIterationsExceeded {
            iterations: self.config.max_iterations,
        })
    }

    /// Widen `[lo, hi]` geometrically until `f` changes sign, then solve.
    ///
    /// The lower end is never moved below `floor`, which keeps rate-style
    /// problems away from singularities such as a discount base of zero.
    ///
    /// # Errors
    ///
    /// Returns `SolverError::NoBracket` if no sign change is found within
    /// `max_iterations` expansions.
    pub fn find_root_expanding<F>(&self, f: F, lo: T, hi: T, floor: T) -> Result<T, SolverError>
    where
        F: Fn(T) -> T,
    {
        let growth = T::from(1.6).unwrap();
        let (mut lo, mut hi) = (lo.max(floor), hi);
        let (mut flo, mut fhi) = (f(lo), f(hi));

        for _ in 0..self.config.max_iterations {
            if (flo > T::zero()) != (fhi > T::zero()) || flo == T::zero() || fhi == T::zero() {
                return self.find_root(&f, lo, hi);
            }
            let width = hi - lo;
            if flo.abs() < fhi.abs() && lo > floor {
                lo = (lo - growth * width).max(floor);
                flo = f(lo);
            } else {
                hi = hi + growth * width;
                fhi = f(hi);
            }
        }

        Err(SolverError::NoBracket {
            a: lo.to_f64().unwrap_or(f64::NAN),
            b: hi.to_f64().unwrap_or(f64::NAN),
        })
    }
}
