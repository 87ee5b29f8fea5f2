//! Bracketing root finders.
//!
//! Used for equity IRR, where the net-present-value function is continuous
//! but its derivative is not available in closed form.
//!
//! ## Configuration
//!
//! [`SolverConfig`] controls:
//! - `tolerance`: convergence tolerance (default: 1e-10)
//! - `max_iterations`: maximum iteration count (default: 100)
//!
//! ## Example
//!
//! ```
//! use tranche_core::math::solvers::{BrentSolver, SolverConfig};
//!
//! let solver = BrentSolver::new(SolverConfig::default());
//! let root = solver.find_root(|x: f64| x * x - 2.0, 0.0, 2.0).unwrap();
//! assert!((root - std::f64::consts::SQRT_2).abs() < 1e-10);
//! ```

mod brent;
mod config;

pub use brent::BrentSolver;
pub use config::SolverConfig;
