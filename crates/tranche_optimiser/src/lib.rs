//! # Tranche Optimiser (Layer 4: Structure Search)
//!
//! Searches tranche-weight allocations of a fixed total debt and reports the
//! Pareto frontier of (risk, return, cost).
//!
//! ## Modules
//!
//! - `candidates`: explicit weight vectors or a simplex grid, with per-tranche bounds
//! - `cost`: the [`CostOfDebt`] seam and a principal-weighted coupon default
//! - `pareto`: dominance and deterministic frontier ordering
//! - `search`: parallel candidate evaluation on common random numbers
//!
//! ## Example
//!
//! ```rust
//! use tranche_models::baseline::BaselineInput;
//! use tranche_models::instruments::{Coupon, Seniority, Tranche};
//! use tranche_optimiser::candidates::{SearchSpace, WeightBounds};
//! use tranche_optimiser::cost::WeightedCouponCost;
//! use tranche_optimiser::{optimise, OptimiserConfig, RiskMetric};
//! use tranche_risk::RunConfig;
//!
//! let mut config = RunConfig::new(
//!     BaselineInput {
//!         revenue: Some(vec![100.0; 4]),
//!         opex: Some(vec![40.0; 4]),
//!         ..BaselineInput::default()
//!     },
//!     vec![
//!         Tranche::new("senior", Seniority::Senior, 90.0, Coupon::Floating { spread: 0.015 }, 4),
//!         Tranche::new("junior", Seniority::Subordinated, 30.0, Coupon::Fixed { rate: 0.10 }, 4),
//!     ],
//! );
//! config.equity_investment = 40.0;
//!
//! let settings = OptimiserConfig {
//!     seed: 42,
//!     scenario_count: 128,
//!     risk_metric: RiskMetric::Cvar,
//!     space: SearchSpace::simplex_grid(0.1)
//!         .with_bounds(vec![WeightBounds::new(0.5, 0.9), WeightBounds::new(0.1, 0.5)]),
//! };
//! let result = optimise(&config, &settings, &WeightedCouponCost::new(0.04)).unwrap();
//!
//! for candidate in result.frontier_candidates() {
//!     assert!(candidate.weights[0] >= 0.5 - 1e-9);
//! }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod candidates;
pub mod cost;
pub mod pareto;
pub mod search;

mod error;

pub use cost::{CostOfDebt, WeightedCouponCost};
pub use error::OptimiserError;
pub use search::{
    optimise, optimise_with, OptimisationResult, OptimiserConfig, RiskMetric, StructureCandidate,
};
