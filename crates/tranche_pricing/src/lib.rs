//! # Tranche Pricing (Layer 3: Scenario Engine)
//!
//! ## Layer 3 Role
//!
//! tranche_pricing turns a frozen calibration into per-scenario outcomes:
//! - Correlated stochastic variable generation with PSD repair and
//!   antithetic pairing (`generator`)
//! - Path simulation of revenue, opex, taxes, CFADS, short rate and regime (`paths`)
//! - Regime-switching structural default with closed-form cross-checks (`default_engine`)
//! - Strict-priority waterfall with DSRA/MRA reserves and covenant tests (`waterfall`)
//! - Per-scenario random streams seeded from scenario coordinates (`rng`)
//! - Scenario groups and blending weights (`plan`)
//!
//! Aggregation across scenarios and parallel execution live in `tranche_risk`.
//!
//! ## Determinism
//!
//! Every scenario draws from its own generator seeded by
//! `(master_seed, group, index, stream)`, and the context is immutable, so
//! [`ScenarioEvaluator::evaluate`] is a pure function of its inputs.
//!
//! ## Usage Example
//!
//! ```rust
//! use tranche_models::baseline::BaselineInput;
//! use tranche_models::credit::AbsolutePriorityRecovery;
//! use tranche_models::instruments::{Coupon, Seniority, Tranche};
//! use tranche_pricing::generator::{FactorSpec, GeneratorConfig, Marginal, RiskFactor};
//! use tranche_pricing::{ScenarioEvaluator, SimulationContext};
//!
//! let ctx = SimulationContext::builder()
//!     .baseline(BaselineInput {
//!         revenue: Some(vec![100.0; 4]),
//!         opex: Some(vec![40.0; 4]),
//!         ..BaselineInput::default()
//!     })
//!     .tranches(vec![Tranche::new("senior", Seniority::Senior, 100.0, Coupon::Fixed { rate: 0.05 }, 4)])
//!     .generator(GeneratorConfig {
//!         factors: vec![FactorSpec::level(
//!             RiskFactor::RevenueGrowth,
//!             Marginal::LogNormal { mu: None, sigma: 0.15 },
//!         )],
//!         ..GeneratorConfig::default()
//!     })
//!     .build()
//!     .unwrap();
//!
//! let recovery = AbsolutePriorityRecovery::default();
//! let evaluator = ScenarioEvaluator::new(&ctx, &recovery, 42);
//! let plan = ctx.plan(100).unwrap();
//! let outcome = evaluator.evaluate(&plan.slot(0));
//! assert_eq!(outcome.dscr.len(), 4);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod context;
pub mod default_engine;
pub mod error;
pub mod generator;
pub mod paths;
pub mod plan;
pub mod rng;
pub mod scenario;
pub mod state;
pub mod waterfall;

pub use context::{SimulationContext, SimulationContextBuilder};
pub use error::SimulationError;
pub use scenario::{ScenarioEvaluator, ScenarioOutcome, TrancheOutcome};
pub use state::PathState;
