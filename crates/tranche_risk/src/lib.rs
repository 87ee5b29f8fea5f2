//! # Tranche Risk (Layer 4: Aggregation and Execution)
//!
//! ## Layer 4 Role
//!
//! tranche_risk runs scenario sets and reduces them to risk figures:
//! - Run configuration from TOML with environment overrides (`config`)
//! - Batched parallel execution with cancellation and progress (`engine`)
//! - Streaming accumulation with bounded-memory percentile sketches (`aggregator`)
//! - PD, LGD, EL, DSCR bands, breach probability, equity VaR/CVaR and IRR (`result`)
//! - Hedge-mode × structure comparison exported as JSON (`report`)
//!
//! ## Determinism
//!
//! Batches are merged in index order and the percentile sketch keeps
//! samples by a hash of the scenario identity, so for a given seed and
//! configuration the result does not depend on the worker count.
//!
//! ## Usage Example
//!
//! ```rust
//! use tranche_models::baseline::BaselineInput;
//! use tranche_models::instruments::{Coupon, Seniority, Tranche};
//! use tranche_pricing::generator::{FactorSpec, Marginal, RiskFactor};
//! use tranche_risk::{run, RunConfig, RunError};
//!
//! let mut config = RunConfig::new(
//!     BaselineInput {
//!         revenue: Some(vec![100.0; 4]),
//!         opex: Some(vec![45.0; 4]),
//!         ..BaselineInput::default()
//!     },
//!     vec![Tranche::new("senior", Seniority::Senior, 120.0, Coupon::Fixed { rate: 0.05 }, 4)],
//! );
//! config.equity_investment = 40.0;
//! config.generator.factors = vec![FactorSpec::level(
//!     RiskFactor::RevenueGrowth,
//!     Marginal::LogNormal { mu: None, sigma: 0.2 },
//! )];
//!
//! let result = run(7, 400, &config).unwrap();
//! assert_eq!(result.tranches[0].name, "senior");
//! assert_eq!(result.dscr_bands.len(), 4);
//!
//! assert_eq!(run(7, 0, &config), Err(RunError::InvalidScenarioCount));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod aggregator;
pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod result;

pub use config::{ExecutionConfig, RunConfig};
pub use engine::{
    evaluate_scenario_states, run, run_context, run_with, CancellationToken, Progress,
    ProgressCallback, RunControl,
};
pub use error::RunError;
pub use report::{ComparisonReport, StructureVariant};
pub use result::{AggregateResult, DscrBand, DscrPercentiles, EquityRisk, FrontierPoint, TrancheRisk};
