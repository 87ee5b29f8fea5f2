//! # tranche_core: Numerical Foundation for Structured Debt Simulation
//!
//! ## Layer 1 (Foundation) Role
//!
//! tranche_core is the bottom layer of the workspace and provides:
//! - Configuration and solver error types (`types::error`)
//! - Correlation-matrix validation, PSD repair and Cholesky factorisation (`math::linalg`)
//! - Standard normal distribution functions (`math::distributions`)
//! - Bracketing root finders for IRR-style problems (`math::solvers`)
//! - The discount-curve seam used for present-value reporting (`market_data`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other tranche_* crates and only minimal
//! external dependencies:
//! - num-traits: generic numerical code
//! - thiserror: error derivation
//! - serde: configuration types are deserialisable
//!
//! ## Usage Examples
//!
//! ```rust
//! use tranche_core::math::linalg::CorrelationMatrix;
//!
//! let corr = CorrelationMatrix::from_rows(&[
//!     vec![1.0, 0.3],
//!     vec![0.3, 1.0],
//! ])
//! .unwrap();
//!
//! let factor = corr.cholesky().unwrap();
//! let mut out = [0.0; 2];
//! factor.apply(&[1.0, 0.0], &mut out);
//! assert!((out[1] - 0.3).abs() < 1e-12);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod market_data;
pub mod math;
pub mod types;
