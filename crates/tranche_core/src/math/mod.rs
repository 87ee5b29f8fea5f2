//! Mathematical building blocks.
//!
//! - [`linalg`]: correlation matrices, PSD repair and Cholesky factorisation
//! - [`distributions`]: standard normal CDF and PDF
//! - [`solvers`]: bracketing root finders

pub mod distributions;
pub mod linalg;
pub mod solvers;
