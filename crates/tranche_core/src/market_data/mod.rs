//! Discount-curve seam.
//!
//! Curves are supplied by an external component and consulted only after the
//! scenario loop, to report present values of mean cash flows.

pub mod curves;
pub mod error;

pub use curves::{DiscountCurve, DiscountFactorTable, FlatCurve};
pub use error::CurveError;
