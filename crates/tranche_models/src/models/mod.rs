//! Stochastic state models advanced once per period.
//!
//! - [`short_rate`]: discrete mean-reverting short rate
//! - [`regime`]: two-state Normal/Stress regime chain

pub mod regime;
pub mod short_rate;

pub use regime::{Regime, RegimeDynamics, TransitionMatrix};
pub use short_rate::ShortRateParams;
