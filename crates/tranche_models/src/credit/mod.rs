//! Structural credit model.
//!
//! - [`structural`]: asset-value parameters, credit state machine and
//!   closed-form first-passage probabilities
//! - [`recovery`]: the collateral recovery seam feeding loss-given-default

pub mod recovery;
pub mod structural;

pub use recovery::{AbsolutePriorityRecovery, RecoveryContext, RecoveryWaterfall};
pub use structural::{
    black_cox_pd, merton_distance_to_default, AssetValueParams, CreditState, RegimeParams,
};
