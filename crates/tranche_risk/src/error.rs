//! Error types for runs and reports.

use thiserror::Error;
use tranche_core::types::ConfigError;
use tranche_pricing::SimulationError;

/// Errors returned by [`run`](crate::run) and friends.
///
/// Configuration problems surface before the first scenario is evaluated.
/// Once the loop has started the only possible error is
/// [`RunError::Cancelled`], and only when no batch completed.
///
/// # Examples
/// ```
/// use tranche_core::types::ConfigError;
/// use tranche_risk::RunError;
///
/// let err: RunError = ConfigError::WeightsNotNormalised { sum: 0.8 }.into();
/// assert!(matches!(err, RunError::Config(_)));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunError {
    /// Invalid calibration or structure.
    #[error(transparent)]
    Config(#[from] SimulationError),

    /// The configuration file could not be read or parsed.
    #[error("Configuration file error: {0}")]
    ConfigFile(String),

    /// The worker pool could not be created.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Cancelled before any batch completed.
    #[error("Run cancelled before any batch completed")]
    Cancelled,

    /// A run needs at least one scenario.
    #[error("Scenario count must be positive")]
    InvalidScenarioCount,

    /// A diagnostic request named a scenario outside the run.
    #[error("Scenario index {index} out of range for a run of {count}")]
    ScenarioOutOfRange {
        /// Requested run index
        index: usize,
        /// Scenarios in the run
        count: usize,
    },
}

impl From<ConfigError> for RunError {
    fn from(err: ConfigError) -> Self {
        RunError::Config(SimulationError::Config(err))
    }
}
