//! Optimiser error types.

use thiserror::Error;
use tranche_core::types::ConfigError;
use tranche_risk::RunError;

/// Errors from a structure search.
///
/// Runs of individual candidates never fail on business outcomes, so apart
/// from configuration problems the only search-specific failure is an empty
/// constrained space.
///
/// # Examples
///
/// ```
/// use tranche_optimiser::OptimiserError;
///
/// let err = OptimiserError::EmptySearchSpace {
///     reason: "no grid point satisfies the bounds".into(),
/// };
/// assert!(err.to_string().contains("bounds"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimiserError {
    /// No candidate satisfies the simplex and bound constraints.
    #[error("Empty search space: {reason}")]
    EmptySearchSpace {
        /// Why nothing survived
        reason: String,
    },

    /// Configuration or execution failure of a candidate run.
    #[error(transparent)]
    Run(#[from] RunError),
}

impl From<ConfigError> for OptimiserError {
    fn from(err: ConfigError) -> Self {
        OptimiserError::Run(RunError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_wraps_as_run() {
        let err: OptimiserError = ConfigError::invalid("step", "must be positive").into();
        assert!(matches!(err, OptimiserError::Run(RunError::Config(_))));
        assert!(err.to_string().contains("step"));
    }

    #[test]
    fn test_run_error_transparent() {
        let err = OptimiserError::from(RunError::Cancelled);
        assert_eq!(err.to_string(), RunError::Cancelled.to_string());
    }
}
