//! Error types for the scenario engine.

use thiserror::Error;
use tranche_core::types::ConfigError;

/// Errors raised while assembling a [`SimulationContext`](crate::SimulationContext).
///
/// Nothing inside the scenario loop returns an error: numerical anomalies are
/// clipped and counted, and shortfalls are outcomes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A required builder input was not supplied.
    #[error("Missing simulation input: {0}")]
    MissingInput(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_is_transparent() {
        let err: SimulationError = ConfigError::WeightsNotNormalised { sum: 0.5 }.into();
        assert_eq!(err.to_string(), "Tranche weights sum to 0.5, expected 1");
    }

    #[test]
    fn test_missing_input_display() {
        let err = SimulationError::MissingInput("baseline");
        assert_eq!(err.to_string(), "Missing simulation input: baseline");
    }
}
