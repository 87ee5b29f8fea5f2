//! Error types for structured error handling.
//!
//! This module provides:
//! - `ConfigError`: configuration problems detected before any scenario runs
//! - `SolverError`: errors from root-finding solvers

use thiserror::Error;

/// Configuration errors.
///
/// Every variant is raised while the simulation context is being built, so a
/// run either starts with a fully valid configuration or not at all.
///
/// # Examples
/// ```
/// use tranche_core::types::ConfigError;
///
/// let err = ConfigError::WeightsNotNormalised { sum: 0.9 };
/// assert!(format!("{}", err).contains("0.9"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Correlation matrix has a negative eigenvalue and no repair floor was configured.
    #[error("Correlation matrix is not positive semi-definite: minimum eigenvalue {min_eigenvalue}")]
    NotPositiveSemiDefinite {
        /// Most negative eigenvalue found
        min_eigenvalue: f64,
    },

    /// Correlation matrix is not square, not symmetric, or has invalid entries.
    #[error("Malformed correlation matrix: {0}")]
    MalformedCorrelation(String),

    /// Tranche weights do not sum to one.
    #[error("Tranche weights sum to {sum}, expected 1")]
    WeightsNotNormalised {
        /// Actual sum of the weights
        sum: f64,
    },

    /// A tranche weight is negative.
    #[error("Tranche weight {weight} at index {index} is negative")]
    NegativeWeight {
        /// Position of the offending weight
        index: usize,
        /// Offending weight
        weight: f64,
    },

    /// Number of weights does not match the number of tranches.
    #[error("Expected {expected} tranche weights, got {got}")]
    WeightCountMismatch {
        /// Number of tranches in the template structure
        expected: usize,
        /// Number of weights supplied
        got: usize,
    },

    /// A required baseline series is absent.
    #[error("Missing required baseline field: {field}")]
    MissingBaselineField {
        /// Name of the missing field
        field: String,
    },

    /// A baseline series has the wrong number of periods.
    #[error("Baseline field {field} has {got} periods, expected {expected}")]
    BaselineLengthMismatch {
        /// Name of the field
        field: String,
        /// Expected number of periods
        expected: usize,
        /// Actual number of periods
        got: usize,
    },

    /// A scalar parameter is out of range.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Why the value was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidParameter`].
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Solver error types for root-finding algorithms.
///
/// # Examples
/// ```
/// use tranche_core::types::SolverError;
///
/// let err = SolverError::MaxIterationsExceeded { iterations: 100 };
/// assert!(format!("{}", err).contains("100 iterations"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Solver failed to converge within maximum iterations.
    #[error("Failed to converge after {iterations} iterations")]
    MaxIterationsExceeded {
        /// Number of iterations attempted
        iterations: usize,
    },

    /// No valid bracket (function values at endpoints have same sign).
    #[error("No bracket: f({a}) and f({b}) have same sign")]
    NoBracket {
        /// Left bracket endpoint
        a: f64,
        /// Right bracket endpoint
        b: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_psd_display() {
        let err = ConfigError::NotPositiveSemiDefinite {
            min_eigenvalue: -0.25,
        };
        assert_eq!(
            format!("{}", err),
            "Correlation matrix is not positive semi-definite: minimum eigenvalue -0.25"
        );
    }

    #[test]
    fn test_missing_field_display() {
        let err = ConfigError::MissingBaselineField {
            field: "revenue".to_string(),
        };
        assert_eq!(format!("{}", err), "Missing required baseline field: revenue");
    }

    #[test]
    fn test_invalid_shorthand() {
        let err = ConfigError::invalid("batch_size", "must be positive");
        assert_eq!(
            err,
            ConfigError::InvalidParameter {
                name: "batch_size".to_string(),
                reason: "must be positive".to_string(),
            }
        );
    }

    #[test]
    fn test_no_bracket_display() {
        let err = SolverError::NoBracket { a: 1.0, b: 2.0 };
        assert_eq!(format!("{}", err), "No bracket: f(1) and f(2) have same sign");
    }
}
