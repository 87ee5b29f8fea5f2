//! Two-state regime chain.
//!
//! The regime is an explicit per-scenario state advanced once per period by
//! [`RegimeDynamics::advance`]. It selects which drift/volatility pair the
//! structural default model uses.

use serde::{Deserialize, Serialize};
use tranche_core::types::ConfigError;

const ROW_TOL: f64 = 1e-9;

/// Economic regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Ordinary conditions.
    #[default]
    Normal,
    /// Stressed conditions.
    Stress,
}

impl Regime {
    /// Row/column index in a transition matrix.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Regime::Normal => 0,
            Regime::Stress => 1,
        }
    }
}

/// Row-stochastic 2×2 transition matrix, `p[from][to]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionMatrix(pub [[f64; 2]; 2]);

impl TransitionMatrix {
    /// Validate that each row is a probability vector.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter` naming the offending row.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, row) in self.0.iter().enumerate() {
            if row.iter().any(|p| !(0.0..=1.0).contains(p)) {
                return Err(ConfigError::invalid(
                    format!("regime.transition[{}]", i),
                    "probabilities must lie in [0, 1]",
                ));
            }
            let sum = row[0] + row[1];
            if (sum - 1.0).abs() > ROW_TOL {
                return Err(ConfigError::invalid(
                    format!("regime.transition[{}]", i),
                    format!("row sums to {}, expected 1", sum),
                ));
            }
        }
        Ok(())
    }

    /// Next regime from `from` given a uniform draw `u`.
    #[inline]
    pub fn next(&self, from: Regime, u: f64) -> Regime {
        if u < self.0[from.index()][0] {
            Regime::Normal
        } else {
            Regime::Stress
        }
    }

    /// Long-run probability of the Stress regime.
    pub fn stationary_stress(&self) -> f64 {
        let to_stress = self.0[0][1];
        let to_normal = self.0[1][0];
        let total = to_stress + to_normal;
        if total <= 0.0 {
            0.0
        } else {
            to_stress / total
        }
    }
}

/// How the regime evolves within a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegimeDynamics {
    /// Markov chain driven by the regime factor's uniform draw.
    Markov {
        /// Transition probabilities
        transition: TransitionMatrix,
    },
    /// Each period independently: Stress when the regime factor's value is one.
    Independent,
}

impl Default for RegimeDynamics {
    fn default() -> Self {
        RegimeDynamics::Markov {
            transition: TransitionMatrix([[1.0, 0.0], [0.0, 1.0]]),
        }
    }
}

impl RegimeDynamics {
    /// Transition function: regime for this period given last period's.
    ///
    /// # Arguments
    ///
    /// * `prev` - Regime in the previous period (Normal before period zero)
    /// * `u` - Uniform draw of the regime factor
    /// * `value` - Marginal value of the regime factor
    #[inline]
    pub fn advance(&self, prev: Regime, u: f64, value: f64) -> Regime {
        match self {
            RegimeDynamics::Markov { transition } => transition.next(prev, u),
            RegimeDynamics::Independent => {
                if value >= 0.5 {
                    Regime::Stress
                } else {
                    Regime::Normal
                }
            }
        }
    }

    /// Whether a scenario starting in Normal can ever enter Stress.
    #[inline]
    pub fn switches(&self) -> bool {
        match self {
            RegimeDynamics::Markov { transition } => transition.0[0][0] < 1.0,
            RegimeDynamics::Independent => true,
        }
    }

    /// Validate the transition matrix, if any.
    ///
    /// # Errors
    ///
    /// See [`TransitionMatrix::validate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            RegimeDynamics::Markov { transition } => transition.validate(),
            RegimeDynamics::Independent => Ok(()),
        }
    }
}
