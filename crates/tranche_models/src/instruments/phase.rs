//! Project phases and covenant thresholds.

use serde::{Deserialize, Serialize};
use tranche_core::types::ConfigError;

/// Life-cycle phase of the project.
///
/// Phases advance monotonically: Grace, then Ramp, then Steady, then
/// Wound-down once every tranche has been scheduled to repay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPhase {
    /// Construction or early operation; DSRA draws permitted.
    Grace,
    /// Ramp-up towards nameplate output.
    Ramp,
    /// Steady-state operation.
    Steady,
    /// After the last scheduled principal repayment.
    WoundDown,
}

impl ProjectPhase {
    /// Whether the DSRA may be drawn to meet debt service.
    #[inline]
    pub fn permits_dsra_draw(self) -> bool {
        matches!(self, ProjectPhase::Grace)
    }
}

fn grace_threshold() -> f64 {
    1.00
}
fn ramp_threshold() -> f64 {
    1.15
}
fn steady_threshold() -> f64 {
    1.25
}
fn wound_down_threshold() -> f64 {
    1.00
}

/// Minimum DSCR per phase.
///
/// # Examples
/// ```
/// use tranche_models::instruments::{CovenantSchedule, ProjectPhase};
///
/// let covenants = CovenantSchedule::default();
/// assert_eq!(covenants.threshold(ProjectPhase::Ramp), 1.15);
/// assert_eq!(covenants.threshold(ProjectPhase::Steady), 1.25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CovenantSchedule {
    /// Threshold during Grace.
    #[serde(default = "grace_threshold")]
    pub grace: f64,
    /// Threshold during Ramp.
    #[serde(default = "ramp_threshold")]
    pub ramp: f64,
    /// Threshold during Steady.
    #[serde(default = "steady_threshold")]
    pub steady: f64,
    /// Threshold during Wound-down.
    #[serde(default = "wound_down_threshold")]
    pub wound_down: f64,
}

impl Default for CovenantSchedule {
    fn default() -> Self {
        Self {
            grace: grace_threshold(),
            ramp: ramp_threshold(),
            steady: steady_threshold(),
            wound_down: wound_down_threshold(),
        }
    }
}

impl CovenantSchedule {
    /// Threshold active in `phase`.
    #[inline]
    pub fn threshold(&self, phase: ProjectPhase) -> f64 {
        match phase {
            ProjectPhase::Grace => self.grace,
            ProjectPhase::Ramp => self.ramp,
            ProjectPhase::Steady => self.steady,
            ProjectPhase::WoundDown => self.wound_down,
        }
    }

    /// Reject negative or non-finite thresholds.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter` naming the offending phase.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, v) in [
            ("covenants.grace", self.grace),
            ("covenants.ramp", self.ramp),
            ("covenants.steady", self.steady),
            ("covenants.wound_down", self.wound_down),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ConfigError::invalid(name, "must be a non-negative number"));
            }
        }
        Ok(())
    }
}

/// Phase boundaries in periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseSchedule {
    /// Number of Grace periods from the start.
    #[serde(default)]
    pub grace_periods: usize,
    /// Number of Ramp periods following Grace.
    #[serde(default)]
    pub ramp_periods: usize,
}

impl PhaseSchedule {
    /// Phase of period `t` given the first period with no scheduled principal left.
    pub fn phase_at(&self, t: usize, wind_down_from: usize) -> ProjectPhase {
        if t >= wind_down_from {
            ProjectPhase::WoundDown
        } else if t < self.grace_periods {
            ProjectPhase::Grace
        } else if t < self.grace_periods + self.ramp_periods {
            ProjectPhase::Ramp
        } else {
            ProjectPhase::Steady
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_sequence() {
        let s = PhaseSchedule {
            grace_periods: 2,
            ramp_periods: 1,
        };
        let phases: Vec<_> = (0..6).map(|t| s.phase_at(t, 5)).collect();
        assert_eq!(
            phases,
            vec![
                ProjectPhase::Grace,
                ProjectPhase::Grace,
                ProjectPhase::Ramp,
                ProjectPhase::Steady,
                ProjectPhase::Steady,
                ProjectPhase::WoundDown,
            ]
        );
    }

    #[test]
    fn test_wind_down_overrides_grace() {
        let s = PhaseSchedule {
            grace_periods: 10,
            ramp_periods: 0,
        };
        assert_eq!(s.phase_at(3, 3), ProjectPhase::WoundDown);
    }

    #[test]
    fn test_only_grace_permits_draws() {
        assert!(ProjectPhase::Grace.permits_dsra_draw());
        assert!(!ProjectPhase::Ramp.permits_dsra_draw());
        assert!(!ProjectPhase::Steady.permits_dsra_draw());
        assert!(!ProjectPhase::WoundDown.permits_dsra_draw());
    }

    #[test]
    fn test_default_thresholds() {
        let c = CovenantSchedule::default();
        assert_eq!(c.threshold(ProjectPhase::Grace), 1.00);
        assert_eq!(c.threshold(ProjectPhase::WoundDown), 1.00);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let c = CovenantSchedule {
            ramp: -0.1,
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }
}
