//! Debt-service and maintenance reserve accounts.
//!
//! Balances live in [`ReserveAccount`], which can never go negative. The
//! funding rules are plain configuration: [`DsraConfig`] sizes the debt
//! service reserve against scheduled debt service, and [`MraConfig`] turns a
//! list of major-maintenance events into a per-period contribution and
//! target schedule ([`MraSchedule`]).

use serde::{Deserialize, Serialize};
use tranche_core::types::ConfigError;

/// A reserve balance that never goes negative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReserveAccount {
    balance: f64,
}

impl ReserveAccount {
    /// Open an account with `balance` (negative values are floored at zero).
    pub fn new(balance: f64) -> Self {
        Self {
            balance: balance.max(0.0),
        }
    }

    /// Current balance.
    #[inline]
    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Add `amount` (ignored if not positive).
    #[inline]
    pub fn deposit(&mut self, amount: f64) {
        if amount > 0.0 {
            self.balance += amount;
        }
    }

    /// Withdraw up to `amount`; returns what was actually withdrawn.
    #[inline]
    pub fn withdraw(&mut self, amount: f64) -> f64 {
        let taken = amount.max(0.0).min(self.balance);
        self.balance -= taken;
        taken
    }

    /// Withdraw everything.
    #[inline]
    pub fn drain(&mut self) -> f64 {
        std::mem::take(&mut self.balance)
    }
}

fn default_target_coverage() -> f64 {
    1.0
}

/// Debt service reserve account terms.
///
/// The target balance in period `t` is `target_coverage` times the next
/// period's scheduled debt service; in the final period it is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DsraConfig {
    /// Balance funded at financial close.
    #[serde(default)]
    pub initial_balance: f64,
    /// Multiple of next-period scheduled debt service to hold.
    #[serde(default = "default_target_coverage")]
    pub target_coverage: f64,
}

impl Default for DsraConfig {
    fn default() -> Self {
        Self {
            initial_balance: 0.0,
            target_coverage: default_target_coverage(),
        }
    }
}

impl DsraConfig {
    /// Reject negative balances and coverage.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_balance.is_finite() || self.initial_balance < 0.0 {
            return Err(ConfigError::invalid("dsra.initial_balance", "must be non-negative"));
        }
        if !self.target_coverage.is_finite() || self.target_coverage < 0.0 {
            return Err(ConfigError::invalid("dsra.target_coverage", "must be non-negative"));
        }
        Ok(())
    }
}

/// A scheduled major-maintenance outlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceEvent {
    /// Period in which the outlay falls due.
    pub period: usize,
    /// Cost of the outlay.
    pub cost: f64,
}

/// Maintenance reserve account terms.
///
/// Each event is pre-funded by equal contributions over the `funding_window`
/// periods immediately before it, together totalling `funding_fraction` of
/// its cost. Windows reaching before period zero are truncated. Overlapping
/// windows add.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MraConfig {
    /// Scheduled events.
    #[serde(default)]
    pub events: Vec<MaintenanceEvent>,
    /// Number of periods over which each event is funded.
    #[serde(default)]
    pub funding_window: usize,
    /// Fraction of each event's cost funded in advance.
    #[serde(default)]
    pub funding_fraction: f64,
}

impl MraConfig {
    /// Validate against a horizon of `n_periods`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter` for events outside the horizon,
    /// negative costs, a zero window with events present, or a fraction
    /// outside `[0, 1]`.
    pub fn validate(&self, n_periods: usize) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.funding_fraction) {
            return Err(ConfigError::invalid("mra.funding_fraction", "must lie in [0, 1]"));
        }
        if !self.events.is_empty() && self.funding_window == 0 {
            return Err(ConfigError::invalid("mra.funding_window", "must be positive"));
        }
        for (i, e) in self.events.iter().enumerate() {
            if e.period >= n_periods {
                return Err(ConfigError::invalid(
                    format!("mra.events[{}].period", i),
                    format!("{} is beyond the {}-period horizon", e.period, n_periods),
                ));
            }
            if !e.cost.is_finite() || e.cost < 0.0 {
                return Err(ConfigError::invalid(
                    format!("mra.events[{}].cost", i),
                    "must be non-negative",
                ));
            }
        }
        Ok(())
    }

    /// Expand the events into per-period contribution, target and release schedules.
    ///
    /// # Errors
    ///
    /// Returns any error from [`MraConfig::validate`].
    ///
    /// # Examples
    /// ```
    /// use tranche_models::instruments::{MaintenanceEvent, MraConfig};
    ///
    /// let mra = MraConfig {
    ///     events: vec![
    ///         MaintenanceEvent { period: 4, cost: 30.0 },
    ///         MaintenanceEvent { period: 5, cost: 60.0 },
    ///     ],
    ///     funding_window: 3,
    ///     funding_fraction: 1.0,
    /// };
    /// let schedule = mra.schedule(6).unwrap();
    /// // Period 2 funds both events: 10 + 20.
    /// assert!((schedule.contribution(2) - 30.0).abs() < 1e-12);
    /// ```
    pub fn schedule(&self, n_periods: usize) -> Result<MraSchedule, ConfigError> {
        self.validate(n_periods)?;

        let mut contribution = vec![0.0; n_periods];
        let mut release_cost = vec![0.0; n_periods];
        let mut target = vec![0.0; n_periods];

        for e in &self.events {
            release_cost[e.period] += e.cost;
            let per_period = self.funding_fraction * e.cost / self.funding_window as f64;
            let start = e.period.saturating_sub(self.funding_window);
            let mut accrued = 0.0;
            for (t, slot) in contribution.iter_mut().enumerate().take(e.period).skip(start) {
                *slot += per_period;
                accrued += per_period;
                target[t] += accrued;
            }
        }

        Ok(MraSchedule {
            contribution,
            release_cost,
            target,
        })
    }
}

/// Per-period MRA schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct MraSchedule {
    contribution: Vec<f64>,
    release_cost: Vec<f64>,
    target: Vec<f64>,
}

impl MraSchedule {
    /// Empty schedule over `n_periods`.
    pub fn empty(n_periods: usize) -> Self {
        Self {
            contribution: vec![0.0; n_periods],
            release_cost: vec![0.0; n_periods],
            target: vec![0.0; n_periods],
        }
    }

    /// Scheduled contribution in period `t`.
    #[inline]
    pub fn contribution(&self, t: usize) -> f64 {
        self.contribution[t]
    }

    /// Cost of events falling due in period `t`.
    #[inline]
    pub fn release_cost(&self, t: usize) -> f64 {
        self.release_cost[t]
    }

    /// Target balance at the end of period `t`: contributions scheduled to
    /// date for events still in the future.
    #[inline]
    pub fn target(&self, t: usize) -> f64 {
        self.target[t]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn overlapping() -> MraConfig {
        MraConfig {
            events: vec![
                MaintenanceEvent {
                    period: 4,
                    cost: 30.0,
                },
                MaintenanceEvent {
                    period: 5,
                    cost: 60.0,
                },
            ],
            funding_window: 3,
            funding_fraction: 1.0,
        }
    }

    #[test]
    fn test_overlapping_windows_accumulate() {
        let s = overlapping().schedule(6).unwrap();
        assert_relative_eq!(s.contribution(0), 0.0);
        assert_relative_eq!(s.contribution(1), 10.0);
        assert_relative_eq!(s.contribution(2), 30.0);
        assert_relative_eq!(s.contribution(3), 30.0);
        assert_relative_eq!(s.contribution(4), 20.0);
        assert_relative_eq!(s.contribution(5), 0.0);
    }

    #[test]
    fn test_target_tracks_future_events() {
        let s = overlapping().schedule(6).unwrap();
        assert_relative_eq!(s.target(1), 10.0);
        assert_relative_eq!(s.target(2), 40.0);
        assert_relative_eq!(s.target(3), 70.0);
        // Event at 4 no longer counts; 60 for the event at 5 is fully funded.
        assert_relative_eq!(s.target(4), 60.0);
        assert_relative_eq!(s.target(5), 0.0);
        assert_relative_eq!(s.release_cost(4), 30.0);
    }

    #[test]
    fn test_window_truncated_at_start() {
        let mra = MraConfig {
            events: vec![MaintenanceEvent {
                period: 1,
                cost: 40.0,
            }],
            funding_window: 4,
            funding_fraction: 0.5,
        };
        let s = mra.schedule(3).unwrap();
        assert_relative_eq!(s.contribution(0), 5.0);
        assert_relative_eq!(s.target(0), 5.0);
        assert_relative_eq!(s.contribution(1), 0.0);
    }

    #[test]
    fn test_event_beyond_horizon_rejected() {
        let mra = MraConfig {
            events: vec![MaintenanceEvent {
                period: 6,
                cost: 1.0,
            }],
            funding_window: 2,
            funding_fraction: 1.0,
        };
        assert!(mra.schedule(6).is_err());
    }

    #[test]
    fn test_account_never_negative() {
        let mut acc = ReserveAccount::new(10.0);
        assert_eq!(acc.withdraw(25.0), 10.0);
        assert_eq!(acc.balance(), 0.0);
        acc.deposit(-5.0);
        assert_eq!(acc.balance(), 0.0);
        acc.deposit(3.0);
        assert_eq!(acc.drain(), 3.0);
    }

    proptest! {
        #[test]
        fn prop_balance_stays_non_negative(ops in proptest::collection::vec(-100.0f64..100.0, 1..50)) {
            let mut acc = ReserveAccount::new(0.0);
            for op in ops {
                if op >= 0.0 {
                    acc.deposit(op);
                } else {
                    acc.withdraw(-op);
                }
                prop_assert!(acc.balance() >= 0.0);
            }
        }

        #[test]
        fn prop_contributions_total_fraction_of_cost(
            period in 3usize..10,
            cost in 0.0f64..1_000.0,
            window in 1usize..4,
        ) {
            let mra = MraConfig {
                events: vec![MaintenanceEvent { period, cost }],
                funding_window: window,
                funding_fraction: 0.8,
            };
            let s = mra.schedule(10).unwrap();
            let total: f64 = (0..10).map(|t| s.contribution(t)).sum();
            prop_assert!((total - 0.8 * cost).abs() < 1e-9 * (1.0 + cost));
        }
    }
}
