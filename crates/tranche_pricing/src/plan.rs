//! Scenario groups and the mapping from run index to scenario coordinates.
//!
//! A run of `N` scenarios is split across [`ScenarioGroup`]s (for example a
//! base case and one or more shock cases) in proportion to their `share`.
//! Each scenario is identified by `(group, index within group)`, which is
//! what seeds its random streams. [`Blending`] decides how scenarios are
//! weighted when they are aggregated.

use crate::rng::splitmix64;
use serde::{Deserialize, Serialize};
use tranche_core::types::ConfigError;

fn one() -> f64 {
    1.0
}

/// How scenarios from different groups are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Blending {
    /// Every scenario counts equally.
    #[default]
    Uniform,
    /// Each group contributes in proportion to its `probability`,
    /// spread evenly over its scenarios.
    ScenarioWeighted,
}

/// A family of scenarios sharing deterministic overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioGroup {
    /// Name used in logs and reports.
    pub name: String,
    /// Relative share of the run's scenarios.
    #[serde(default = "one")]
    pub share: f64,
    /// Probability weight under [`Blending::ScenarioWeighted`].
    #[serde(default = "one")]
    pub probability: f64,
    /// Multiplier applied to shocked revenue.
    #[serde(default = "one")]
    pub revenue_multiplier: f64,
    /// Multiplier applied to shocked opex.
    #[serde(default = "one")]
    pub opex_multiplier: f64,
    /// Additive shift to the simulated short rate.
    #[serde(default)]
    pub rate_shift: f64,
    /// Hold the regime in Stress for every period.
    #[serde(default)]
    pub force_stress: bool,
}

impl ScenarioGroup {
    /// Unshocked base group.
    pub fn base() -> Self {
        Self {
            name: "base".to_string(),
            share: 1.0,
            probability: 1.0,
            revenue_multiplier: 1.0,
            opex_multiplier: 1.0,
            rate_shift: 0.0,
            force_stress: false,
        }
    }

    fn validate(&self, i: usize) -> Result<(), ConfigError> {
        let name = |f: &str| format!("groups[{}].{}", i, f);
        if !(self.share.is_finite() && self.share > 0.0) {
            return Err(ConfigError::invalid(name("share"), "must be positive"));
        }
        if !self.probability.is_finite() || self.probability < 0.0 {
            return Err(ConfigError::invalid(name("probability"), "must be non-negative"));
        }
        for (f, v) in [
            ("revenue_multiplier", self.revenue_multiplier),
            ("opex_multiplier", self.opex_multiplier),
            ("rate_shift", self.rate_shift),
        ] {
            if !v.is_finite() {
                return Err(ConfigError::invalid(name(f), "must be finite"));
            }
        }
        Ok(())
    }
}

/// Identity of one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScenarioId {
    /// Group index.
    pub group: usize,
    /// Index within the group.
    pub index: usize,
}

impl ScenarioId {
    /// Order-independent sampling key, used by mergeable sketches.
    #[inline]
    pub fn sample_key(&self) -> u64 {
        splitmix64(splitmix64(self.group as u64 ^ 0xA5A5_A5A5) ^ self.index as u64)
    }
}

/// Everything needed to evaluate the scenario at one run index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioSlot {
    /// Scenario identity.
    pub id: ScenarioId,
    /// Scenarios in the same group (antithetic pairing is within a group).
    pub group_count: usize,
    /// Aggregation weight.
    pub weight: f64,
}

/// Allocation of a run's scenarios to groups.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioPlan {
    groups: Vec<ScenarioGroup>,
    starts: Vec<usize>,
    counts: Vec<usize>,
    weights: Vec<f64>,
    total: usize,
}

impl ScenarioPlan {
    /// Split `scenario_count` across `groups` by largest remainder on `share`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter` for an empty group list,
    /// invalid group parameters, or zero total probability under
    /// scenario-weighted blending.
    ///
    /// # Examples
    /// ```
    /// use tranche_pricing::plan::{Blending, ScenarioGroup, ScenarioPlan};
    ///
    /// let stress = ScenarioGroup { name: "stress".into(), share: 1.0, ..ScenarioGroup::base() };
    /// let plan = ScenarioPlan::new(&[ScenarioGroup::base(), stress], 11, Blending::Uniform).unwrap();
    /// assert_eq!(plan.count(0) + plan.count(1), 11);
    /// assert_eq!(plan.slot(10).id.group, 1);
    /// ```
    pub fn new(
        groups: &[ScenarioGroup],
        scenario_count: usize,
        blending: Blending,
    ) -> Result<Self, ConfigError> {
        if groups.is_empty() {
            return Err(ConfigError::invalid("groups", "at least one scenario group is required"));
        }
        for (i, g) in groups.iter().enumerate() {
            g.validate(i)?;
        }

        let share_total: f64 = groups.iter().map(|g| g.share).sum();
        let exact: Vec<f64> = groups
            .iter()
            .map(|g| g.share / share_total * scenario_count as f64)
            .collect();
        let mut counts: Vec<usize> = exact.iter().map(|x| x.floor() as usize).collect();
        let mut remaining = scenario_count - counts.iter().sum::<usize>();
        let mut order: Vec<usize> = (0..groups.len()).collect();
        order.sort_by(|&a, &b| {
            let ra = exact[a] - exact[a].floor();
            let rb = exact[b] - exact[b].floor();
            rb.total_cmp(&ra).then(a.cmp(&b))
        });
        for &g in order.iter().cycle() {
            if remaining == 0 {
                break;
            }
            counts[g] += 1;
            remaining -= 1;
        }

        let weights = match blending {
            Blending::Uniform => vec![1.0; groups.len()],
            Blending::ScenarioWeighted => {
                let p_total: f64 = groups.iter().map(|g| g.probability).sum();
                if p_total <= 0.0 {
                    return Err(ConfigError::invalid(
                        "groups.probability",
                        "scenario-weighted blending needs positive total probability",
                    ));
                }
                groups
                    .iter()
                    .zip(&counts)
                    .map(|(g, &c)| {
                        if c == 0 {
                            0.0
                        } else {
                            g.probability / p_total / c as f64
                        }
                    })
                    .collect()
            }
        };

        let mut starts = Vec::with_capacity(groups.len());
        let mut acc = 0;
        for &c in &counts {
            starts.push(acc);
            acc += c;
        }

        Ok(Self {
            groups: groups.to_vec(),
            starts,
            counts,
            weights,
            total: scenario_count,
        })
    }

    /// Total scenarios in the run.
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Scenarios allocated to group `g`.
    #[inline]
    pub fn count(&self, g: usize) -> usize {
        self.counts[g]
    }

    /// Group definitions.
    #[inline]
    pub fn groups(&self) -> &[ScenarioGroup] {
        &self.groups
    }

    /// Group `g`.
    #[inline]
    pub fn group(&self, g: usize) -> &ScenarioGroup {
        &self.groups[g]
    }

    /// Coordinates and weight of run index `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= total()`.
    pub fn slot(&self, i: usize) -> ScenarioSlot {
        assert!(i < self.total, "scenario index {} out of range", i);
        let g = self.starts.partition_point(|&s| s <= i) - 1;
        // Skip empty groups sharing the same start.
        let g = (0..=g).rev().find(|&k| self.counts[k] > 0 && self.starts[k] <= i).unwrap_or(g);
        ScenarioSlot {
            id: ScenarioId {
                group: g,
                index: i - self.starts[g],
            },
            group_count: self.counts[g],
            weight: self.weights[g],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups() -> Vec<ScenarioGroup> {
        vec![
            ScenarioGroup {
                share: 3.0,
                probability: 0.9,
                ..ScenarioGroup::base()
            },
            ScenarioGroup {
                name: "shock".into(),
                share: 1.0,
                probability: 0.1,
                revenue_multiplier: 0.8,
                ..ScenarioGroup::base()
            },
        ]
    }

    #[test]
    fn test_counts_follow_shares() {
        let plan = ScenarioPlan::new(&groups(), 100, Blending::Uniform).unwrap();
        assert_eq!(plan.count(0), 75);
        assert_eq!(plan.count(1), 25);
    }

    #[test]
    fn test_largest_remainder() {
        let plan = ScenarioPlan::new(&groups(), 10, Blending::Uniform).unwrap();
        assert_eq!(plan.count(0) + plan.count(1), 10);
        assert_eq!(plan.count(0), 8);
    }

    #[test]
    fn test_slot_mapping() {
        let plan = ScenarioPlan::new(&groups(), 100, Blending::Uniform).unwrap();
        assert_eq!(plan.slot(0).id, ScenarioId { group: 0, index: 0 });
        assert_eq!(plan.slot(74).id, ScenarioId { group: 0, index: 74 });
        assert_eq!(plan.slot(75).id, ScenarioId { group: 1, index: 0 });
        assert_eq!(plan.slot(99).group_count, 25);
    }

    #[test]
    fn test_scenario_weighted_totals_one() {
        let plan = ScenarioPlan::new(&groups(), 100, Blending::ScenarioWeighted).unwrap();
        let total: f64 = (0..100).map(|i| plan.slot(i).weight).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((plan.slot(99).weight - 0.1 / 25.0).abs() < 1e-15);
    }

    #[test]
    fn test_empty_group_is_skipped() {
        let mut g = groups();
        g.insert(
            1,
            ScenarioGroup {
                name: "tiny".into(),
                share: 1e-6,
                ..ScenarioGroup::base()
            },
        );
        let plan = ScenarioPlan::new(&g, 4, Blending::Uniform).unwrap();
        for i in 0..4 {
            let slot = plan.slot(i);
            assert!(plan.count(slot.id.group) > 0);
        }
    }

    #[test]
    fn test_no_groups_rejected() {
        assert!(ScenarioPlan::new(&[], 10, Blending::Uniform).is_err());
    }

    #[test]
    fn test_sample_keys_differ() {
        let a = ScenarioId { group: 0, index: 1 }.sample_key();
        let b = ScenarioId { group: 1, index: 0 }.sample_key();
        assert_ne!(a, b);
    }
}
