//! Correlated stochastic variable generation.
//!
//! For every scenario and period the generator draws independent standard
//! normals, correlates them through the Cholesky factor of the configured
//! correlation matrix, and maps each factor through its [`Marginal`].
//!
//! # Antithetic pairing
//!
//! With `antithetic` enabled, the second half of each scenario group
//! (indices `ceil(n/2)..n`) reuses the draws of the first half with every
//! independent normal negated. Scenario `i + ceil(n/2)` is the partner of
//! scenario `i`; with an odd group size the middle scenario is unpaired.
//!
//! # Examples
//!
//! ```
//! use tranche_pricing::generator::{FactorSpec, GeneratorConfig, Marginal, RiskFactor, ScenarioGenerator};
//! use tranche_pricing::plan::{ScenarioId, ScenarioSlot};
//!
//! let config = GeneratorConfig {
//!     factors: vec![
//!         FactorSpec::level(RiskFactor::RevenueGrowth, Marginal::LogNormal { mu: None, sigma: 0.15 }),
//!         FactorSpec::level(RiskFactor::OpexInflation, Marginal::LogNormal { mu: None, sigma: 0.10 }),
//!     ],
//!     correlation: Some(vec![vec![1.0, 0.4], vec![0.4, 1.0]]),
//!     ..GeneratorConfig::default()
//! };
//! let (generator, repair) = ScenarioGenerator::new(&config, 4, 1).unwrap();
//! assert!(repair.is_none());
//!
//! let slot = ScenarioSlot { id: ScenarioId { group: 0, index: 0 }, group_count: 10, weight: 1.0 };
//! let scenario = generator.generate(42, &slot);
//! assert!(scenario.value(0, 0) > 0.0);
//! ```

mod marginal;

pub use marginal::{Marginal, U_CLAMP};

use crate::plan::{ScenarioId, ScenarioSlot};
use crate::rng::{ScenarioRng, SubStream};
use marginal::PreparedMarginal;
use serde::{Deserialize, Serialize};
use tranche_core::math::distributions::norm_cdf;
use tranche_core::math::linalg::{CholeskyFactor, CorrelationMatrix, PsdRepair};
use tranche_core::types::ConfigError;

/// A stochastic driver of the project's cash flows or credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    /// Multiplier on baseline revenue.
    RevenueGrowth,
    /// Multiplier on baseline opex.
    OpexInflation,
    /// Shock to the short rate; its `z` drives the rate recursion.
    ShortRate,
    /// Regime driver; its uniform feeds the regime transition.
    Regime,
    /// Systematic asset-value shock shared by every tranche.
    AssetValue,
}

impl RiskFactor {
    /// Configuration name.
    pub fn as_str(self) -> &'static str {
        match self {
            RiskFactor::RevenueGrowth => "revenue_growth",
            RiskFactor::OpexInflation => "opex_inflation",
            RiskFactor::ShortRate => "short_rate",
            RiskFactor::Regime => "regime",
            RiskFactor::AssetValue => "asset_value",
        }
    }
}

/// How a multiplicative factor is applied across periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShockApplication {
    /// The period's draw multiplies that period's baseline.
    #[default]
    Level,
    /// Draws compound: period `t` uses the product of draws `0..=t`.
    Cumulative,
}

/// One factor and its marginal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorSpec {
    /// Which driver this is.
    pub factor: RiskFactor,
    /// Marginal distribution.
    pub marginal: Marginal,
    /// Level or cumulative application.
    #[serde(default)]
    pub application: ShockApplication,
}

impl FactorSpec {
    /// Level-applied factor.
    pub fn level(factor: RiskFactor, marginal: Marginal) -> Self {
        Self {
            factor,
            marginal,
            application: ShockApplication::Level,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_floor() -> f64 {
    1e-8
}

/// Generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Factors in correlation-matrix order.
    #[serde(default)]
    pub factors: Vec<FactorSpec>,
    /// Correlation between factors; identity when absent.
    #[serde(default)]
    pub correlation: Option<Vec<Vec<f64>>>,
    /// Pair each scenario with its negated twin.
    #[serde(default)]
    pub antithetic: bool,
    /// Repair a non-PSD matrix by eigenvalue clipping instead of failing.
    #[serde(default = "default_true")]
    pub repair_non_psd: bool,
    /// Eigenvalue floor used by the repair.
    #[serde(default = "default_floor")]
    pub eigenvalue_floor: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            factors: Vec::new(),
            correlation: None,
            antithetic: false,
            repair_non_psd: true,
            eigenvalue_floor: default_floor(),
        }
    }
}

/// Column of each risk factor, if configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FactorIndex {
    /// Revenue growth column.
    pub revenue: Option<usize>,
    /// Opex inflation column.
    pub opex: Option<usize>,
    /// Short-rate shock column.
    pub rate: Option<usize>,
    /// Regime driver column.
    pub regime: Option<usize>,
    /// Systematic asset shock column.
    pub asset: Option<usize>,
}

impl FactorIndex {
    fn slot(&mut self, factor: RiskFactor) -> &mut Option<usize> {
        match factor {
            RiskFactor::RevenueGrowth => &mut self.revenue,
            RiskFactor::OpexInflation => &mut self.opex,
            RiskFactor::ShortRate => &mut self.rate,
            RiskFactor::Regime => &mut self.regime,
            RiskFactor::AssetValue => &mut self.asset,
        }
    }
}

/// Correlated draws for one scenario.
///
/// Per-factor arrays are period-major: entry `(t, f)` is at `t * n_factors + f`.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    id: ScenarioId,
    antithetic: bool,
    n_periods: usize,
    n_factors: usize,
    n_tranches: usize,
    z: Vec<f64>,
    u: Vec<f64>,
    value: Vec<f64>,
    idio: Vec<f64>,
}

impl Scenario {
    /// Scenario identity.
    #[inline]
    pub fn id(&self) -> ScenarioId {
        self.id
    }

    /// Whether the draws are the negated twin of another scenario's.
    #[inline]
    pub fn is_antithetic(&self) -> bool {
        self.antithetic
    }

    /// Number of periods.
    #[inline]
    pub fn n_periods(&self) -> usize {
        self.n_periods
    }

    /// Correlated standard normal for factor `f` in period `t`.
    #[inline]
    pub fn z(&self, t: usize, f: usize) -> f64 {
        self.z[t * self.n_factors + f]
    }

    /// `Φ(z)` clamped away from zero and one.
    #[inline]
    pub fn u(&self, t: usize, f: usize) -> f64 {
        self.u[t * self.n_factors + f]
    }

    /// Marginal value for factor `f` in period `t`.
    #[inline]
    pub fn value(&self, t: usize, f: usize) -> f64 {
        self.value[t * self.n_factors + f]
    }

    /// Idiosyncratic asset shock of tranche `k` in period `t`.
    #[inline]
    pub fn idio(&self, t: usize, k: usize) -> f64 {
        self.idio[t * self.n_tranches + k]
    }
}

/// Immutable, calibrated scenario generator.
#[derive(Debug, Clone)]
pub struct ScenarioGenerator {
    specs: Vec<FactorSpec>,
    marginals: Vec<PreparedMarginal>,
    factor: CholeskyFactor,
    index: FactorIndex,
    n_periods: usize,
    n_tranches: usize,
    antithetic: bool,
}

impl ScenarioGenerator {
    /// Validate `config` and factor its correlation matrix.
    ///
    /// # Arguments
    ///
    /// * `config` - Factor marginals, correlation and pairing options
    /// * `n_periods` - Periods per scenario
    /// * `n_tranches` - Tranches needing idiosyncratic asset shocks
    ///
    /// # Returns
    ///
    /// The generator and, when the correlation matrix had to be repaired,
    /// a [`PsdRepair`] record for the caller to report.
    ///
    /// # Errors
    ///
    /// * `ConfigError::InvalidParameter` - duplicate factors or bad marginal parameters
    /// * `ConfigError::MalformedCorrelation` - wrong shape, asymmetry or bad entries
    /// * `ConfigError::NotPositiveSemiDefinite` - negative eigenvalue with repair disabled
    pub fn new(
        config: &GeneratorConfig,
        n_periods: usize,
        n_tranches: usize,
    ) -> Result<(Self, Option<PsdRepair>), ConfigError> {
        let mut index = FactorIndex::default();
        for (i, spec) in config.factors.iter().enumerate() {
            let slot = index.slot(spec.factor);
            if slot.is_some() {
                return Err(ConfigError::invalid(
                    format!("factors[{}]", i),
                    format!("{} is configured twice", spec.factor.as_str()),
                ));
            }
            *slot = Some(i);
        }

        let marginals = config
            .factors
            .iter()
            .map(|s| s.marginal.prepare(s.factor.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        let dim = config.factors.len();
        let matrix = match &config.correlation {
            Some(rows) => {
                if rows.len() != dim {
                    return Err(ConfigError::MalformedCorrelation(format!(
                        "{} rows for {} factors",
                        rows.len(),
                        dim
                    )));
                }
                CorrelationMatrix::from_rows(rows)?
            }
            None => CorrelationMatrix::identity(dim),
        };

        let floor = if config.repair_non_psd {
            if !(config.eigenvalue_floor.is_finite() && config.eigenvalue_floor > 0.0) {
                return Err(ConfigError::invalid("eigenvalue_floor", "must be positive"));
            }
            Some(config.eigenvalue_floor)
        } else {
            None
        };
        let (factor, repair) = matrix.prepare(floor)?;

        Ok((
            Self {
                specs: config.factors.clone(),
                marginals,
                factor,
                index,
                n_periods,
                n_tranches,
                antithetic: config.antithetic,
            },
            repair,
        ))
    }

    /// Configured factors.
    #[inline]
    pub fn specs(&self) -> &[FactorSpec] {
        &self.specs
    }

    /// Column lookup by factor.
    #[inline]
    pub fn index(&self) -> FactorIndex {
        self.index
    }

    /// Number of factors.
    #[inline]
    pub fn n_factors(&self) -> usize {
        self.specs.len()
    }

    /// Whether antithetic pairing is on.
    #[inline]
    pub fn antithetic(&self) -> bool {
        self.antithetic
    }

    /// Draws for one scenario. Depends only on `master_seed` and the slot.
    pub fn generate(&self, master_seed: u64, slot: &ScenarioSlot) -> Scenario {
        let n_f = self.specs.len();
        let n_p = self.n_periods;
        let n_k = self.n_tranches;

        let (source, sign) = self.source_of(slot);

        let mut independent = vec![0.0; n_p * n_f];
        ScenarioRng::new(master_seed, slot.id.group, source, SubStream::Factors)
            .fill_normal(&mut independent);
        let mut idio = vec![0.0; n_p * n_k];
        ScenarioRng::new(master_seed, slot.id.group, source, SubStream::Idiosyncratic)
            .fill_normal(&mut idio);
        if sign < 0.0 {
            independent.iter_mut().for_each(|x| *x = -*x);
            idio.iter_mut().for_each(|x| *x = -*x);
        }

        let mut z = vec![0.0; n_p * n_f];
        let mut u = vec![0.0; n_p * n_f];
        let mut value = vec![0.0; n_p * n_f];
        if n_f > 0 {
            for t in 0..n_p {
                let row = t * n_f..(t + 1) * n_f;
                self.factor.apply(&independent[row.clone()], &mut z[row]);
            }
            for (i, zi) in z.iter().enumerate() {
                let ui = norm_cdf(*zi).clamp(U_CLAMP, 1.0 - U_CLAMP);
                u[i] = ui;
                value[i] = self.marginals[i % n_f].transform(*zi, ui);
            }
        }

        Scenario {
            id: slot.id,
            antithetic: sign < 0.0,
            n_periods: n_p,
            n_factors: n_f,
            n_tranches: n_k,
            z,
            u,
            value,
            idio,
        }
    }

    /// Index whose independent draws this slot uses, and their sign.
    fn source_of(&self, slot: &ScenarioSlot) -> (usize, f64) {
        if !self.antithetic {
            return (slot.id.index, 1.0);
        }
        let half = slot.group_count.div_ceil(2);
        if slot.id.index >= half {
            (slot.id.index - half, -1.0)
        } else {
            (slot.id.index, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn slot(index: usize, group_count: usize) -> ScenarioSlot {
        ScenarioSlot {
            id: ScenarioId { group: 0, index },
            group_count,
            weight: 1.0,
        }
    }

    fn two_factor(rho: f64, antithetic: bool) -> GeneratorConfig {
        GeneratorConfig {
            factors: vec![
                FactorSpec::level(RiskFactor::RevenueGrowth, Marginal::Normal { mean: 0.0, std_dev: 1.0 }),
                FactorSpec::level(RiskFactor::OpexInflation, Marginal::Normal { mean: 0.0, std_dev: 1.0 }),
            ],
            correlation: Some(vec![vec![1.0, rho], vec![rho, 1.0]]),
            antithetic,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_deterministic_per_slot() {
        let (g, _) = ScenarioGenerator::new(&two_factor(0.3, false), 5, 2).unwrap();
        assert_eq!(g.generate(7, &slot(3, 10)), g.generate(7, &slot(3, 10)));
        assert_ne!(g.generate(7, &slot(3, 10)), g.generate(7, &slot(4, 10)));
    }

    #[test]
    fn test_sample_correlation_matches_target() {
        let (g, _) = ScenarioGenerator::new(&two_factor(0.6, false), 1, 0).unwrap();
        let n = 20_000;
        let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
        for i in 0..n {
            let s = g.generate(11, &slot(i, n));
            let (x, y) = (s.z(0, 0), s.z(0, 1));
            sxy += x * y;
            sxx += x * x;
            syy += y * y;
        }
        let rho = sxy / (sxx * syy).sqrt();
        assert_abs_diff_eq!(rho, 0.6, epsilon = 0.03);
    }

    #[test]
    fn test_antithetic_partner_is_negated() {
        let (g, _) = ScenarioGenerator::new(&two_factor(0.5, true), 3, 2).unwrap();
        let a = g.generate(99, &slot(1, 10));
        let b = g.generate(99, &slot(6, 10));
        assert!(!a.is_antithetic());
        assert!(b.is_antithetic());
        for t in 0..3 {
            for f in 0..2 {
                assert_abs_diff_eq!(a.z(t, f), -b.z(t, f), epsilon = 1e-15);
            }
            for k in 0..2 {
                assert_abs_diff_eq!(a.idio(t, k), -b.idio(t, k), epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn test_odd_group_pairing() {
        let (g, _) = ScenarioGenerator::new(&two_factor(0.0, true), 1, 0).unwrap();
        // Group of 5: half = 3, so index 3 pairs with 0 and index 2 is unpaired.
        let a = g.generate(1, &slot(0, 5));
        let b = g.generate(1, &slot(3, 5));
        assert_abs_diff_eq!(a.z(0, 0), -b.z(0, 0), epsilon = 1e-15);
        assert!(!g.generate(1, &slot(2, 5)).is_antithetic());
    }

    #[test]
    fn test_uniforms_are_clamped() {
        let cfg = GeneratorConfig {
            factors: vec![FactorSpec::level(
                RiskFactor::Regime,
                Marginal::Bernoulli { p: 0.5 },
            )],
            ..GeneratorConfig::default()
        };
        let (g, _) = ScenarioGenerator::new(&cfg, 50, 0).unwrap();
        let s = g.generate(3, &slot(0, 1));
        for t in 0..50 {
            let u = s.u(t, 0);
            assert!(u >= U_CLAMP && u <= 1.0 - U_CLAMP);
            assert!(s.value(t, 0) == 0.0 || s.value(t, 0) == 1.0);
        }
    }

    #[test]
    fn test_non_psd_repaired_when_enabled() {
        let cfg = GeneratorConfig {
            factors: vec![
                FactorSpec::level(RiskFactor::RevenueGrowth, Marginal::Normal { mean: 0.0, std_dev: 1.0 }),
                FactorSpec::level(RiskFactor::OpexInflation, Marginal::Normal { mean: 0.0, std_dev: 1.0 }),
                FactorSpec::level(RiskFactor::AssetValue, Marginal::Normal { mean: 0.0, std_dev: 1.0 }),
            ],
            correlation: Some(vec![
                vec![1.0, 0.9, -0.9],
                vec![0.9, 1.0, 0.9],
                vec![-0.9, 0.9, 1.0],
            ]),
            ..GeneratorConfig::default()
        };
        let (_, repair) = ScenarioGenerator::new(&cfg, 2, 0).unwrap();
        let repair = repair.unwrap();
        assert!(repair.min_eigenvalue < 0.0);
        assert_eq!(repair.floor, 1e-8);

        let strict = GeneratorConfig {
            repair_non_psd: false,
            ..cfg
        };
        assert!(matches!(
            ScenarioGenerator::new(&strict, 2, 0),
            Err(ConfigError::NotPositiveSemiDefinite { .. })
        ));
    }

    #[test]
    fn test_duplicate_factor_rejected() {
        let cfg = GeneratorConfig {
            factors: vec![
                FactorSpec::level(RiskFactor::ShortRate, Marginal::Normal { mean: 0.0, std_dev: 1.0 }),
                FactorSpec::level(RiskFactor::ShortRate, Marginal::Normal { mean: 0.0, std_dev: 1.0 }),
            ],
            ..GeneratorConfig::default()
        };
        assert!(ScenarioGenerator::new(&cfg, 2, 0).is_err());
    }

    #[test]
    fn test_correlation_dimension_mismatch() {
        let mut cfg = two_factor(0.2, false);
        cfg.correlation = Some(vec![vec![1.0]]);
        assert!(matches!(
            ScenarioGenerator::new(&cfg, 2, 0),
            Err(ConfigError::MalformedCorrelation(_))
        ));
    }

    #[test]
    fn test_no_factors_still_draws_idiosyncratic() {
        let (g, _) = ScenarioGenerator::new(&GeneratorConfig::default(), 4, 3).unwrap();
        let s = g.generate(5, &slot(0, 1));
        assert_eq!(s.n_periods(), 4);
        assert!(s.idio(3, 2).is_finite());
    }
}
