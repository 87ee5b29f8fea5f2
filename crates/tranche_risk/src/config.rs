//! Run configuration.
//!
//! A [`RunConfig`] holds everything a run needs: the baseline, the capital
//! structure, the stochastic calibration and the execution settings. It is
//! deserialised from TOML, optionally adjusted from the environment, and
//! validated before any scenario is evaluated.
//!
//! # Environment overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `TRANCHE_WORKERS` | `execution.workers` |
//! | `TRANCHE_BATCH_SIZE` | `execution.batch_size` |
//! | `TRANCHE_ANTITHETIC` | `generator.antithetic` |

use crate::error::RunError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tranche_core::types::ConfigError;
use tranche_models::baseline::BaselineInput;
use tranche_models::credit::{AbsolutePriorityRecovery, AssetValueParams};
use tranche_models::instruments::{DsraConfig, HedgeOverlay, MraConfig, PhaseSchedule, Tranche};
use tranche_models::models::{RegimeDynamics, ShortRateParams};
use tranche_pricing::generator::GeneratorConfig;
use tranche_pricing::plan::{Blending, ScenarioGroup};
use tranche_pricing::SimulationContext;

/// Environment variable overriding `execution.workers`.
pub const ENV_WORKERS: &str = "TRANCHE_WORKERS";
/// Environment variable overriding `execution.batch_size`.
pub const ENV_BATCH_SIZE: &str = "TRANCHE_BATCH_SIZE";
/// Environment variable overriding `generator.antithetic`.
pub const ENV_ANTITHETIC: &str = "TRANCHE_ANTITHETIC";

/// Default scenarios per batch.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Default capacity of the DSCR and loss sampling sketches.
pub const DEFAULT_SAMPLE_CAPACITY: usize = 100_000;

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_sample_capacity() -> usize {
    DEFAULT_SAMPLE_CAPACITY
}
fn default_tail_confidence() -> f64 {
    0.95
}

/// How a run is executed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Worker threads; rayon's default when absent.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Scenarios per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Samples retained per period for DSCR bands and for the loss tail.
    #[serde(default = "default_sample_capacity")]
    pub sample_capacity: usize,
    /// Confidence level for VaR and CVaR.
    #[serde(default = "default_tail_confidence")]
    pub tail_confidence: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            workers: None,
            batch_size: DEFAULT_BATCH_SIZE,
            sample_capacity: DEFAULT_SAMPLE_CAPACITY,
            tail_confidence: default_tail_confidence(),
        }
    }
}

impl ExecutionConfig {
    /// Validate the execution settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter` for zero workers, batch size
    /// or capacity, or a confidence outside `(0, 1)`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == Some(0) {
            return Err(ConfigError::invalid("execution.workers", "must be positive"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::invalid("execution.batch_size", "must be positive"));
        }
        if self.sample_capacity == 0 {
            return Err(ConfigError::invalid("execution.sample_capacity", "must be positive"));
        }
        if !(self.tail_confidence > 0.0 && self.tail_confidence < 1.0) {
            return Err(ConfigError::invalid("execution.tail_confidence", "must lie in (0, 1)"));
        }
        Ok(())
    }
}

/// Complete configuration of a run.
///
/// # Examples
///
/// ```rust
/// use tranche_risk::RunConfig;
///
/// let config = RunConfig::from_toml_str(r#"
///     equity_investment = 30.0
///
///     [baseline]
///     revenue = [100.0, 100.0, 100.0]
///     opex = [40.0, 40.0, 40.0]
///
///     [[tranches]]
///     name = "senior"
///     seniority = "senior"
///     principal = 100.0
///     coupon = { type = "fixed", rate = 0.05 }
///     maturity_period = 3
///
///     [execution]
///     batch_size = 64
/// "#).unwrap();
///
/// assert_eq!(config.execution.batch_size, 64);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Deterministic baseline projection.
    pub baseline: BaselineInput,
    /// Tranches in any order; they are sorted by seniority.
    pub tranches: Vec<Tranche>,
    /// Sponsor equity at close.
    #[serde(default)]
    pub equity_investment: f64,
    /// Risk factors, marginals and correlation.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Short-rate dynamics; a flat zero rate when absent.
    #[serde(default)]
    pub short_rate: Option<ShortRateParams>,
    /// Regime dynamics.
    #[serde(default)]
    pub regime: RegimeDynamics,
    /// Structural default model; disabled when absent.
    #[serde(default)]
    pub asset: Option<AssetValueParams>,
    /// Collateral recovery used for loss given default.
    #[serde(default)]
    pub recovery: AbsolutePriorityRecovery,
    /// Phase boundaries.
    #[serde(default)]
    pub phases: PhaseSchedule,
    /// Debt service reserve account.
    #[serde(default)]
    pub dsra: DsraConfig,
    /// Major maintenance reserve account.
    #[serde(default)]
    pub mra: MraConfig,
    /// Interest-rate hedge.
    #[serde(default)]
    pub hedge: HedgeOverlay,
    /// Scenario groups; a single base group when empty.
    #[serde(default)]
    pub groups: Vec<ScenarioGroup>,
    /// How groups are weighted in aggregation.
    #[serde(default)]
    pub blending: Blending,
    /// Flat continuously compounded rate for present-value reporting.
    #[serde(default)]
    pub discount_rate: Option<f64>,
    /// Execution settings.
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl RunConfig {
    /// Configuration with default calibration around a baseline and tranches.
    pub fn new(baseline: BaselineInput, tranches: Vec<Tranche>) -> Self {
        Self {
            baseline,
            tranches,
            equity_investment: 0.0,
            generator: GeneratorConfig::default(),
            short_rate: None,
            regime: RegimeDynamics::default(),
            asset: None,
            recovery: AbsolutePriorityRecovery::default(),
            phases: PhaseSchedule::default(),
            dsra: DsraConfig::default(),
            mra: MraConfig::default(),
            hedge: HedgeOverlay::default(),
            groups: Vec::new(),
            blending: Blending::default(),
            discount_rate: None,
            execution: ExecutionConfig::default(),
        }
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `RunError::ConfigFile` if the document does not parse.
    pub fn from_toml_str(content: &str) -> Result<Self, RunError> {
        toml::from_str(content)
            .map_err(|e| RunError::ConfigFile(format!("Failed to parse TOML: {}", e)))
    }

    /// Load from a TOML file, apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// * `RunError::ConfigFile` - unreadable file, bad TOML or a bad override
    /// * `RunError::Config` - validation failure
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RunError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RunError::ConfigFile(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "run configuration loaded");
        Ok(config)
    }

    /// Apply `TRANCHE_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `RunError::ConfigFile` if a variable is set but unparsable.
    pub fn apply_env_overrides(&mut self) -> Result<(), RunError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup.
    ///
    /// # Errors
    ///
    /// Returns `RunError::ConfigFile` if a value is present but unparsable.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), RunError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bad = |key: &str, value: &str| {
            RunError::ConfigFile(format!("Invalid value for {}: {:?}", key, value))
        };

        if let Some(v) = lookup(ENV_WORKERS) {
            let workers = v.trim().parse().map_err(|_| bad(ENV_WORKERS, &v))?;
            self.execution.workers = Some(workers);
        }
        if let Some(v) = lookup(ENV_BATCH_SIZE) {
            self.execution.batch_size = v.trim().parse().map_err(|_| bad(ENV_BATCH_SIZE, &v))?;
        }
        if let Some(v) = lookup(ENV_ANTITHETIC) {
            self.generator.antithetic = match v.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(bad(ENV_ANTITHETIC, &v)),
            };
        }
        Ok(())
    }

    /// Validate the settings that the simulation context does not cover.
    ///
    /// Calibration itself is validated by [`RunConfig::context`].
    ///
    /// # Errors
    ///
    /// Returns `RunError::Config` for invalid execution, recovery or
    /// discounting settings.
    pub fn validate(&self) -> Result<(), RunError> {
        self.execution.validate()?;
        self.recovery.validate()?;
        if let Some(r) = self.discount_rate {
            if !r.is_finite() {
                return Err(ConfigError::invalid("discount_rate", "must be finite").into());
            }
        }
        Ok(())
    }

    /// Freeze the calibration into a [`SimulationContext`].
    ///
    /// # Errors
    ///
    /// Returns `RunError::Config` for any calibration error.
    pub fn context(&self) -> Result<SimulationContext, RunError> {
        let mut builder = SimulationContext::builder()
            .baseline(self.baseline.clone())
            .tranches(self.tranches.clone())
            .equity_investment(self.equity_investment)
            .generator(self.generator.clone())
            .regime(self.regime)
            .phases(self.phases)
            .dsra(self.dsra)
            .mra(self.mra.clone())
            .hedge(self.hedge)
            .groups(self.groups.clone())
            .blending(self.blending);
        if let Some(short_rate) = self.short_rate {
            builder = builder.short_rate(short_rate);
        }
        if let Some(asset) = self.asset {
            builder = builder.asset(asset);
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tranche_models::instruments::{Coupon, Seniority};

    fn config() -> RunConfig {
        RunConfig::new(
            BaselineInput {
                revenue: Some(vec![100.0; 3]),
                opex: Some(vec![40.0; 3]),
                ..BaselineInput::default()
            },
            vec![Tranche::new("senior", Seniority::Senior, 100.0, Coupon::Fixed { rate: 0.05 }, 3)],
        )
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let exec = ExecutionConfig::default();
        assert_eq!(exec.batch_size, 256);
        assert_eq!(exec.sample_capacity, 100_000);
        assert_eq!(exec.workers, None);
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_toml_with_generator_and_asset() {
        let config = RunConfig::from_toml_str(
            r#"
            equity_investment = 30.0
            discount_rate = 0.04

            [baseline]
            revenue = [100.0, 100.0]
            opex = [40.0, 40.0]

            [[tranches]]
            name = "senior"
            seniority = "senior"
            principal = 80.0
            coupon = { type = "floating", spread = 0.02 }
            maturity_period = 2

            [generator]
            antithetic = true
            correlation = [[1.0, 0.3], [0.3, 1.0]]

            [[generator.factors]]
            factor = "revenue_growth"
            marginal = { type = "log_normal", sigma = 0.15 }

            [[generator.factors]]
            factor = "opex_inflation"
            marginal = { type = "log_normal", sigma = 0.10 }
            application = "cumulative"

            [asset]
            initial_value = 150.0
            normal = { drift = 0.03, volatility = 0.2 }
            stress = { drift = -0.05, volatility = 0.35 }
            "#,
        )
        .unwrap();

        assert!(config.generator.antithetic);
        assert_eq!(config.generator.factors.len(), 2);
        assert_eq!(config.discount_rate, Some(0.04));
        let asset = config.asset.unwrap();
        assert_eq!(asset.barrier_ratio, 1.0);
        let ctx = config.context().unwrap();
        assert_eq!(ctx.n_periods(), 2);
        assert_eq!(ctx.generator().n_factors(), 2);
    }

    #[test]
    fn test_malformed_toml_is_config_file_error() {
        let err = RunConfig::from_toml_str("baseline = 3").unwrap_err();
        assert!(matches!(err, RunError::ConfigFile(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = RunConfig::load("/nonexistent/tranche-run.toml").unwrap_err();
        assert!(matches!(err, RunError::ConfigFile(_)));
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = config();
        config
            .apply_overrides(lookup(&[
                (ENV_WORKERS, "4"),
                (ENV_BATCH_SIZE, " 32 "),
                (ENV_ANTITHETIC, "true"),
            ]))
            .unwrap();
        assert_eq!(config.execution.workers, Some(4));
        assert_eq!(config.execution.batch_size, 32);
        assert!(config.generator.antithetic);
    }

    #[test]
    fn test_override_rejects_garbage() {
        let mut config = config();
        let err = config
            .apply_overrides(lookup(&[(ENV_ANTITHETIC, "maybe")]))
            .unwrap_err();
        assert!(matches!(err, RunError::ConfigFile(_)));
        let err = config
            .apply_overrides(lookup(&[(ENV_WORKERS, "-1")]))
            .unwrap_err();
        assert!(matches!(err, RunError::ConfigFile(_)));
    }

    #[test]
    fn test_validate_execution() {
        let mut config = config();
        config.execution.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = self::config();
        config.execution.workers = Some(0);
        assert!(config.validate().is_err());

        let mut config = self::config();
        config.execution.tail_confidence = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_context_reports_missing_revenue() {
        let mut config = config();
        config.baseline.revenue = None;
        let err = config.context().unwrap_err();
        assert!(err.to_string().contains("revenue"));
    }
}
