//! Frozen calibration shared by every scenario of a run.
//!
//! All configuration is validated once, when [`SimulationContextBuilder::build`]
//! is called, and the resulting [`SimulationContext`] is immutable. Worker
//! threads receive it by shared reference; nothing inside the scenario loop
//! can fail on configuration.

use crate::error::SimulationError;
use crate::generator::{GeneratorConfig, ScenarioGenerator};
use crate::plan::{Blending, ScenarioGroup, ScenarioPlan};
use tranche_core::math::linalg::PsdRepair;
use tranche_core::types::ConfigError;
use tranche_models::baseline::{BaselineInput, BaselineProjection};
use tranche_models::credit::AssetValueParams;
use tranche_models::instruments::{
    CapitalStructure, DsraConfig, HedgeOverlay, MraConfig, MraSchedule, PhaseSchedule, Tranche,
};
use tranche_models::models::{RegimeDynamics, ShortRateParams};

/// Immutable calibration for one run.
///
/// Use [`SimulationContext::builder`] to construct instances.
///
/// # Examples
///
/// ```rust
/// use tranche_models::baseline::BaselineInput;
/// use tranche_models::instruments::{Coupon, Seniority, Tranche};
/// use tranche_pricing::SimulationContext;
///
/// let baseline = BaselineInput {
///     revenue: Some(vec![100.0; 4]),
///     opex: Some(vec![40.0; 4]),
///     ..BaselineInput::default()
/// };
/// let ctx = SimulationContext::builder()
///     .baseline(baseline)
///     .tranches(vec![Tranche::new("senior", Seniority::Senior, 100.0, Coupon::Fixed { rate: 0.05 }, 4)])
///     .equity_investment(30.0)
///     .build()
///     .expect("valid context");
///
/// assert_eq!(ctx.n_periods(), 4);
/// assert!(ctx.psd_repair().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct SimulationContext {
    baseline: BaselineProjection,
    structure: CapitalStructure,
    generator_config: GeneratorConfig,
    generator: ScenarioGenerator,
    psd_repair: Option<PsdRepair>,
    short_rate: ShortRateParams,
    regime: RegimeDynamics,
    asset: Option<AssetValueParams>,
    phases: PhaseSchedule,
    dsra: DsraConfig,
    mra: MraSchedule,
    hedge: HedgeOverlay,
    groups: Vec<ScenarioGroup>,
    blending: Blending,
}

impl SimulationContext {
    /// Creates a new context builder.
    #[inline]
    pub fn builder() -> SimulationContextBuilder {
        SimulationContextBuilder::default()
    }

    /// Same calibration with a different capital structure over the same horizon.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError::Config` if the structure's horizon differs
    /// or the generator cannot be rebuilt for its tranche count.
    pub fn with_structure(&self, structure: CapitalStructure) -> Result<Self, SimulationError> {
        if structure.n_periods() != self.n_periods() {
            return Err(ConfigError::invalid(
                "structure",
                format!(
                    "horizon of {} periods does not match the baseline's {}",
                    structure.n_periods(),
                    self.n_periods()
                ),
            )
            .into());
        }
        let mut next = self.clone();
        if structure.len() != self.structure.len() {
            let (generator, repair) =
                ScenarioGenerator::new(&self.generator_config, self.n_periods(), structure.len())?;
            next.generator = generator;
            next.psd_repair = repair;
        }
        next.structure = structure;
        Ok(next)
    }

    /// Same calibration with the tranche principals re-weighted.
    ///
    /// # Errors
    ///
    /// Returns the weight validation error from
    /// [`CapitalStructure::reweighted`].
    pub fn with_weights(&self, weights: &[f64]) -> Result<Self, SimulationError> {
        let structure = self.structure.reweighted(weights)?;
        self.with_structure(structure)
    }

    /// Same calibration with a different hedge overlay.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError::Config` for an invalid overlay.
    pub fn with_hedge(&self, hedge: HedgeOverlay) -> Result<Self, SimulationError> {
        hedge.validate()?;
        Ok(Self {
            hedge,
            ..self.clone()
        })
    }

    /// Allocation of `scenario_count` scenarios to this context's groups.
    ///
    /// # Errors
    ///
    /// See [`ScenarioPlan::new`].
    pub fn plan(&self, scenario_count: usize) -> Result<ScenarioPlan, ConfigError> {
        ScenarioPlan::new(&self.groups, scenario_count, self.blending)
    }

    /// Number of periods.
    #[inline]
    pub fn n_periods(&self) -> usize {
        self.baseline.n_periods()
    }

    /// Period length in years.
    #[inline]
    pub fn period_length(&self) -> f64 {
        self.baseline.period_length()
    }

    /// Baseline projection.
    #[inline]
    pub fn baseline(&self) -> &BaselineProjection {
        &self.baseline
    }

    /// Capital structure.
    #[inline]
    pub fn structure(&self) -> &CapitalStructure {
        &self.structure
    }

    /// Scenario generator.
    #[inline]
    pub fn generator(&self) -> &ScenarioGenerator {
        &self.generator
    }

    /// Correlation repair applied at build time, if any.
    #[inline]
    pub fn psd_repair(&self) -> Option<PsdRepair> {
        self.psd_repair
    }

    /// Short-rate dynamics.
    #[inline]
    pub fn short_rate(&self) -> &ShortRateParams {
        &self.short_rate
    }

    /// Regime dynamics.
    #[inline]
    pub fn regime(&self) -> &RegimeDynamics {
        &self.regime
    }

    /// Structural asset-value parameters; `None` disables structural default.
    #[inline]
    pub fn asset(&self) -> Option<&AssetValueParams> {
        self.asset.as_ref()
    }

    /// Phase boundaries.
    #[inline]
    pub fn phases(&self) -> &PhaseSchedule {
        &self.phases
    }

    /// DSRA terms.
    #[inline]
    pub fn dsra(&self) -> &DsraConfig {
        &self.dsra
    }

    /// MRA schedule.
    #[inline]
    pub fn mra(&self) -> &MraSchedule {
        &self.mra
    }

    /// Hedge overlay.
    #[inline]
    pub fn hedge(&self) -> &HedgeOverlay {
        &self.hedge
    }

    /// Scenario groups.
    #[inline]
    pub fn groups(&self) -> &[ScenarioGroup] {
        &self.groups
    }

    /// Blending rule.
    #[inline]
    pub fn blending(&self) -> Blending {
        self.blending
    }
}

/// Builder for [`SimulationContext`].
///
/// Baseline and tranches are required; everything else has a default
/// (flat zero rate, Normal regime throughout, no hedge, empty reserves,
/// one unshocked scenario group).
#[derive(Debug, Clone, Default)]
pub struct SimulationContextBuilder {
    baseline: Option<BaselineInput>,
    tranches: Option<Vec<Tranche>>,
    equity_investment: f64,
    generator: GeneratorConfig,
    short_rate: Option<ShortRateParams>,
    regime: RegimeDynamics,
    asset: Option<AssetValueParams>,
    phases: PhaseSchedule,
    dsra: DsraConfig,
    mra: MraConfig,
    hedge: HedgeOverlay,
    groups: Vec<ScenarioGroup>,
    blending: Blending,
}

impl SimulationContextBuilder {
    /// Sets the baseline projection.
    #[inline]
    pub fn baseline(mut self, baseline: BaselineInput) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Sets the tranches (any order; they are sorted by seniority).
    #[inline]
    pub fn tranches(mut self, tranches: Vec<Tranche>) -> Self {
        self.tranches = Some(tranches);
        self
    }

    /// Sets the sponsor equity invested at close.
    #[inline]
    pub fn equity_investment(mut self, equity_investment: f64) -> Self {
        self.equity_investment = equity_investment;
        self
    }

    /// Sets the factor marginals and correlation.
    #[inline]
    pub fn generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }

    /// Sets the short-rate dynamics.
    #[inline]
    pub fn short_rate(mut self, short_rate: ShortRateParams) -> Self {
        self.short_rate = Some(short_rate);
        self
    }

    /// Sets the regime dynamics.
    #[inline]
    pub fn regime(mut self, regime: RegimeDynamics) -> Self {
        self.regime = regime;
        self
    }

    /// Enables structural default with these asset-value parameters.
    #[inline]
    pub fn asset(mut self, asset: AssetValueParams) -> Self {
        self.asset = Some(asset);
        self
    }

    /// Sets the phase boundaries.
    #[inline]
    pub fn phases(mut self, phases: PhaseSchedule) -> Self {
        self.phases = phases;
        self
    }

    /// Sets the DSRA terms.
    #[inline]
    pub fn dsra(mut self, dsra: DsraConfig) -> Self {
        self.dsra = dsra;
        self
    }

    /// Sets the MRA terms.
    #[inline]
    pub fn mra(mut self, mra: MraConfig) -> Self {
        self.mra = mra;
        self
    }

    /// Sets the hedge overlay.
    #[inline]
    pub fn hedge(mut self, hedge: HedgeOverlay) -> Self {
        self.hedge = hedge;
        self
    }

    /// Sets the scenario groups.
    #[inline]
    pub fn groups(mut self, groups: Vec<ScenarioGroup>) -> Self {
        self.groups = groups;
        self
    }

    /// Sets the blending rule.
    #[inline]
    pub fn blending(mut self, blending: Blending) -> Self {
        self.blending = blending;
        self
    }

    /// Validates every input and freezes the context.
    ///
    /// # Errors
    ///
    /// * `SimulationError::MissingInput` - baseline or tranches not supplied
    /// * `SimulationError::Config` - any validation failure, including a
    ///   non-PSD correlation matrix with repair disabled
    pub fn build(self) -> Result<SimulationContext, SimulationError> {
        let baseline = self
            .baseline
            .ok_or(SimulationError::MissingInput("baseline"))?
            .validate()?;
        let n_periods = baseline.n_periods();
        let tranches = self.tranches.ok_or(SimulationError::MissingInput("tranches"))?;
        let structure = CapitalStructure::new(tranches, self.equity_investment, n_periods)?;

        let (generator, psd_repair) =
            ScenarioGenerator::new(&self.generator, n_periods, structure.len())?;

        let short_rate = self.short_rate.unwrap_or_else(|| ShortRateParams::flat(0.0));
        short_rate.validate()?;
        self.regime.validate()?;
        if self.regime.switches() && generator.index().regime.is_none() {
            return Err(ConfigError::invalid(
                "regime",
                "switching dynamics need a regime factor in the generator",
            )
            .into());
        }
        if let Some(asset) = &self.asset {
            asset.validate()?;
        }
        self.dsra.validate()?;
        let mra = self.mra.schedule(n_periods)?;
        self.hedge.validate()?;

        let groups = if self.groups.is_empty() {
            vec![ScenarioGroup::base()]
        } else {
            self.groups
        };
        // Validates groups and blending eagerly.
        ScenarioPlan::new(&groups, groups.len(), self.blending)?;

        tracing::debug!(
            n_periods,
            tranches = structure.len(),
            factors = generator.n_factors(),
            groups = groups.len(),
            structural_default = self.asset.is_some(),
            "simulation context built"
        );

        Ok(SimulationContext {
            baseline,
            structure,
            generator_config: self.generator,
            generator,
            psd_repair,
            short_rate,
            regime: self.regime,
            asset: self.asset,
            phases: self.phases,
            dsra: self.dsra,
            mra,
            hedge: self.hedge,
            groups,
            blending: self.blending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tranche_models::instruments::{Coupon, Seniority};

    fn baseline() -> BaselineInput {
        BaselineInput {
            revenue: Some(vec![100.0; 4]),
            opex: Some(vec![40.0; 4]),
            ..BaselineInput::default()
        }
    }

    fn tranches() -> Vec<Tranche> {
        vec![
            Tranche::new("senior", Seniority::Senior, 70.0, Coupon::Fixed { rate: 0.05 }, 4),
            Tranche::new("junior", Seniority::Subordinated, 30.0, Coupon::Fixed { rate: 0.09 }, 4),
        ]
    }

    #[test]
    fn test_missing_baseline() {
        let err = SimulationContext::builder().tranches(tranches()).build().unwrap_err();
        assert_eq!(err, SimulationError::MissingInput("baseline"));
    }

    #[test]
    fn test_missing_tranches() {
        let err = SimulationContext::builder().baseline(baseline()).build().unwrap_err();
        assert_eq!(err, SimulationError::MissingInput("tranches"));
    }

    #[test]
    fn test_missing_baseline_field_surfaces() {
        let input = BaselineInput {
            opex: None,
            ..baseline()
        };
        let err = SimulationContext::builder()
            .baseline(input)
            .tranches(tranches())
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Config(ConfigError::MissingBaselineField { .. })
        ));
    }

    #[test]
    fn test_defaults() {
        let ctx = SimulationContext::builder()
            .baseline(baseline())
            .tranches(tranches())
            .build()
            .unwrap();
        assert_eq!(ctx.groups().len(), 1);
        assert_eq!(ctx.short_rate().initial_rate, 0.0);
        assert!(ctx.asset().is_none());
        assert_eq!(ctx.plan(10).unwrap().total(), 10);
    }

    #[test]
    fn test_with_weights() {
        let ctx = SimulationContext::builder()
            .baseline(baseline())
            .tranches(tranches())
            .build()
            .unwrap();
        let next = ctx.with_weights(&[0.5, 0.5]).unwrap();
        assert_eq!(next.structure().tranches()[0].principal, 50.0);
        assert!(ctx.with_weights(&[0.5, 0.6]).is_err());
    }

    #[test]
    fn test_switching_regime_needs_factor() {
        use crate::generator::{FactorSpec, Marginal, RiskFactor};
        use tranche_models::models::TransitionMatrix;

        let markov = RegimeDynamics::Markov {
            transition: TransitionMatrix([[0.9, 0.1], [0.3, 0.7]]),
        };
        let build = |regime: RegimeDynamics, generator: GeneratorConfig| {
            SimulationContext::builder()
                .baseline(baseline())
                .tranches(tranches())
                .regime(regime)
                .generator(generator)
                .build()
        };

        for regime in [markov, RegimeDynamics::Independent] {
            let err = build(regime, GeneratorConfig::default()).unwrap_err();
            assert!(matches!(
                err,
                SimulationError::Config(ConfigError::InvalidParameter { ref name, .. }) if name == "regime"
            ));
        }

        let with_factor = GeneratorConfig {
            factors: vec![FactorSpec::level(
                RiskFactor::Regime,
                Marginal::Uniform { min: 0.0, max: 1.0 },
            )],
            ..GeneratorConfig::default()
        };
        assert!(build(markov, with_factor).is_ok());
        assert!(build(RegimeDynamics::default(), GeneratorConfig::default()).is_ok());
    }
}
