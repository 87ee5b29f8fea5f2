//! Structure search through the full pipeline.

use tranche_models::baseline::BaselineInput;
use tranche_models::instruments::{CapitalStructure, Coupon, Seniority, Tranche};
use tranche_optimiser::candidates::SearchSpace;
use tranche_optimiser::pareto::dominates;
use tranche_optimiser::{optimise, optimise_with, OptimiserConfig, OptimiserError, RiskMetric};
use tranche_pricing::generator::{FactorSpec, Marginal, RiskFactor};
use tranche_risk::report::{standard_hedges, ComparisonReport};
use tranche_risk::{CancellationToken, RunConfig, RunControl, RunError};

fn config() -> RunConfig {
    let mut config = RunConfig::new(
        BaselineInput {
            revenue: Some(vec![100.0; 6]),
            opex: Some(vec![42.0; 6]),
            ..BaselineInput::default()
        },
        vec![
            Tranche::new("senior", Seniority::Senior, 150.0, Coupon::Floating { spread: 0.02 }, 6),
            Tranche::new("junior", Seniority::Subordinated, 50.0, Coupon::Fixed { rate: 0.11 }, 6),
        ],
    );
    config.equity_investment = 70.0;
    config.generator.factors = vec![
        FactorSpec::level(
            RiskFactor::RevenueGrowth,
            Marginal::LogNormal {
                mu: None,
                sigma: 0.15,
            },
        ),
        FactorSpec::level(
            RiskFactor::OpexInflation,
            Marginal::LogNormal {
                mu: None,
                sigma: 0.10,
            },
        ),
    ];
    config.execution.batch_size = 50;
    config
}

#[test]
fn test_frontier_soundness_with_custom_cost() {
    // Cost penalises junior debt quadratically.
    let cost = |s: &CapitalStructure| {
        let junior = s.tranches()[1].principal / s.total_debt();
        0.05 + 0.1 * junior * junior
    };
    let settings = OptimiserConfig {
        seed: 9,
        scenario_count: 200,
        risk_metric: RiskMetric::BreachProbability,
        space: SearchSpace::simplex_grid(0.1),
    };
    let result = optimise(&config(), &settings, &cost).unwrap();
    assert_eq!(result.candidates.len(), 11);

    let frontier: Vec<_> = result.frontier_candidates().collect();
    for a in &frontier {
        for b in &frontier {
            assert!(!dominates(&a.point(), &b.point()));
        }
    }
    for c in &result.candidates {
        if !result.frontier.contains(&c.index) {
            assert!(frontier.iter().any(|f| dominates(&f.point(), &c.point())));
        }
    }
    // The cheapest structure is all senior and nothing undercuts it on cost.
    assert!(result.frontier.contains(&10));
}

#[test]
fn test_report_carries_frontier() {
    let config = config();
    let settings = OptimiserConfig {
        seed: 3,
        scenario_count: 100,
        risk_metric: RiskMetric::Cvar,
        space: SearchSpace::simplex_grid(0.25),
    };
    let search = optimise(&config, &settings, &tranche_optimiser::WeightedCouponCost::new(0.045)).unwrap();
    let report = ComparisonReport::build(3, 100, &config, &standard_hedges(0.05, 0.03, 150.0), &[])
        .unwrap()
        .with_frontier(&search.frontier_points());

    assert_eq!(report.pareto_frontier.len(), search.frontier.len());
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(
        json["pareto_frontier"].as_array().map(Vec::len),
        Some(search.frontier.len())
    );
    assert!(json["breach_statistics"]["collar_hedged"]["configured"].is_object());
}

#[test]
fn test_cancelled_search() {
    let token = CancellationToken::new();
    token.cancel();
    let control = RunControl::default().with_cancellation(token);
    let settings = OptimiserConfig {
        seed: 1,
        scenario_count: 100,
        risk_metric: RiskMetric::Cvar,
        space: SearchSpace::simplex_grid(0.5),
    };
    let err = optimise_with(
        &config(),
        &settings,
        &tranche_optimiser::WeightedCouponCost::default(),
        &control,
    )
    .unwrap_err();
    assert_eq!(err, OptimiserError::Run(RunError::Cancelled));
}

#[test]
fn test_settings_from_toml() {
    let settings: OptimiserConfig = toml::from_str(
        r#"
        seed = 5
        scenario_count = 64
        risk_metric = "breach_probability"

        [space]
        source = { type = "explicit", weights = [[0.8, 0.2], [0.6, 0.4]] }
        "#,
    )
    .unwrap();
    let result = optimise(&config(), &settings, &tranche_optimiser::WeightedCouponCost::default()).unwrap();
    assert_eq!(result.candidates.len(), 2);
    assert_eq!(result.risk_metric, RiskMetric::BreachProbability);
}
