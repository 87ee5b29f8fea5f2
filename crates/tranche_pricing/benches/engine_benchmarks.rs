//! Criterion benchmarks for the tranche_pricing scenario engine.
//!
//! Benchmarks cover:
//! - Correlated scenario generation with varying factor counts
//! - Full single-scenario evaluation (paths, structural default, waterfall)
//! - Per-period state recording overhead

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tranche_models::baseline::BaselineInput;
use tranche_models::credit::{AbsolutePriorityRecovery, AssetValueParams, RegimeParams};
use tranche_models::instruments::{Coupon, DsraConfig, Seniority, Tranche};
use tranche_pricing::generator::{FactorSpec, GeneratorConfig, Marginal, RiskFactor};
use tranche_pricing::{ScenarioEvaluator, SimulationContext};

/// Build a context over `n_periods` with a three-tranche structure.
fn context(n_periods: usize, with_asset: bool) -> SimulationContext {
    let mut factors = vec![
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
    if with_asset {
        factors.push(FactorSpec::level(
            RiskFactor::AssetValue,
            Marginal::Normal {
                mean: 0.0,
                std_dev: 1.0,
            },
        ));
    }
    let n_factors = factors.len();
    let correlation = (0..n_factors)
        .map(|i| {
            (0..n_factors)
                .map(|j| if i == j { 1.0 } else { 0.3 })
                .collect()
        })
        .collect();

    let mut builder = SimulationContext::builder()
        .baseline(BaselineInput {
            revenue: Some(vec![100.0; n_periods]),
            opex: Some(vec![40.0; n_periods]),
            ..BaselineInput::default()
        })
        .tranches(vec![
            Tranche::new("senior", Seniority::Senior, 150.0, Coupon::Fixed { rate: 0.05 }, n_periods),
            Tranche::new("mezzanine", Seniority::Mezzanine, 60.0, Coupon::Fixed { rate: 0.08 }, n_periods),
            Tranche::new("junior", Seniority::Subordinated, 40.0, Coupon::Fixed { rate: 0.11 }, n_periods),
        ])
        .equity_investment(100.0)
        .dsra(DsraConfig {
            initial_balance: 20.0,
            target_coverage: 1.0,
        })
        .generator(GeneratorConfig {
            factors,
            correlation: Some(correlation),
            antithetic: true,
            ..GeneratorConfig::default()
        });
    if with_asset {
        builder = builder.asset(AssetValueParams {
            initial_value: 400.0,
            barrier_ratio: 1.0,
            systematic_loading: 0.5,
            normal: RegimeParams {
                drift: 0.03,
                volatility: 0.2,
            },
            stress: RegimeParams {
                drift: -0.05,
                volatility: 0.35,
            },
            divergence_tolerance: 0.05,
        });
    }
    builder.build().unwrap()
}

/// Benchmark scenario generation.
fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenario_generation");

    for n_periods in [10, 25, 50] {
        let ctx = context(n_periods, true);
        let plan = ctx.plan(1000).unwrap();
        group.bench_with_input(BenchmarkId::new("generate", n_periods), &ctx, |b, ctx| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % 1000;
                ctx.generator().generate(black_box(42), &plan.slot(i))
            });
        });
    }

    group.finish();
}

/// Benchmark a full scenario evaluation with and without structural default.
fn bench_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenario_evaluation");
    let recovery = AbsolutePriorityRecovery::default();

    for (label, with_asset) in [("cash_only", false), ("structural", true)] {
        for n_periods in [10, 25] {
            let ctx = context(n_periods, with_asset);
            let plan = ctx.plan(1000).unwrap();
            let evaluator = ScenarioEvaluator::new(&ctx, &recovery, 42);
            group.bench_with_input(
                BenchmarkId::new(label, n_periods),
                &evaluator,
                |b, evaluator| {
                    let mut i = 0;
                    b.iter(|| {
                        i = (i + 1) % 1000;
                        evaluator.evaluate(black_box(&plan.slot(i)))
                    });
                },
            );
        }
    }

    group.finish();
}

/// Benchmark evaluation with per-period state recording.
fn bench_state_recording(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_recording");
    let recovery = AbsolutePriorityRecovery::default();
    let ctx = context(25, true);
    let plan = ctx.plan(1000).unwrap();
    let evaluator = ScenarioEvaluator::new(&ctx, &recovery, 42);
    let slot = plan.slot(7);

    group.bench_function("summary", |b| b.iter(|| evaluator.evaluate(black_box(&slot))));
    group.bench_function("states", |b| {
        b.iter(|| evaluator.evaluate_states(black_box(&slot)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_generation,
    bench_evaluation,
    bench_state_recording
);
criterion_main!(benches);
