//! End-to-end calibration through the façade.

use approx::assert_abs_diff_eq;
use localvol::prelude::*;

fn market_grid() -> GridVolatilitySurface {
    GridVolatilitySurface::from_nodes(
        &[
            (0.25, 80.0, 0.24),
            (0.25, 100.0, 0.20),
            (0.25, 120.0, 0.18),
            (1.0, 80.0, 0.23),
            (1.0, 100.0, 0.20),
            (1.0, 120.0, 0.185),
        ],
        InterpolatorKind::Linear,
        InterpolatorKind::NaturalCubic,
        Extrapolation::Flat,
    )
    .unwrap()
}

#[test]
fn tree_local_volatility_reprices_through_a_fresh_engine() {
    let surface = ConstantVolatilitySurface::new(0.18).unwrap();
    let r = FlatRateCurve::new(0.03).unwrap();
    let q = FlatRateCurve::new(0.0).unwrap();
    let calc = ImpliedTrinomialTreeLocalVolatilityCalculator::new(
        ImpliedTreeConfig::default()
            .with_step_count(12)
            .and_then(|c| c.with_max_time(1.0))
            .unwrap(),
    )
    .unwrap();
    let local = calc.local_volatility(&surface, 100.0, &r, &q).unwrap();

    // Feed the local surface back as a constant-vol input.
    let sigma = local.volatility(0.5, 100.0).unwrap();
    let spec = LatticeSpecification::moment_matching(1.0, 200).unwrap();
    let payoff = OptionPayoff::european(OptionType::Call, 100.0, 1.0);
    let tree = TrinomialTreeEngine::new()
        .price(&spec, &payoff, 100.0, sigma, 0.03, 0.0)
        .unwrap();
    let bs = localvol::math::black_scholes_price(OptionType::Call, 100.0, 100.0, 1.0, 0.18, 0.03, 0.0);
    assert_abs_diff_eq!(tree, bs, epsilon = 5e-2);
}

#[test]
fn smile_calibrates_with_both_calculators() {
    let surface = market_grid();
    let r = FlatRateCurve::new(0.01).unwrap();
    let q = FlatRateCurve::new(0.0).unwrap();

    let dupire = DupireLocalVolatilityCalculator::default()
        .local_volatility(&surface, 100.0, &r, &q)
        .unwrap()
        .materialize(&[0.25, 0.5, 0.75, 1.0], &[85.0, 100.0, 115.0])
        .unwrap();
    let tree = ImpliedTrinomialTreeLocalVolatilityCalculator::new(
        ImpliedTreeConfig::default()
            .with_step_count(10)
            .and_then(|c| c.with_max_time(1.0))
            .unwrap(),
    )
    .unwrap()
    .local_volatility(&surface, 100.0, &r, &q)
    .unwrap();

    for local in [&dupire, &tree] {
        let v = local.volatility(0.5, 100.0).unwrap();
        assert!(v > 0.1 && v < 0.3, "atm local vol {v}");
    }
}

#[test]
fn cached_lattices_are_reused() {
    let surface = market_grid();
    let flat = FlatRateCurve::new(0.0).unwrap();
    let calc = ImpliedTrinomialTreeLocalVolatilityCalculator::new(
        ImpliedTreeConfig::default()
            .with_step_count(6)
            .and_then(|c| c.with_max_time(1.0))
            .unwrap(),
    )
    .unwrap();
    let mut cache = LatticeCache::new();
    let a = cache
        .get_or_calibrate(&calc, SurfaceId(42), &surface, 100.0, &flat, &flat)
        .unwrap();
    let b = cache
        .get_or_calibrate(&calc, SurfaceId(42), &surface, 100.0, &flat, &flat)
        .unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    let payoff = OptionPayoff::european(OptionType::Put, 100.0, 1.0);
    assert!(a.price(&payoff).unwrap() > 0.0);
}
