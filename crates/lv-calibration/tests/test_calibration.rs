//! Integration tests for the Dupire and implied-tree calculators.

use approx::assert_abs_diff_eq;
use lv_calibration::{
    BuildState, DerivativeMethod, DupireConfig, DupireLocalVolatilityCalculator,
    ImpliedTreeConfig, ImpliedTrinomialTreeLocalVolatilityCalculator,
};
use lv_core::{errors::Result, Location, NumericalWarning, OptionType, Real, Time, Volatility};
use lv_math::interpolations::{Extrapolation, InterpolatorKind};
use lv_methods::{LatticeSpecification, OptionPayoff, TrinomialTreeEngine};
use lv_termstructures::{
    ConstantVolatilitySurface, FlatRateCurve, GridVolatilitySurface, InterpolatedZeroCurve,
    RateCurve, VolatilitySurface,
};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn flat(rate: Real) -> FlatRateCurve {
    FlatRateCurve::new(rate).unwrap()
}

fn implied_tree(steps: usize, max_time: Time) -> ImpliedTrinomialTreeLocalVolatilityCalculator {
    let config = ImpliedTreeConfig::default()
        .with_step_count(steps)
        .and_then(|c| c.with_max_time(max_time))
        .unwrap();
    ImpliedTrinomialTreeLocalVolatilityCalculator::new(config).unwrap()
}

/// Three expiries, strikes 80/140/200, volatility falling with strike.
fn skew_surface() -> GridVolatilitySurface {
    GridVolatilitySurface::new(
        &[0.25, 0.5, 1.0],
        &[80.0, 140.0, 200.0],
        &[
            vec![0.21, 0.12, 0.06],
            vec![0.19, 0.10, 0.06],
            vec![0.20, 0.10, 0.06],
        ],
        InterpolatorKind::Linear,
        InterpolatorKind::Linear,
        Extrapolation::Flat,
    )
    .unwrap()
}

// ── Flat surfaces ─────────────────────────────────────────────────────────────

#[test]
fn implied_tree_recovers_flat_volatility() {
    init_tracing();
    let surface = ConstantVolatilitySurface::new(0.15).unwrap();
    let (r, q) = (flat(0.0), flat(0.0));
    let calc = implied_tree(10, 1.0);
    let lattice = calc.calibrate_lattice(&surface, 100.0, &r, &q).unwrap();

    for sample in lattice.local_variance_samples() {
        assert_abs_diff_eq!(sample.volatility(), 0.15, epsilon = 5e-5);
    }
    let local = lattice.local_volatility_surface().unwrap();
    for &(t, k) in &[(0.05, 100.0), (0.5, 90.0), (0.95, 120.0), (2.0, 300.0)] {
        assert_abs_diff_eq!(local.volatility(t, k).unwrap(), 0.15, epsilon = 5e-5);
    }
    assert!(local.diagnostics().is_empty());
}

#[test]
fn dupire_recovers_flat_volatility() {
    let surface = ConstantVolatilitySurface::new(0.15).unwrap();
    let (r, q) = (flat(0.03), flat(0.01));
    let calc = DupireLocalVolatilityCalculator::new(
        DupireConfig::default().with_derivative_method(DerivativeMethod::FiniteDifference),
    )
    .unwrap();
    let local = calc.local_volatility(&surface, 100.0, &r, &q).unwrap();
    for &(t, k) in &[(0.1, 70.0), (0.5, 100.0), (1.0, 150.0)] {
        assert_abs_diff_eq!(local.volatility(t, k).unwrap(), 0.15, epsilon = 1e-3);
    }
}

#[test]
fn both_calculators_agree_on_flat_surfaces() {
    let surface = ConstantVolatilitySurface::new(0.25).unwrap();
    let (r, q) = (flat(0.02), flat(0.0));
    let tree = implied_tree(8, 1.0)
        .local_volatility(&surface, 100.0, &r, &q)
        .unwrap();
    let dupire = DupireLocalVolatilityCalculator::default()
        .local_volatility(&surface, 100.0, &r, &q)
        .unwrap()
        .materialize(&[0.25, 0.5, 1.0], &[80.0, 100.0, 125.0])
        .unwrap();
    for &(t, k) in &[(0.3, 95.0), (0.8, 110.0)] {
        assert_abs_diff_eq!(
            tree.volatility(t, k).unwrap(),
            dupire.volatility(t, k).unwrap(),
            epsilon = 1e-4
        );
    }
}

// ── Lattice invariants ────────────────────────────────────────────────────────

#[test]
fn state_prices_sum_to_discount_factors() {
    let surface = skew_surface();
    let (r, q) = (flat(0.03), flat(0.01));
    let lattice = implied_tree(10, 1.0)
        .calibrate_lattice(&surface, 100.0, &r, &q)
        .unwrap();
    for i in 0..=10 {
        let t = lattice.grid().time(i);
        let mass: Real = lattice.state_prices(i).iter().sum();
        let d = r.discount(t);
        assert!((mass - d).abs() <= 1e-10 * d, "slice {i}: {mass} vs {d}");
    }
}

#[test]
fn transition_probabilities_are_proper() {
    let surface = skew_surface();
    let (r, q) = (flat(0.0), flat(0.0));
    let lattice = implied_tree(10, 1.0)
        .calibrate_lattice(&surface, 100.0, &r, &q)
        .unwrap();
    for i in 0..10 {
        assert_eq!(lattice.transitions(i).len(), 2 * i + 1);
        for p in lattice.transitions(i) {
            assert!(p.iter().all(|x| *x > 0.0 && *x < 1.0), "slice {i}: {p:?}");
            assert!((p.iter().sum::<Real>() - 1.0).abs() <= 1e-12);
        }
    }
}

#[test]
fn backward_induction_agrees_with_state_prices() {
    let surface = skew_surface();
    let (r, q) = (flat(0.02), flat(0.0));
    let lattice = implied_tree(12, 1.0)
        .calibrate_lattice(&surface, 100.0, &r, &q)
        .unwrap();
    let terminal = lattice.spots(12);
    let lambdas = lattice.state_prices(12);
    for (option_type, strike) in [(OptionType::Call, 110.0), (OptionType::Put, 95.0)] {
        let payoff = OptionPayoff::european(option_type, strike, 1.0);
        let backward = lattice.price(&payoff).unwrap();
        let forward: Real = terminal
            .iter()
            .zip(lambdas)
            .map(|(s, l)| l * option_type.intrinsic(*s, strike))
            .sum();
        assert_abs_diff_eq!(backward, forward, epsilon = 1e-10);
    }
    let wrong_expiry = OptionPayoff::european(OptionType::Call, 100.0, 0.5);
    assert!(lattice.price(&wrong_expiry).unwrap_err().is_invalid_input());
}

#[test]
fn flat_lattice_prices_like_the_constant_engine() {
    let surface = ConstantVolatilitySurface::new(0.2).unwrap();
    let (r, q) = (flat(0.05), flat(0.02));
    let lattice = implied_tree(10, 1.0)
        .calibrate_lattice(&surface, 100.0, &r, &q)
        .unwrap();
    let spec = LatticeSpecification::moment_matching(1.0, 10).unwrap();
    let engine = TrinomialTreeEngine::new();
    for strike in [85.0, 100.0, 120.0] {
        let payoff = OptionPayoff::american(OptionType::Put, strike, 1.0);
        let expected = engine.price(&spec, &payoff, 100.0, 0.2, 0.05, 0.02).unwrap();
        assert_abs_diff_eq!(lattice.price(&payoff).unwrap(), expected, epsilon = 1e-8);
    }
}

// ── Skew and term structure ───────────────────────────────────────────────────

#[test]
fn skewed_surface_calibrates() {
    init_tracing();
    let surface = skew_surface();
    let (r, q) = (flat(0.0), flat(0.0));
    let local = implied_tree(10, 1.0)
        .local_volatility(&surface, 100.0, &r, &q)
        .unwrap();
    for &t in &[0.1, 0.4, 0.9] {
        for &k in &[70.0, 100.0, 150.0, 220.0] {
            let v = local.volatility(t, k).unwrap();
            assert!(v.is_finite() && v >= 0.0, "σ({t}, {k}) = {v}");
        }
    }
    let slices = local.as_slices().unwrap();
    assert_eq!(slices.node_count(), 9 * 9 + 1);
}

#[test]
fn skewed_wings_fall_back_to_the_forward() {
    let surface = skew_surface();
    let (r, q) = (flat(0.0), flat(0.0));
    let calc = implied_tree(10, 1.0);
    let lattice = calc.calibrate_lattice(&surface, 100.0, &r, &q).unwrap();
    let diagnostics = lattice.diagnostics();

    let fallbacks = diagnostics.wing_fallback_count();
    assert!(fallbacks > 0);
    for warning in diagnostics.warnings() {
        let NumericalWarning::WingFallback { slice, node } = *warning else {
            continue;
        };
        assert!(slice < 10 && node <= 2 * slice, "{warning}");
        // Zero rates: every one-step forward is the parent spot.
        let spot = lattice.spots(slice)[node];
        let children = &lattice.spots(slice + 1)[node..node + 3];
        let p = lattice.transitions(slice)[node];
        let forward: Real = p.iter().zip(children).map(|(p, s)| p * s).sum();
        assert!(
            (forward - spot).abs() <= 1e-12 * spot,
            "slice {slice}, node {node}: {forward} vs {spot}"
        );
        assert!(p.iter().all(|x| *x > 0.0 && *x < 1.0));
    }

    let local = calc.local_volatility(&surface, 100.0, &r, &q).unwrap();
    assert_eq!(local.diagnostics().wing_fallback_count(), fallbacks);
    assert_eq!(local.diagnostics(), diagnostics);
}

#[test]
fn skew_carries_through_to_local_volatility() {
    let surface = skew_surface();
    let (r, q) = (flat(0.0), flat(0.0));
    let lattice = implied_tree(10, 1.0)
        .calibrate_lattice(&surface, 100.0, &r, &q)
        .unwrap();
    // Central nodes of a mid slice: local volatility falls with spot.
    let mid: Vec<_> = lattice
        .local_variance_samples()
        .iter()
        .filter(|s| s.slice == 6 && s.node.abs_diff(6) <= 2)
        .collect();
    assert_eq!(mid.len(), 5);
    assert!(mid.first().unwrap().variance > mid.last().unwrap().variance);
}

#[test]
fn term_structure_of_rates() {
    let surface = ConstantVolatilitySurface::new(0.2).unwrap();
    let r = InterpolatedZeroCurve::new(&[0.25, 1.0], &[0.02, 0.03], InterpolatorKind::Linear)
        .unwrap();
    let q = flat(0.0);
    let lattice = implied_tree(8, 1.0)
        .calibrate_lattice(&surface, 100.0, &r, &q)
        .unwrap();
    for i in 0..=8 {
        let d = r.discount(lattice.grid().time(i));
        let mass: Real = lattice.state_prices(i).iter().sum();
        assert!((mass - d).abs() <= 1e-10 * d);
    }
    for s in lattice
        .local_variance_samples()
        .iter()
        .filter(|s| s.node.abs_diff(s.slice) <= 1)
    {
        assert_abs_diff_eq!(s.volatility(), 0.2, epsilon = 3e-2);
    }
}

// ── Failures ──────────────────────────────────────────────────────────────────

/// `σ(K) = γK + ½κ(K − K*)²` with `K* = S·e`: the Dupire denominator at `K*`
/// is `−0.04T − 4·10⁻⁴T²` for every expiry.
#[derive(Debug)]
struct ConvexSmile {
    k_star: Real,
}

impl ConvexSmile {
    fn new(spot: Real) -> Self {
        Self {
            k_star: spot * std::f64::consts::E,
        }
    }
}

impl VolatilitySurface for ConvexSmile {
    fn volatility(&self, _t: Time, strike: Real) -> Result<Volatility> {
        let gamma = 0.2 / self.k_star;
        let kappa = -0.4 / (self.k_star * self.k_star);
        let x = strike - self.k_star;
        Ok(gamma * strike + 0.5 * kappa * x * x)
    }
}

#[test]
fn dupire_fails_where_the_denominator_turns_negative() {
    let smile = ConvexSmile::new(100.0);
    let (r, q) = (flat(0.0), flat(0.0));
    let local = DupireLocalVolatilityCalculator::default()
        .local_volatility(&smile, 100.0, &r, &q)
        .unwrap();
    for t in [1e-2, 1e-3, 1e-4] {
        let err = local.evaluate(t, smile.k_star).unwrap_err();
        assert!(err.is_calibration_failure());
        match err.location() {
            Some(Location::Point { time, strike }) => {
                assert_eq!(time, t);
                assert_eq!(strike, smile.k_star);
            }
            other => panic!("unexpected location {other:?}"),
        }
    }
    let err = local
        .materialize(&[1e-2, 0.5], &[250.0, smile.k_star, 300.0])
        .unwrap_err();
    assert!(matches!(err.location(), Some(Location::Point { .. })));
}

#[test]
fn failed_build_stays_failed() {
    let surface = ConstantVolatilitySurface::new(0.05).unwrap();
    let (r, q) = (flat(3.0), flat(0.0));
    let calc = implied_tree(4, 1.0);
    let mut builder = calc.builder(&surface, 100.0, &r, &q).unwrap();
    assert_eq!(builder.step().unwrap(), &BuildState::Growing { slice: 0 });
    let err = builder.step().unwrap_err();
    assert!(err.is_calibration_failure());
    assert!(builder.state().is_terminal());
    assert!(calc.calibrate_lattice(&surface, 100.0, &r, &q).is_err());
}

// ── Properties ────────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn flat_surfaces_are_recovered(
        vol in 0.15f64..0.4,
        rate in 0.0f64..0.04,
        steps in 3usize..8,
    ) {
        let surface = ConstantVolatilitySurface::new(vol).unwrap();
        let (r, q) = (flat(rate), flat(0.0));
        let lattice = implied_tree(steps, 1.0)
            .calibrate_lattice(&surface, 100.0, &r, &q)
            .unwrap();
        prop_assert!(lattice.diagnostics().is_empty());
        for s in lattice.local_variance_samples() {
            prop_assert!((s.volatility() - vol).abs() < 1e-6);
        }
    }
}
