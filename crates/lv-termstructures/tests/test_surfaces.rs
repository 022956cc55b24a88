//! Integration tests for rate curves and volatility surfaces.

use approx::assert_abs_diff_eq;
use lv_math::interpolations::{Extrapolation, InterpolatorKind};
use lv_termstructures::{
    ConstantVolatilitySurface, FlatRateCurve, GridVolatilitySurface, InterpolatedZeroCurve,
    RateCurve, VolatilitySurface,
};
use proptest::prelude::*;

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

#[test]
fn surfaces_are_usable_as_trait_objects() {
    let surfaces: Vec<Box<dyn VolatilitySurface>> = vec![
        Box::new(ConstantVolatilitySurface::new(0.15).unwrap()),
        Box::new(skew_surface()),
    ];
    for s in &surfaces {
        let v = s.volatility(0.5, 100.0).unwrap();
        assert!(v > 0.0);
        assert_abs_diff_eq!(s.variance(0.5, 100.0).unwrap(), v * v * 0.5, epsilon = 1e-15);
    }
}

#[test]
fn skew_surface_is_flat_beyond_strikes() {
    let s = skew_surface();
    assert_abs_diff_eq!(s.volatility(0.25, 10.0).unwrap(), 0.21, epsilon = 1e-15);
    assert_abs_diff_eq!(s.volatility(1.0, 400.0).unwrap(), 0.06, epsilon = 1e-15);
}

#[test]
fn zero_curve_round_trips_discount_factors() {
    let curve = InterpolatedZeroCurve::new(
        &[0.25, 1.0, 5.0],
        &[0.02, 0.025, 0.03],
        InterpolatorKind::NaturalCubic,
    )
    .unwrap();
    let t = 2.0;
    let df = curve.discount(t);
    assert_abs_diff_eq!(-df.ln() / t, curve.zero_rate(t), epsilon = 1e-14);
}

#[test]
fn flat_curve_forwards_chain() {
    let curve = FlatRateCurve::new(0.03).unwrap();
    let whole = curve.forward_rate(0.0, 2.0);
    let halves = 0.5 * (curve.forward_rate(0.0, 1.0) + curve.forward_rate(1.0, 2.0));
    assert_abs_diff_eq!(whole, halves, epsilon = 1e-14);
}

proptest! {
    #[test]
    fn grid_values_stay_within_quote_range(t in 0.0f64..2.0, k in 1.0f64..300.0) {
        let v = skew_surface().volatility(t, k).unwrap();
        prop_assert!((0.06 - 1e-12..=0.21 + 1e-12).contains(&v));
    }

    #[test]
    fn analytic_value_matches_point_value(t in 0.0f64..2.0, k in 50.0f64..250.0) {
        let s = skew_surface();
        let d = s.derivatives(t, k).unwrap().unwrap();
        prop_assert!((d.value - s.volatility(t, k).unwrap()).abs() < 1e-14);
    }
}
