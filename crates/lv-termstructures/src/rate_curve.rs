//! `RateCurve` — deterministic, continuously-compounded zero-rate curves.
//!
//! A curve supplies exactly one quantity, the zero rate `r(t)`; discount
//! factors and forward rates follow from it:
//!
//! * **discount factor**: `D(t) = exp(-r(t)·t)`
//! * **forward rate**: `f(t1, t2) = ln(D(t1) / D(t2)) / (t2 - t1)`
//!
//! The same trait serves the risk-free curve and the dividend (or foreign)
//! yield curve.

use std::fmt;

use lv_core::{errors::Result, DiscountFactor, Rate, Time};
use lv_math::interpolations::{Extrapolation, Interpolation1D, InterpolatorKind};

/// A deterministic, continuously-compounded zero-rate curve.
pub trait RateCurve: fmt::Debug + Send + Sync {
    /// Continuously-compounded zero rate to time `t`.
    fn zero_rate(&self, t: Time) -> Rate;

    /// Discount factor to time `t`.
    fn discount(&self, t: Time) -> DiscountFactor {
        if t == 0.0 {
            return 1.0;
        }
        (-self.zero_rate(t) * t).exp()
    }

    /// Continuously-compounded forward rate between `t1` and `t2`.
    ///
    /// Degenerate intervals (`t2 <= t1`) return the zero rate at `t1`.
    fn forward_rate(&self, t1: Time, t2: Time) -> Rate {
        if t2 <= t1 {
            return self.zero_rate(t1);
        }
        (self.discount(t1) / self.discount(t2)).ln() / (t2 - t1)
    }
}

// ── Flat ──────────────────────────────────────────────────────────────────────

/// A curve with the same zero rate at every maturity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatRateCurve {
    rate: Rate,
}

impl FlatRateCurve {
    /// Flat curve at `rate`.
    pub fn new(rate: Rate) -> Result<Self> {
        lv_core::ensure!(rate.is_finite(), "rate must be finite, got {rate}");
        Ok(Self { rate })
    }

    /// The constant rate.
    pub fn rate(&self) -> Rate {
        self.rate
    }
}

impl RateCurve for FlatRateCurve {
    fn zero_rate(&self, _t: Time) -> Rate {
        self.rate
    }
}

// ── Interpolated ──────────────────────────────────────────────────────────────

/// Zero rates interpolated between pillar times, flat beyond the pillars.
#[derive(Debug)]
pub struct InterpolatedZeroCurve {
    times: Vec<Time>,
    rates: Vec<Rate>,
    interpolation: Box<dyn Interpolation1D>,
}

impl InterpolatedZeroCurve {
    /// Build from strictly increasing, non-negative pillar `times` and their
    /// zero `rates`.
    pub fn new(times: &[Time], rates: &[Rate], kind: InterpolatorKind) -> Result<Self> {
        lv_core::ensure!(
            times.first().is_some_and(|t| *t >= 0.0),
            "pillar times must be non-negative"
        );
        let interpolation =
            kind.build(times, rates, Extrapolation::Flat, Extrapolation::Flat)?;
        Ok(Self {
            times: times.to_vec(),
            rates: rates.to_vec(),
            interpolation: Box::new(interpolation),
        })
    }

    /// Pillar times.
    pub fn times(&self) -> &[Time] {
        &self.times
    }

    /// Pillar zero rates.
    pub fn rates(&self) -> &[Rate] {
        &self.rates
    }
}

impl RateCurve for InterpolatedZeroCurve {
    fn zero_rate(&self, t: Time) -> Rate {
        self.interpolation.value(t)
    }
}

// ── Closure adapter ───────────────────────────────────────────────────────────

/// Adapts any `Fn(Time) -> Rate` into a [`RateCurve`].
pub struct RateFunction<F> {
    f: F,
}

impl<F> RateFunction<F>
where
    F: Fn(Time) -> Rate + Send + Sync,
{
    /// Wrap `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for RateFunction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateFunction").finish_non_exhaustive()
    }
}

impl<F> RateCurve for RateFunction<F>
where
    F: Fn(Time) -> Rate + Send + Sync,
{
    fn zero_rate(&self, t: Time) -> Rate {
        (self.f)(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn flat_curve_discount_and_forward() {
        let curve = FlatRateCurve::new(0.05).unwrap();
        assert_abs_diff_eq!(curve.discount(2.0), (-0.1_f64).exp(), epsilon = 1e-15);
        assert_abs_diff_eq!(curve.forward_rate(1.0, 3.0), 0.05, epsilon = 1e-14);
        assert_eq!(curve.discount(0.0), 1.0);
    }

    #[test]
    fn interpolated_curve_is_flat_outside_pillars() {
        let curve =
            InterpolatedZeroCurve::new(&[0.5, 1.0, 2.0], &[0.01, 0.02, 0.03], InterpolatorKind::Linear)
                .unwrap();
        assert_abs_diff_eq!(curve.zero_rate(0.1), 0.01, epsilon = 1e-15);
        assert_abs_diff_eq!(curve.zero_rate(1.5), 0.025, epsilon = 1e-15);
        assert_abs_diff_eq!(curve.zero_rate(10.0), 0.03, epsilon = 1e-15);
    }

    #[test]
    fn forward_rate_of_upward_curve_exceeds_zero_rate() {
        let curve =
            InterpolatedZeroCurve::new(&[0.5, 1.0, 2.0], &[0.01, 0.02, 0.03], InterpolatorKind::Linear)
                .unwrap();
        // f(1, 2) = (0.03·2 − 0.02·1) / 1
        assert_abs_diff_eq!(curve.forward_rate(1.0, 2.0), 0.04, epsilon = 1e-12);
    }

    #[test]
    fn closure_adapter() {
        let curve = RateFunction::new(|t: Time| 0.01 + 0.01 * t);
        assert_abs_diff_eq!(curve.zero_rate(1.0), 0.02, epsilon = 1e-15);
        assert!(format!("{curve:?}").starts_with("RateFunction"));
    }

    #[test]
    fn rejects_negative_pillars() {
        assert!(InterpolatedZeroCurve::new(&[-1.0, 1.0], &[0.0, 0.0], InterpolatorKind::Linear)
            .is_err());
        assert!(FlatRateCurve::new(f64::NAN).is_err());
    }
}
