//! Dupire local volatility.
//!
//! Given an implied volatility surface `σ(T, K)`, zero-rate curves `r(T)`,
//! `q(T)` and the spot `S`, the local variance at `(T, K)` is
//!
//! ```text
//!            σ² + 2σT·∂σ/∂T + 2σ(r − q)KT·∂σ/∂K
//! σ_loc² = ──────────────────────────────────────────────────────────
//!          (1 + K·d1·√T·∂σ/∂K)² + K²Tσ·(∂²σ/∂K² − d1·√T·(∂σ/∂K)²)
//!
//! d1 = [ln(S·e^{(r−q)T} / K) + σ²T/2] / (σ√T)
//! ```
//!
//! A denominator at or below the configured tolerance is a calibration
//! failure at that point. A negative (or vanishing) variance is floored at
//! [`LOCAL_VARIANCE_FLOOR`] and reported as a warning.

use rayon::prelude::*;

use lv_core::{
    ensure, ensure_calibrated,
    errors::Result,
    Diagnostics, Location, NumericalWarning, Real, Time, Volatility,
};
use lv_math::interpolations::{Extrapolation, InterpolatorKind};
use lv_termstructures::{
    GridVolatilitySurface, LocalVolatilitySurface, RateCurve, SurfaceDerivatives,
    VolatilitySurface,
};

use crate::config::{DerivativeMethod, DupireConfig};

/// Smallest local variance ever returned.
pub const LOCAL_VARIANCE_FLOOR: Real = 1e-10;

/// Local volatility at one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalVolatilityPoint {
    /// Local volatility `σ_loc`.
    pub volatility: Volatility,
    /// Local variance `σ_loc²` (after flooring).
    pub variance: Real,
    /// Set if the variance had to be floored.
    pub warning: Option<NumericalWarning>,
}

/// Transforms implied volatility surfaces with Dupire's formula.
#[derive(Debug, Clone, Default)]
pub struct DupireLocalVolatilityCalculator {
    config: DupireConfig,
}

impl DupireLocalVolatilityCalculator {
    /// Calculator with a validated configuration.
    pub fn new(config: DupireConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration.
    pub fn config(&self) -> &DupireConfig {
        &self.config
    }

    /// The pointwise local-volatility surface of `surface`.
    ///
    /// Nothing is evaluated here; each query runs the transform at that
    /// point.
    pub fn local_volatility<'a>(
        &self,
        surface: &'a dyn VolatilitySurface,
        spot: Real,
        interest_rate: &'a dyn RateCurve,
        dividend_rate: &'a dyn RateCurve,
    ) -> Result<DupireLocalVolatility<'a>> {
        ensure!(
            spot.is_finite() && spot > 0.0,
            "spot must be positive, got {spot}"
        );
        Ok(DupireLocalVolatility {
            surface,
            spot,
            interest_rate,
            dividend_rate,
            config: self.config,
        })
    }
}

/// Dupire local volatility of a borrowed implied surface, evaluated on
/// demand.
#[derive(Debug, Clone, Copy)]
pub struct DupireLocalVolatility<'a> {
    surface: &'a dyn VolatilitySurface,
    spot: Real,
    interest_rate: &'a dyn RateCurve,
    dividend_rate: &'a dyn RateCurve,
    config: DupireConfig,
}

impl<'a> DupireLocalVolatility<'a> {
    /// Spot of the underlying.
    pub fn spot(&self) -> Real {
        self.spot
    }

    /// Local volatility at `(t, strike)`.
    ///
    /// # Errors
    /// `InvalidInput` for `t ≤ 0`, `strike ≤ 0` or a non-positive implied
    /// volatility; `CalibrationFailure` at [`Location::Point`] when the
    /// denominator is not positive.
    pub fn evaluate(&self, t: Time, strike: Real) -> Result<LocalVolatilityPoint> {
        ensure!(
            t.is_finite() && t > 0.0,
            "time to expiry must be positive, got {t}"
        );
        ensure!(
            strike.is_finite() && strike > 0.0,
            "strike must be positive, got {strike}"
        );

        let SurfaceDerivatives {
            value: sigma,
            d_time,
            d_strike,
            d2_strike,
        } = self.surface_derivatives(t, strike)?;
        ensure!(
            sigma.is_finite() && sigma > 0.0,
            "implied volatility must be positive, got {sigma} at (T={t}, K={strike})"
        );

        let location = Location::Point { time: t, strike };
        let r = self.interest_rate.zero_rate(t);
        let q = self.dividend_rate.zero_rate(t);
        let sqrt_t = t.sqrt();
        let forward = self.spot * ((r - q) * t).exp();
        let d1 = ((forward / strike).ln() + 0.5 * sigma * sigma * t) / (sigma * sqrt_t);

        let numerator = sigma * sigma
            + 2.0 * sigma * t * d_time
            + 2.0 * sigma * (r - q) * strike * t * d_strike;
        let skew = 1.0 + strike * d1 * sqrt_t * d_strike;
        let denominator = skew * skew
            + strike * strike * t * sigma * (d2_strike - d1 * sqrt_t * d_strike * d_strike);

        ensure_calibrated!(
            denominator.is_finite() && denominator > self.config.denominator_tolerance(),
            location,
            "non-positive Dupire denominator {denominator:e}"
        );
        let raw_variance = numerator / denominator;
        ensure_calibrated!(
            raw_variance.is_finite(),
            location,
            "non-finite local variance"
        );

        let (variance, warning) = if raw_variance < LOCAL_VARIANCE_FLOOR {
            (
                LOCAL_VARIANCE_FLOOR,
                Some(NumericalWarning::VarianceFloored {
                    time: t,
                    strike,
                    raw_variance,
                }),
            )
        } else {
            (raw_variance, None)
        };

        Ok(LocalVolatilityPoint {
            volatility: variance.sqrt(),
            variance,
            warning,
        })
    }

    /// Evaluate on the grid `times × strikes` and interpolate the result
    /// (linear in both directions, flat beyond the grid).
    ///
    /// Any failing point aborts the materialisation and is returned with its
    /// coordinate. Floored points are recorded in the surface's diagnostics.
    pub fn materialize(&self, times: &[Time], strikes: &[Real]) -> Result<LocalVolatilitySurface> {
        ensure!(!times.is_empty(), "need at least one time");
        ensure!(strikes.len() >= 2, "need at least two strikes");
        tracing::debug!(
            n_times = times.len(),
            n_strikes = strikes.len(),
            spot = self.spot,
            "dupire materialisation started"
        );

        let points: Vec<Vec<LocalVolatilityPoint>> = times
            .par_iter()
            .map(|&t| {
                strikes
                    .iter()
                    .map(|&k| self.evaluate(t, k))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let mut diagnostics = Diagnostics::new();
        let rows: Vec<Vec<Volatility>> = points
            .iter()
            .map(|row| {
                row.iter()
                    .map(|p| {
                        if let Some(w) = p.warning {
                            diagnostics.record(w);
                        }
                        p.volatility
                    })
                    .collect()
            })
            .collect();

        let grid = GridVolatilitySurface::new(
            times,
            strikes,
            &rows,
            InterpolatorKind::Linear,
            InterpolatorKind::Linear,
            Extrapolation::Flat,
        )?;
        tracing::debug!(
            floored = diagnostics.floored_variance_count(),
            "dupire materialisation complete"
        );
        Ok(LocalVolatilitySurface::from_grid(grid, diagnostics))
    }

    fn surface_derivatives(&self, t: Time, strike: Real) -> Result<SurfaceDerivatives> {
        if self.config.derivative_method() == DerivativeMethod::PreferAnalytic {
            if let Some(analytic) = self.surface.derivatives(t, strike) {
                return analytic;
            }
        }
        self.finite_differences(t, strike)
    }

    /// Central differences with relative bumps.
    fn finite_differences(&self, t: Time, strike: Real) -> Result<SurfaceDerivatives> {
        let h_t = self.config.time_bump() * t;
        let h_k = self.config.strike_bump() * strike;
        let vol = |t: Time, k: Real| self.surface.volatility(t, k);

        let value = vol(t, strike)?;
        let (t_up, t_down) = (vol(t + h_t, strike)?, vol(t - h_t, strike)?);
        let (k_up, k_down) = (vol(t, strike + h_k)?, vol(t, strike - h_k)?);

        Ok(SurfaceDerivatives {
            value,
            d_time: (t_up - t_down) / (2.0 * h_t),
            d_strike: (k_up - k_down) / (2.0 * h_k),
            d2_strike: (k_up - 2.0 * value + k_down) / (h_k * h_k),
        })
    }
}

/// Drop-in use as a surface. A floored variance is only emitted through
/// `tracing` here; callers that need to count floored points should use
/// [`DupireLocalVolatility::evaluate`], whose result carries the warning, or
/// [`DupireLocalVolatility::materialize`], whose surface collects them in its
/// [`Diagnostics`].
impl VolatilitySurface for DupireLocalVolatility<'_> {
    fn volatility(&self, t: Time, strike: Real) -> Result<Volatility> {
        let point = self.evaluate(t, strike)?;
        if let Some(warning) = point.warning {
            tracing::warn!(%warning, "numerical warning");
        }
        Ok(point.volatility)
    }
}
