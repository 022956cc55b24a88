//! `VolatilitySurface` — point evaluation over `(time, strike)`.
//!
//! The same contract is implemented by implied (Black) volatility surfaces
//! fed into a calibration and by the local-volatility surfaces it produces,
//! so a calibrated surface is a drop-in replacement downstream.
//!
//! The domain is `t ≥ 0`, `K > 0`. Queries outside it return
//! `Error::InvalidInput`.

use std::fmt;

use lv_core::{ensure, errors::Result, Real, Time, Volatility};
use lv_math::interpolations::{Extrapolated, Extrapolation, Interpolation1D, InterpolatorKind};

/// Volatility and its partial derivatives at one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDerivatives {
    /// `σ(t, K)`.
    pub value: Volatility,
    /// `∂σ/∂t`.
    pub d_time: Real,
    /// `∂σ/∂K`.
    pub d_strike: Real,
    /// `∂²σ/∂K²`.
    pub d2_strike: Real,
}

/// A read-only volatility surface.
pub trait VolatilitySurface: fmt::Debug + Send + Sync {
    /// Volatility at time `t` and strike `strike`.
    fn volatility(&self, t: Time, strike: Real) -> Result<Volatility>;

    /// Closed-form partial derivatives, if the surface can provide them.
    ///
    /// The default returns `None`, meaning callers must difference
    /// [`volatility`](Self::volatility) themselves.
    fn derivatives(&self, t: Time, strike: Real) -> Option<Result<SurfaceDerivatives>> {
        let _ = (t, strike);
        None
    }

    /// Total variance `σ²(t, K)·t`.
    fn variance(&self, t: Time, strike: Real) -> Result<Real> {
        let vol = self.volatility(t, strike)?;
        Ok(vol * vol * t)
    }
}

/// Reject points outside the surface domain `t ≥ 0`, `K > 0`.
pub fn check_domain(t: Time, strike: Real) -> Result<()> {
    ensure!(
        t.is_finite() && t >= 0.0,
        "time must be finite and non-negative, got {t}"
    );
    ensure!(
        strike.is_finite() && strike > 0.0,
        "strike must be finite and positive, got {strike}"
    );
    Ok(())
}

/// Reject a non-positive or non-finite interpolated volatility.
pub(crate) fn check_volatility(vol: Volatility, t: Time, strike: Real) -> Result<Volatility> {
    ensure!(
        vol.is_finite() && vol > 0.0,
        "surface produced volatility {vol} at (T={t}, K={strike})"
    );
    Ok(vol)
}

// ── Time axis ─────────────────────────────────────────────────────────────────

/// Interpolation weights along the time axis of a sliced surface.
///
/// Surfaces built from per-expiry strike curves `v_i(K)` evaluate
/// `σ(t, K) = Σ w_i(t)·v_i(K)`. The weights depend only on the node times,
/// so they are taken from an interpolation over zero ordinates.
#[derive(Debug)]
pub(crate) struct TimeAxis {
    times: Vec<Time>,
    weights: Option<Extrapolated>,
}

impl TimeAxis {
    pub(crate) fn new(
        times: &[Time],
        kind: InterpolatorKind,
        extrapolation: Extrapolation,
    ) -> Result<Self> {
        ensure!(!times.is_empty(), "need at least one time node");
        ensure!(
            times.iter().all(|t| t.is_finite() && *t >= 0.0),
            "time nodes must be finite and non-negative"
        );
        let weights = if times.len() > 1 {
            Some(kind.build(times, &vec![0.0; times.len()], extrapolation, extrapolation)?)
        } else {
            None
        };
        Ok(Self {
            times: times.to_vec(),
            weights,
        })
    }

    pub(crate) fn times(&self) -> &[Time] {
        &self.times
    }

    /// Value weights and time-derivative weights at `t`.
    pub(crate) fn weights(&self, t: Time) -> (Vec<Real>, Vec<Real>) {
        match &self.weights {
            Some(interp) => (interp.node_sensitivity(t), interp.derivative_sensitivity(t)),
            None => (vec![1.0], vec![0.0]),
        }
    }

    /// Combine per-slice `(value, ∂K, ∂KK)` triples into surface
    /// derivatives at `t`.
    pub(crate) fn combine(
        &self,
        t: Time,
        per_slice: impl Fn(usize) -> (Real, Real, Real),
    ) -> SurfaceDerivatives {
        let (w, dw) = self.weights(t);
        let mut out = SurfaceDerivatives {
            value: 0.0,
            d_time: 0.0,
            d_strike: 0.0,
            d2_strike: 0.0,
        };
        for (i, (wi, dwi)) in w.iter().zip(dw.iter()).enumerate() {
            if *wi == 0.0 && *dwi == 0.0 {
                continue;
            }
            let (v, dv, d2v) = per_slice(i);
            out.value += wi * v;
            out.d_time += dwi * v;
            out.d_strike += wi * dv;
            out.d2_strike += wi * d2v;
        }
        out
    }
}
