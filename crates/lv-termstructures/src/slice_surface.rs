//! `SliceInterpolatedSurface` — a surface over scattered nodes grouped by
//! time slice.
//!
//! Lattice calibrations produce samples on a different strike set at every
//! time slice. Each slice is interpolated linearly in strike, flat beyond its
//! outermost nodes (a single-node slice is constant); slices are then
//! combined linearly in time, flat before the first and after the last.

use lv_core::{ensure, errors::Result, Real, Time, Volatility};
use lv_math::interpolations::{Extrapolated, Extrapolation, Interpolation1D, InterpolatorKind};

use crate::volatility_surface::{
    check_domain, check_volatility, SurfaceDerivatives, TimeAxis, VolatilitySurface,
};

/// Strike profile of a single time slice.
#[derive(Debug)]
enum SliceCurve {
    Constant(Volatility),
    Interpolated(Extrapolated),
}

impl SliceCurve {
    fn evaluate(&self, strike: Real) -> (Real, Real, Real) {
        match self {
            SliceCurve::Constant(v) => (*v, 0.0, 0.0),
            SliceCurve::Interpolated(f) => (
                f.value(strike),
                f.derivative(strike),
                f.second_derivative(strike),
            ),
        }
    }
}

/// One time slice of `(strike, volatility)` nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSlice {
    /// Slice time.
    pub time: Time,
    /// Ascending `(strike, volatility)` nodes.
    pub nodes: Vec<(Real, Volatility)>,
}

/// A surface interpolated slice by slice.
#[derive(Debug)]
pub struct SliceInterpolatedSurface {
    slices: Vec<SurfaceSlice>,
    time_axis: TimeAxis,
    curves: Vec<SliceCurve>,
}

impl SliceInterpolatedSurface {
    /// Build from slices with strictly increasing times, each holding at
    /// least one node with strictly increasing strikes.
    pub fn new(slices: Vec<SurfaceSlice>) -> Result<Self> {
        ensure!(!slices.is_empty(), "need at least one slice");
        ensure!(
            slices.windows(2).all(|w| w[1].time > w[0].time),
            "slice times must be strictly increasing"
        );

        let mut curves = Vec::with_capacity(slices.len());
        for (i, slice) in slices.iter().enumerate() {
            ensure!(!slice.nodes.is_empty(), "slice {i} has no nodes");
            ensure!(
                slice.nodes.iter().all(|(k, v)| *k > 0.0 && v.is_finite() && *v > 0.0),
                "slice {i} contains a non-positive strike or volatility"
            );
            let curve = if let [(_, v)] = slice.nodes.as_slice() {
                SliceCurve::Constant(*v)
            } else {
                let (strikes, vols): (Vec<Real>, Vec<Volatility>) =
                    slice.nodes.iter().copied().unzip();
                SliceCurve::Interpolated(InterpolatorKind::Linear.build(
                    &strikes,
                    &vols,
                    Extrapolation::Flat,
                    Extrapolation::Flat,
                )?)
            };
            curves.push(curve);
        }

        let times: Vec<Time> = slices.iter().map(|s| s.time).collect();
        let time_axis = TimeAxis::new(&times, InterpolatorKind::Linear, Extrapolation::Flat)?;
        Ok(Self {
            slices,
            time_axis,
            curves,
        })
    }

    /// The slices the surface was built from.
    pub fn slices(&self) -> &[SurfaceSlice] {
        &self.slices
    }

    /// Total number of nodes over all slices.
    pub fn node_count(&self) -> usize {
        self.slices.iter().map(|s| s.nodes.len()).sum()
    }

    fn evaluate(&self, t: Time, strike: Real) -> SurfaceDerivatives {
        self.time_axis
            .combine(t, |i| self.curves[i].evaluate(strike))
    }
}

impl VolatilitySurface for SliceInterpolatedSurface {
    fn volatility(&self, t: Time, strike: Real) -> Result<Volatility> {
        check_domain(t, strike)?;
        check_volatility(self.evaluate(t, strike).value, t, strike)
    }

    fn derivatives(&self, t: Time, strike: Real) -> Option<Result<SurfaceDerivatives>> {
        Some(check_domain(t, strike).and_then(|()| {
            let d = self.evaluate(t, strike);
            check_volatility(d.value, t, strike)?;
            Ok(d)
        }))
    }
}
