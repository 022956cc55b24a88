//! `GridVolatilitySurface` — a volatility surface interpolated from a
//! rectangular grid of (expiry × strike) quotes.
//!
//! Each expiry row is interpolated in strike; the rows are then combined
//! along the time axis. Both interpolations are linear in the quoted
//! volatilities, which gives closed-form `∂σ/∂t`, `∂σ/∂K` and `∂²σ/∂K²`
//! through the node-sensitivity weights of the underlying schemes.

use lv_core::{ensure, errors::Result, Real, Time, Volatility};
use lv_math::interpolations::{Extrapolated, Extrapolation, Interpolation1D, InterpolatorKind};

use crate::volatility_surface::{
    check_domain, check_volatility, SurfaceDerivatives, TimeAxis, VolatilitySurface,
};

/// A volatility surface on a rectangular `(time × strike)` grid.
#[derive(Debug)]
pub struct GridVolatilitySurface {
    time_axis: TimeAxis,
    strikes: Vec<Real>,
    /// `rows[i][j]` = volatility at `times[i]`, `strikes[j]`.
    rows: Vec<Vec<Volatility>>,
    /// One strike interpolation per expiry row.
    smiles: Vec<Extrapolated>,
}

impl GridVolatilitySurface {
    /// Build from ascending `times`, ascending `strikes` and one row of
    /// volatilities per time.
    ///
    /// # Arguments
    /// * `time_kind`: interpolation along the time axis
    /// * `strike_kind`: interpolation along each expiry row
    /// * `extrapolation`: policy beyond the grid on both axes
    pub fn new(
        times: &[Time],
        strikes: &[Real],
        rows: &[Vec<Volatility>],
        time_kind: InterpolatorKind,
        strike_kind: InterpolatorKind,
        extrapolation: Extrapolation,
    ) -> Result<Self> {
        ensure!(
            rows.len() == times.len(),
            "volatility rows ({}) must match times ({})",
            rows.len(),
            times.len()
        );
        ensure!(
            strikes.iter().all(|k| *k > 0.0),
            "strikes must be positive"
        );
        for (i, row) in rows.iter().enumerate() {
            ensure!(
                row.len() == strikes.len(),
                "row {i} length ({}) must match strikes length ({})",
                row.len(),
                strikes.len()
            );
            ensure!(
                row.iter().all(|v| v.is_finite() && *v > 0.0),
                "row {i} contains a non-positive volatility"
            );
        }

        let time_axis = TimeAxis::new(times, time_kind, extrapolation)?;
        let smiles = rows
            .iter()
            .map(|row| strike_kind.build(strikes, row, extrapolation, extrapolation))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            time_axis,
            strikes: strikes.to_vec(),
            rows: rows.to_vec(),
            smiles,
        })
    }

    /// Build from unordered `(time, strike, volatility)` triples that together
    /// cover a full rectangle.
    pub fn from_nodes(
        nodes: &[(Time, Real, Volatility)],
        time_kind: InterpolatorKind,
        strike_kind: InterpolatorKind,
        extrapolation: Extrapolation,
    ) -> Result<Self> {
        let mut times: Vec<Time> = nodes.iter().map(|n| n.0).collect();
        let mut strikes: Vec<Real> = nodes.iter().map(|n| n.1).collect();
        ensure!(
            times.iter().chain(&strikes).all(|v| v.is_finite()),
            "grid coordinates must be finite"
        );
        times.sort_by(f64::total_cmp);
        times.dedup();
        strikes.sort_by(f64::total_cmp);
        strikes.dedup();
        ensure!(
            nodes.len() == times.len() * strikes.len(),
            "{} nodes do not form a full {}×{} grid",
            nodes.len(),
            times.len(),
            strikes.len()
        );

        let mut rows = vec![vec![Real::NAN; strikes.len()]; times.len()];
        for &(t, k, vol) in nodes {
            let i = times.partition_point(|x| *x < t);
            let j = strikes.partition_point(|x| *x < k);
            ensure!(
                rows[i][j].is_nan(),
                "duplicate grid node at (T={t}, K={k})"
            );
            rows[i][j] = vol;
        }
        Self::new(&times, &strikes, &rows, time_kind, strike_kind, extrapolation)
    }

    /// Expiry times of the grid.
    pub fn times(&self) -> &[Time] {
        self.time_axis.times()
    }

    /// Strikes of the grid.
    pub fn strikes(&self) -> &[Real] {
        &self.strikes
    }

    /// Quoted volatilities, one row per time.
    pub fn rows(&self) -> &[Vec<Volatility>] {
        &self.rows
    }

    fn evaluate(&self, t: Time, strike: Real) -> SurfaceDerivatives {
        self.time_axis.combine(t, |i| {
            let smile = &self.smiles[i];
            (
                smile.value(strike),
                smile.derivative(strike),
                smile.second_derivative(strike),
            )
        })
    }
}

impl VolatilitySurface for GridVolatilitySurface {
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
