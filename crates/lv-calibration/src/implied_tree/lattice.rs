//! The calibrated (implied) trinomial lattice.

use lv_core::{
    ensure, errors::Result, Diagnostics, DiscountFactor, Price, Probability, Real, Time,
};
use lv_methods::{backward_induction, OptionPayoff, RecombiningLattice, TimeGrid};
use lv_termstructures::{LocalVolatilitySurface, SliceInterpolatedSurface, SurfaceSlice};

/// A local-variance estimate at one lattice node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalVarianceSample {
    /// Slice index.
    pub slice: usize,
    /// Node index within the slice.
    pub node: usize,
    /// Slice time.
    pub time: Time,
    /// Node spot.
    pub spot: Real,
    /// Local variance (floored if necessary).
    pub variance: Real,
}

impl LocalVarianceSample {
    /// Local volatility `√variance`.
    pub fn volatility(&self) -> Real {
        self.variance.sqrt()
    }
}

/// A trinomial lattice whose node probabilities were calibrated to an
/// implied volatility surface.
///
/// Slice `i` holds `2i + 1` nodes. Every slice carries Arrow–Debreu state
/// prices whose sum equals the discount factor to that slice.
#[derive(Debug, Clone)]
pub struct CalibratedLattice {
    pub(crate) grid: TimeGrid,
    pub(crate) log_spacing: Real,
    pub(crate) spots: Vec<Vec<Real>>,
    pub(crate) state_prices: Vec<Vec<Real>>,
    pub(crate) transitions: Vec<Vec<[Probability; 3]>>,
    pub(crate) discounts: Vec<DiscountFactor>,
    pub(crate) samples: Vec<LocalVarianceSample>,
    pub(crate) diagnostics: Diagnostics,
}

impl CalibratedLattice {
    /// The time grid.
    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// Log-distance between neighbouring nodes of a slice.
    pub fn log_spacing(&self) -> Real {
        self.log_spacing
    }

    /// Node spots of slice `slice`, ascending.
    pub fn spots(&self, slice: usize) -> &[Real] {
        &self.spots[slice]
    }

    /// Arrow–Debreu state prices of slice `slice`.
    pub fn state_prices(&self, slice: usize) -> &[Real] {
        &self.state_prices[slice]
    }

    /// `[down, middle, up]` transition probabilities out of slice `slice`.
    pub fn transitions(&self, slice: usize) -> &[[Probability; 3]] {
        &self.transitions[slice]
    }

    /// One-step discount factors `D(t_{i+1}) / D(t_i)`.
    pub fn discount_factors(&self) -> &[DiscountFactor] {
        &self.discounts
    }

    /// Local-variance samples at the interior nodes.
    pub fn local_variance_samples(&self) -> &[LocalVarianceSample] {
        &self.samples
    }

    /// Warnings recorded during calibration.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Price `payoff` by backward induction with the calibrated
    /// probabilities.
    ///
    /// The payoff must expire at the lattice horizon.
    pub fn price(&self, payoff: &OptionPayoff) -> Result<Price> {
        payoff.validate()?;
        let horizon = self.grid.end();
        let expiry = payoff.time_to_expiry();
        ensure!(
            (expiry - horizon).abs() <= 1e-12 * horizon.max(1.0),
            "payoff expiry {expiry} differs from lattice horizon {horizon}"
        );
        Ok(backward_induction(self, payoff))
    }

    /// Fit the local-volatility samples slice by slice: linear in spot with
    /// flat extrapolation within a slice, linear in time between slices.
    pub fn local_volatility_surface(&self) -> Result<LocalVolatilitySurface> {
        let mut slices: Vec<SurfaceSlice> = Vec::new();
        for sample in &self.samples {
            let node = (sample.spot, sample.volatility());
            match slices.last_mut() {
                Some(last) if last.time == sample.time => last.nodes.push(node),
                _ => slices.push(SurfaceSlice {
                    time: sample.time,
                    nodes: vec![node],
                }),
            }
        }
        let surface = SliceInterpolatedSurface::new(slices)?;
        Ok(LocalVolatilitySurface::from_slices(
            surface,
            self.diagnostics.clone(),
        ))
    }
}

impl RecombiningLattice for CalibratedLattice {
    fn steps(&self) -> usize {
        self.grid.steps()
    }

    fn underlying(&self, step: usize, node: usize) -> Real {
        self.spots[step][node]
    }

    fn probabilities(&self, step: usize, node: usize) -> [Probability; 3] {
        self.transitions[step][node]
    }

    fn discount(&self, step: usize) -> DiscountFactor {
        self.discounts[step]
    }
}
