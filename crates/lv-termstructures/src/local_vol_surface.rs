//! `LocalVolatilitySurface` — the output of a local-volatility calibration.
//!
//! Semantically this is the instantaneous volatility of the underlying
//! conditional on `(t, S_t = K)`, not an option-implied quantity, but it
//! honours the same [`VolatilitySurface`] contract so downstream engines can
//! consume it in place of an implied surface. The non-fatal warnings raised
//! while building it travel with it.

use lv_core::{errors::Result, Diagnostics, Real, Time, Volatility};

use crate::grid_surface::GridVolatilitySurface;
use crate::slice_surface::SliceInterpolatedSurface;
use crate::volatility_surface::{SurfaceDerivatives, VolatilitySurface};

#[derive(Debug)]
enum Representation {
    Grid(GridVolatilitySurface),
    Slices(SliceInterpolatedSurface),
}

/// A calibrated local-volatility surface.
#[derive(Debug)]
pub struct LocalVolatilitySurface {
    representation: Representation,
    diagnostics: Diagnostics,
}

impl LocalVolatilitySurface {
    /// Local volatilities materialised on a rectangular grid.
    pub fn from_grid(surface: GridVolatilitySurface, diagnostics: Diagnostics) -> Self {
        Self {
            representation: Representation::Grid(surface),
            diagnostics,
        }
    }

    /// Local volatilities sampled on lattice slices.
    pub fn from_slices(surface: SliceInterpolatedSurface, diagnostics: Diagnostics) -> Self {
        Self {
            representation: Representation::Slices(surface),
            diagnostics,
        }
    }

    /// Warnings recorded during calibration.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// The grid representation, if materialised on a grid.
    pub fn as_grid(&self) -> Option<&GridVolatilitySurface> {
        match &self.representation {
            Representation::Grid(g) => Some(g),
            Representation::Slices(_) => None,
        }
    }

    /// The slice representation, if sampled on a lattice.
    pub fn as_slices(&self) -> Option<&SliceInterpolatedSurface> {
        match &self.representation {
            Representation::Slices(s) => Some(s),
            Representation::Grid(_) => None,
        }
    }

    fn inner(&self) -> &dyn VolatilitySurface {
        match &self.representation {
            Representation::Grid(g) => g,
            Representation::Slices(s) => s,
        }
    }
}

impl VolatilitySurface for LocalVolatilitySurface {
    fn volatility(&self, t: Time, strike: Real) -> Result<Volatility> {
        self.inner().volatility(t, strike)
    }

    fn derivatives(&self, t: Time, strike: Real) -> Option<Result<SurfaceDerivatives>> {
        self.inner().derivatives(t, strike)
    }
}
