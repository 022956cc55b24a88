//! Reuse of calibrated lattices.
//!
//! Calibrating an implied lattice prices `O(N²)` options, so callers that
//! query the same market snapshot repeatedly keep the result in a
//! [`LatticeCache`]. Entries are keyed by a caller-assigned [`SurfaceId`],
//! the spot and the calculator configuration. The id stands for the whole
//! snapshot (the surface together with its rate curves); callers must
//! [`invalidate_surface`](LatticeCache::invalidate_surface) when any part of
//! it changes.

use std::collections::HashMap;
use std::sync::Arc;

use lv_core::{errors::Result, Real, Size};
use lv_termstructures::{RateCurve, VolatilitySurface};

use crate::config::ImpliedTreeConfig;
use crate::implied_tree::{CalibratedLattice, ImpliedTrinomialTreeLocalVolatilityCalculator};

/// Caller-assigned identity of a market snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceId(pub u64);

/// Cache key: snapshot, spot and every configuration field, with floats
/// compared bitwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LatticeKey {
    surface: SurfaceId,
    spot_bits: u64,
    step_count: Size,
    spacing_bits: u64,
    max_time_bits: u64,
    mass_tolerance_bits: u64,
}

impl LatticeKey {
    /// Key of a calibration of `surface` at `spot` under `config`.
    pub fn new(surface: SurfaceId, spot: Real, config: &ImpliedTreeConfig) -> Self {
        Self {
            surface,
            spot_bits: spot.to_bits(),
            step_count: config.step_count(),
            spacing_bits: config.spacing().to_bits(),
            max_time_bits: config.max_time().to_bits(),
            mass_tolerance_bits: config.mass_tolerance().to_bits(),
        }
    }

    /// The snapshot this key belongs to.
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }
}

/// Calibrated lattices shared behind [`Arc`].
#[derive(Debug, Default)]
pub struct LatticeCache {
    entries: HashMap<LatticeKey, Arc<CalibratedLattice>>,
}

impl LatticeCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached lattice for the key, calibrating and storing it on a miss.
    /// Failed calibrations are not cached.
    pub fn get_or_calibrate(
        &mut self,
        calculator: &ImpliedTrinomialTreeLocalVolatilityCalculator,
        surface_id: SurfaceId,
        surface: &dyn VolatilitySurface,
        spot: Real,
        interest_rate: &dyn RateCurve,
        dividend_rate: &dyn RateCurve,
    ) -> Result<Arc<CalibratedLattice>> {
        let key = LatticeKey::new(surface_id, spot, calculator.config());
        if let Some(lattice) = self.entries.get(&key) {
            tracing::trace!(surface = surface_id.0, spot, "lattice cache hit");
            return Ok(Arc::clone(lattice));
        }
        let lattice = Arc::new(calculator.calibrate_lattice(
            surface,
            spot,
            interest_rate,
            dividend_rate,
        )?);
        self.entries.insert(key, Arc::clone(&lattice));
        Ok(lattice)
    }

    /// Lookup without calibrating.
    pub fn get(&self, key: &LatticeKey) -> Option<Arc<CalibratedLattice>> {
        self.entries.get(key).cloned()
    }

    /// Drop every entry of `surface`; returns how many were removed.
    pub fn invalidate_surface(&mut self, surface: SurfaceId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.surface != surface);
        before - self.entries.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached lattices.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
