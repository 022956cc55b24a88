//! # lv-calibration
//!
//! Maps an implied-volatility surface to a local-volatility surface, either
//! through Dupire's formula evaluated pointwise
//! ([`DupireLocalVolatilityCalculator`]) or by forward-calibrating an
//! implied trinomial lattice slice by slice
//! ([`ImpliedTrinomialTreeLocalVolatilityCalculator`]).
//!
//! Both calculators hold only configuration and borrow their inputs, so
//! independent calibrations may run concurrently on shared surfaces and
//! curves. Failures are returned as [`lv_core::Error::CalibrationFailure`]
//! with the offending coordinate; non-fatal events are collected as
//! [`lv_core::Diagnostics`] on the result.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Lattice cache keyed by surface identity, spot and configuration.
pub mod cache;

/// Calculator configuration.
pub mod config;

/// Dupire local volatility.
pub mod dupire;

/// Implied trinomial tree calibration.
pub mod implied_tree;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use cache::{LatticeCache, LatticeKey, SurfaceId};
pub use config::{DerivativeMethod, DupireConfig, ImpliedTreeConfig};
pub use dupire::{
    DupireLocalVolatility, DupireLocalVolatilityCalculator, LocalVolatilityPoint,
    LOCAL_VARIANCE_FLOOR,
};
pub use implied_tree::{
    BuildState, CalibratedLattice, ImpliedLatticeBuilder,
    ImpliedTrinomialTreeLocalVolatilityCalculator, LocalVarianceSample,
};
