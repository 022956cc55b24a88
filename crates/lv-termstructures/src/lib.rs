//! # lv-termstructures
//!
//! Deterministic rate curves and volatility surfaces: the read-only inputs a
//! local-volatility calibration consumes, and the local-volatility surface
//! it produces.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// `RateCurve` — continuously-compounded zero-rate curves.
pub mod rate_curve;

/// `VolatilitySurface` — the point-evaluation contract shared by implied and
/// local volatility surfaces.
pub mod volatility_surface;

/// `ConstantVolatilitySurface` — flat volatility.
pub mod constant_vol;

/// `GridVolatilitySurface` — rectangular (time × strike) grid surface.
pub mod grid_surface;

/// `SliceInterpolatedSurface` — per-time-slice strike nodes.
pub mod slice_surface;

/// `LocalVolatilitySurface` — calibration output with its diagnostics.
pub mod local_vol_surface;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use constant_vol::ConstantVolatilitySurface;
pub use grid_surface::GridVolatilitySurface;
pub use local_vol_surface::LocalVolatilitySurface;
pub use rate_curve::{FlatRateCurve, InterpolatedZeroCurve, RateCurve, RateFunction};
pub use slice_surface::{SliceInterpolatedSurface, SurfaceSlice};
pub use volatility_surface::{SurfaceDerivatives, VolatilitySurface};
