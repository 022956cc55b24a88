//! # localvol
//!
//! Local-volatility calibration from implied-volatility surfaces.
//!
//! This crate is a **façade** that re-exports the public items of the
//! `lv-*` workspace crates. Application code should depend on this crate
//! rather than on the individual crates.
//!
//! Two calculators are provided:
//!
//! * [`DupireLocalVolatilityCalculator`](calibration::DupireLocalVolatilityCalculator)
//!   evaluates Dupire's formula pointwise on the implied surface.
//! * [`ImpliedTrinomialTreeLocalVolatilityCalculator`](calibration::ImpliedTrinomialTreeLocalVolatilityCalculator)
//!   calibrates a trinomial lattice to option prices slice by slice and reads
//!   the local variance off its transition probabilities.
//!
//! ## Quick start
//!
//! ```rust
//! use localvol::prelude::*;
//!
//! let surface = ConstantVolatilitySurface::new(0.2).unwrap();
//! let r = FlatRateCurve::new(0.03).unwrap();
//! let q = FlatRateCurve::new(0.01).unwrap();
//!
//! let dupire = DupireLocalVolatilityCalculator::default()
//!     .local_volatility(&surface, 100.0, &r, &q)
//!     .unwrap();
//! assert!((dupire.volatility(1.0, 110.0).unwrap() - 0.2).abs() < 1e-8);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Numeric aliases, errors and diagnostics.
pub use lv_core as core;

/// Interpolation, linear algebra, distributions.
pub use lv_math as math;

/// Rate curves and volatility surfaces.
pub use lv_termstructures as termstructures;

/// Trinomial lattices and option payoffs.
pub use lv_methods as methods;

/// Dupire and implied-tree calculators.
pub use lv_calibration as calibration;

/// The types most applications need.
pub mod prelude {
    pub use lv_calibration::{
        BuildState, CalibratedLattice, DerivativeMethod, DupireConfig,
        DupireLocalVolatilityCalculator, ImpliedTreeConfig,
        ImpliedTrinomialTreeLocalVolatilityCalculator, LatticeCache, SurfaceId,
    };
    pub use lv_core::{Diagnostics, Error, Location, NumericalWarning, OptionType, Result};
    pub use lv_math::{Extrapolation, InterpolatorKind};
    pub use lv_methods::{LatticeScheme, LatticeSpecification, OptionPayoff, TrinomialTreeEngine};
    pub use lv_termstructures::{
        ConstantVolatilitySurface, FlatRateCurve, GridVolatilitySurface, InterpolatedZeroCurve,
        LocalVolatilitySurface, RateCurve, VolatilitySurface,
    };
}
