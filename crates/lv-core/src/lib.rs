//! # lv-core
//!
//! Core types shared by every crate in the localvol workspace.
//!
//! This crate provides the numeric type aliases, the error hierarchy with its
//! `ensure!` / `calibration_failure!` / `ensure_calibrated!` macros, and the
//! [`Diagnostics`] record used to report non-fatal numerical warnings.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Public modules ───────────────────────────────────────────────────────────

/// Error types and the `ensure!` / `calibration_failure!` /
/// `ensure_calibrated!` macros.
pub mod errors;

/// Non-fatal numerical warnings and the `Diagnostics` accumulator.
pub mod diagnostics;

/// Call / put flag.
pub mod option_type;

// ── Primitive type aliases ────────────────────────────────────────────────────

/// Floating-point type used throughout the library.
pub type Real = f64;

/// Alias used for array sizes / indices.
pub type Size = usize;

/// A rate expressed as a decimal (e.g. 0.05 = 5 %).
pub type Rate = Real;

/// A discount factor in [0, 1].
pub type DiscountFactor = Real;

/// A probability in [0, 1].
pub type Probability = Real;

/// A price or value.
pub type Price = Real;

/// A volatility level expressed as a decimal.
pub type Volatility = Real;

/// A time measurement in years.
pub type Time = Real;

// ── Re-exports for convenience ────────────────────────────────────────────────

pub use diagnostics::{Diagnostics, NumericalWarning};
pub use errors::{Error, Location, Result};
pub use option_type::OptionType;
