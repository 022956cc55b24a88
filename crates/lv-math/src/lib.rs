//! # lv-math
//!
//! Mathematical building blocks: 1-D interpolation with derivative and
//! node-sensitivity queries, small dense linear solves (over nalgebra),
//! the normal distribution (via statrs) and the Black–Scholes reference
//! formula.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Black–Scholes closed-form prices.
pub mod black_formula;

/// Probability distributions.
pub mod distributions;

/// 1D interpolation schemes and extrapolation policies.
pub mod interpolations;

/// Small dense linear systems.
pub mod linear_algebra;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use black_formula::black_scholes_price;
pub use distributions::{normal_cdf, normal_pdf};
pub use interpolations::{
    Extrapolated, Extrapolation, Interpolation1D, InterpolatorKind, LinearInterpolation,
    NaturalCubicSpline,
};
pub use linear_algebra::{solve_3x3, solve_dense};
