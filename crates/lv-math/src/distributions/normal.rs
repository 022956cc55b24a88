//! Standard normal distribution.
//!
//! Wraps `statrs::distribution::Normal`.

use lv_core::Real;
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// The standard normal probability density function `φ(x)`.
#[inline]
pub fn normal_pdf(x: Real) -> Real {
    Normal::standard().pdf(x)
}

/// The standard normal cumulative distribution function `Φ(x)`.
#[inline]
pub fn normal_cdf(x: Real) -> Real {
    Normal::standard().cdf(x)
}
