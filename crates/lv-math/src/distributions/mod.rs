//! Probability distributions, delegating to the `statrs` crate.

mod normal;

pub use normal::{normal_cdf, normal_pdf};
