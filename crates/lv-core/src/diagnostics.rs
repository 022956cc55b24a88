//! Non-fatal numerical warnings.
//!
//! A calibration can succeed while still having to bend the numerics in a
//! few places: a local variance that came out negative and was floored, or a
//! wing node whose probabilities had to be assigned from the forward alone.
//! These events are collected in a [`Diagnostics`] record that travels with
//! the result, so callers can judge how reliable the wings are.

use std::fmt;

use crate::{Real, Time};

/// A recorded, non-fatal numerical event.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NumericalWarning {
    /// A local variance was negative (or zero) and replaced by the floor.
    VarianceFloored {
        /// Time coordinate of the sample.
        time: Time,
        /// Strike / spot coordinate of the sample.
        strike: Real,
        /// The variance before flooring.
        raw_variance: Real,
    },
    /// Transition probabilities of a lattice node were assigned from the
    /// forward condition only.
    WingFallback {
        /// Time-slice index.
        slice: usize,
        /// Node index within the slice.
        node: usize,
    },
}

impl fmt::Display for NumericalWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericalWarning::VarianceFloored {
                time,
                strike,
                raw_variance,
            } => write!(
                f,
                "local variance {raw_variance:e} floored at (T={time}, K={strike})"
            ),
            NumericalWarning::WingFallback { slice, node } => write!(
                f,
                "forward-only probabilities used at slice {slice}, node {node}"
            ),
        }
    }
}

/// Accumulated warnings of one calibration run.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostics {
    warnings: Vec<NumericalWarning>,
}

impl Diagnostics {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and emit it through `tracing`.
    pub fn record(&mut self, warning: NumericalWarning) {
        tracing::warn!(%warning, "numerical warning");
        self.warnings.push(warning);
    }

    /// Append all warnings of `other`, without re-emitting them.
    pub fn merge(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    /// All warnings, in the order they were recorded.
    pub fn warnings(&self) -> &[NumericalWarning] {
        &self.warnings
    }

    /// Total number of warnings.
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Number of floored local variances.
    pub fn floored_variance_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, NumericalWarning::VarianceFloored { .. }))
            .count()
    }

    /// Number of nodes that used the forward-only fallback.
    pub fn wing_fallback_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, NumericalWarning::WingFallback { .. }))
            .count()
    }
}
