//! Error types for localvol.
//!
//! Every fallible operation returns [`Result`], whose error side is a single
//! `thiserror`-derived enum with two families:
//!
//! * [`Error::InvalidInput`]: the caller handed in something unusable
//!   (non-positive spot, volatility or step count, malformed grid). Never
//!   retried.
//! * [`Error::CalibrationFailure`]: the inputs were well formed but the
//!   numerics could not produce an arbitrage-consistent answer at a specific
//!   [`Location`].
//!
//! The `ensure!`, `calibration_failure!` and `ensure_calibrated!` macros are
//! the usual way to raise them.

use std::fmt;

use thiserror::Error;

use crate::{Real, Time};

/// Coordinate at which a calibration failure occurred.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Location {
    /// A `(time, strike)` query point of a pointwise transform.
    Point {
        /// Time to expiry in years.
        time: Time,
        /// Strike level.
        strike: Real,
    },
    /// A node of a lattice time slice.
    Node {
        /// Time-slice index.
        slice: usize,
        /// Node index within the slice (0 = lowest spot).
        node: usize,
    },
    /// A whole lattice time slice.
    Slice {
        /// Time-slice index.
        slice: usize,
    },
    /// A constant-parameter lattice step.
    Lattice {
        /// Volatility used for the step.
        volatility: Real,
        /// Drift used for the step.
        drift: Real,
        /// Step length in years.
        dt: Time,
    },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Point { time, strike } => write!(f, "(T={time}, K={strike})"),
            Location::Node { slice, node } => write!(f, "slice {slice}, node {node}"),
            Location::Slice { slice } => write!(f, "slice {slice}"),
            Location::Lattice {
                volatility,
                drift,
                dt,
            } => write!(f, "lattice step (vol={volatility}, drift={drift}, dt={dt})"),
        }
    }
}

/// The top-level error type used throughout localvol.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Malformed or out-of-domain input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The calibration could not be carried out at `location`.
    #[error("calibration failure at {location}: {reason}")]
    CalibrationFailure {
        /// Where the failure occurred.
        location: Location,
        /// Human-readable cause.
        reason: String,
    },
}

impl Error {
    /// Build a [`Error::CalibrationFailure`].
    pub fn calibration(location: Location, reason: impl Into<String>) -> Self {
        Error::CalibrationFailure {
            location,
            reason: reason.into(),
        }
    }

    /// `true` for [`Error::CalibrationFailure`].
    pub fn is_calibration_failure(&self) -> bool {
        matches!(self, Error::CalibrationFailure { .. })
    }

    /// `true` for [`Error::InvalidInput`].
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }

    /// The failure coordinate, if this is a calibration failure.
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::CalibrationFailure { location, .. } => Some(*location),
            Error::InvalidInput(_) => None,
        }
    }
}

/// Shorthand `Result` type used throughout localvol.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Returns `Err(Error::InvalidInput(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use lv_core::{ensure, errors::Error};
/// fn positive(x: f64) -> lv_core::errors::Result<f64> {
///     ensure!(x > 0.0, "x must be positive, got {x}");
///     Ok(x)
/// }
/// assert!(positive(1.0).is_ok());
/// assert!(matches!(positive(-1.0), Err(Error::InvalidInput(_))));
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::InvalidInput(
                format!($($msg)*)
            ));
        }
    };
}

/// Returns `Err(Error::CalibrationFailure { .. })` at `$location` immediately.
///
/// # Example
/// ```
/// use lv_core::{calibration_failure, errors::{Error, Location}};
/// fn always_err() -> lv_core::errors::Result<()> {
///     calibration_failure!(Location::Slice { slice: 3 }, "mass mismatch");
/// }
/// assert!(always_err().unwrap_err().is_calibration_failure());
/// ```
#[macro_export]
macro_rules! calibration_failure {
    ($location:expr, $($msg:tt)*) => {
        return Err($crate::errors::Error::calibration($location, format!($($msg)*)))
    };
}

/// Returns a calibration failure at `$location` if `$cond` is false.
///
/// # Example
/// ```
/// use lv_core::{ensure_calibrated, errors::Location};
/// fn check(p: f64) -> lv_core::errors::Result<f64> {
///     ensure_calibrated!(p > 0.0 && p < 1.0, Location::Node { slice: 0, node: 0 },
///         "probability {p} outside (0, 1)");
///     Ok(p)
/// }
/// assert!(check(0.5).is_ok());
/// assert!(check(1.5).is_err());
/// ```
#[macro_export]
macro_rules! ensure_calibrated {
    ($cond:expr, $location:expr, $($msg:tt)*) => {
        if !$cond {
            $crate::calibration_failure!($location, $($msg)*);
        }
    };
}
