//! Option payoffs evaluated on lattice nodes.
//!
//! The set is closed: European, American (early exercise at every node) and
//! continuously monitored knock-out barriers. Each payoff is a pure function
//! of node data; the lattice only needs [`OptionPayoff::payoff_at_expiry`]
//! at the last slice and [`OptionPayoff::continuation_or_intrinsic`] on the
//! way back.

use std::fmt;

use lv_core::{ensure, errors::Result, OptionType, Price, Real, Time};

/// Direction of a knock-out barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BarrierKind {
    /// Knocked out once the spot reaches the barrier from below.
    UpAndOut,
    /// Knocked out once the spot reaches the barrier from above.
    DownAndOut,
}

impl fmt::Display for BarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarrierKind::UpAndOut => write!(f, "up-and-out"),
            BarrierKind::DownAndOut => write!(f, "down-and-out"),
        }
    }
}

/// A vanilla or knock-out payoff on a single underlying.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OptionPayoff {
    /// Exercise at expiry only.
    European {
        /// Call or put.
        option_type: OptionType,
        /// Strike price.
        strike: Real,
        /// Time to expiry in years.
        expiry: Time,
    },
    /// Exercise at any lattice node up to expiry.
    American {
        /// Call or put.
        option_type: OptionType,
        /// Strike price.
        strike: Real,
        /// Time to expiry in years.
        expiry: Time,
    },
    /// European vanilla that dies when the barrier is touched, paying the
    /// rebate at that point instead.
    Barrier {
        /// Call or put.
        option_type: OptionType,
        /// Strike price.
        strike: Real,
        /// Time to expiry in years.
        expiry: Time,
        /// Barrier direction.
        kind: BarrierKind,
        /// Barrier level.
        barrier: Real,
        /// Cash paid on knock-out.
        rebate: Price,
    },
}

impl OptionPayoff {
    /// European payoff.
    pub fn european(option_type: OptionType, strike: Real, expiry: Time) -> Self {
        OptionPayoff::European {
            option_type,
            strike,
            expiry,
        }
    }

    /// American payoff.
    pub fn american(option_type: OptionType, strike: Real, expiry: Time) -> Self {
        OptionPayoff::American {
            option_type,
            strike,
            expiry,
        }
    }

    /// Knock-out barrier payoff.
    pub fn barrier(
        option_type: OptionType,
        strike: Real,
        expiry: Time,
        kind: BarrierKind,
        barrier: Real,
        rebate: Price,
    ) -> Self {
        OptionPayoff::Barrier {
            option_type,
            strike,
            expiry,
            kind,
            barrier,
            rebate,
        }
    }

    /// Check strike, expiry, barrier and rebate.
    pub fn validate(&self) -> Result<()> {
        let (strike, expiry) = (self.strike(), self.time_to_expiry());
        ensure!(
            strike.is_finite() && strike > 0.0,
            "strike must be positive, got {strike}"
        );
        ensure!(
            expiry.is_finite() && expiry >= 0.0,
            "expiry must be non-negative, got {expiry}"
        );
        if let OptionPayoff::Barrier {
            barrier, rebate, ..
        } = *self
        {
            ensure!(
                barrier.is_finite() && barrier > 0.0,
                "barrier must be positive, got {barrier}"
            );
            ensure!(
                rebate.is_finite() && rebate >= 0.0,
                "rebate must be non-negative, got {rebate}"
            );
        }
        Ok(())
    }

    /// Time to expiry in years.
    pub fn time_to_expiry(&self) -> Time {
        match *self {
            OptionPayoff::European { expiry, .. }
            | OptionPayoff::American { expiry, .. }
            | OptionPayoff::Barrier { expiry, .. } => expiry,
        }
    }

    /// Strike price.
    pub fn strike(&self) -> Real {
        match *self {
            OptionPayoff::European { strike, .. }
            | OptionPayoff::American { strike, .. }
            | OptionPayoff::Barrier { strike, .. } => strike,
        }
    }

    /// Call or put.
    pub fn option_type(&self) -> OptionType {
        match *self {
            OptionPayoff::European { option_type, .. }
            | OptionPayoff::American { option_type, .. }
            | OptionPayoff::Barrier { option_type, .. } => option_type,
        }
    }

    /// Immediate exercise value `max(φ(S − K), 0)`.
    pub fn intrinsic(&self, spot: Real) -> Price {
        self.option_type().intrinsic(spot, self.strike())
    }

    /// `true` if `spot` lies on or beyond the barrier.
    pub fn is_knocked_out(&self, spot: Real) -> bool {
        match *self {
            OptionPayoff::Barrier { kind, barrier, .. } => match kind {
                BarrierKind::UpAndOut => spot >= barrier,
                BarrierKind::DownAndOut => spot <= barrier,
            },
            _ => false,
        }
    }

    /// Value at a node of the expiry slice.
    pub fn payoff_at_expiry(&self, spot: Real) -> Price {
        match *self {
            OptionPayoff::Barrier { rebate, .. } if self.is_knocked_out(spot) => rebate,
            _ => self.intrinsic(spot),
        }
    }

    /// Value at an earlier node given the discounted expected value of the
    /// children.
    pub fn continuation_or_intrinsic(&self, continuation: Price, spot: Real) -> Price {
        match *self {
            OptionPayoff::European { .. } => continuation,
            OptionPayoff::American { .. } => continuation.max(self.intrinsic(spot)),
            OptionPayoff::Barrier { rebate, .. } => {
                if self.is_knocked_out(spot) {
                    rebate
                } else {
                    continuation
                }
            }
        }
    }
}
