//! Recombining trinomial lattices.
//!
//! # Overview
//!
//! * [`LatticeSpecification`]: constant-parameter step factors and
//!   probabilities for a given volatility, drift and step length
//! * [`TrinomialTreeEngine`]: prices a payoff on a [`ConstantLattice`]
//! * [`TimeGrid`]: uniform grid of time points
//! * [`RecombiningLattice`] / [`backward_induction`]: the pricing loop shared
//!   by constant lattices and calibrated (implied) lattices
//!
//! Slice `i` of every lattice holds `2i + 1` nodes indexed from the lowest
//! spot. Node `j` of slice `i` branches to nodes `j` (down), `j + 1` (middle)
//! and `j + 2` (up) of slice `i + 1`.

pub mod specification;
pub mod trinomial_tree;

pub use specification::{LatticeParameters, LatticeScheme, LatticeSpecification};
pub use trinomial_tree::{ConstantLattice, TrinomialTreeEngine};

use lv_core::{ensure, errors::Result, DiscountFactor, Price, Probability, Real, Time};

use crate::payoff::OptionPayoff;

// ─── TimeGrid ─────────────────────────────────────────────────────────────────

/// A grid of time points used by lattice methods.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    times: Vec<Time>,
    dt: Time,
}

impl TimeGrid {
    /// Create a uniform time grid from 0 to `end` with `steps` intervals.
    pub fn uniform(end: Time, steps: usize) -> Result<Self> {
        ensure!(steps > 0, "steps must be > 0");
        ensure!(
            end.is_finite() && end > 0.0,
            "grid end must be positive, got {end}"
        );
        let dt = end / steps as Real;
        let mut times: Vec<Time> = (0..steps).map(|i| i as Real * dt).collect();
        times.push(end);
        Ok(Self { times, dt })
    }

    /// Number of time points (= steps + 1).
    pub fn size(&self) -> usize {
        self.times.len()
    }

    /// Number of steps (= time points − 1).
    pub fn steps(&self) -> usize {
        self.times.len() - 1
    }

    /// Time at index `i`.
    pub fn time(&self, i: usize) -> Time {
        self.times[i]
    }

    /// Step length.
    pub fn dt(&self) -> Time {
        self.dt
    }

    /// Final time.
    pub fn end(&self) -> Time {
        self.times[self.times.len() - 1]
    }

    /// All time points.
    pub fn times(&self) -> &[Time] {
        &self.times
    }
}

// ─── Lattice abstraction ──────────────────────────────────────────────────────

/// A recombining trinomial lattice that can be rolled back.
pub trait RecombiningLattice {
    /// Number of time steps.
    fn steps(&self) -> usize;

    /// Number of nodes at slice `step`.
    fn size(&self, step: usize) -> usize {
        2 * step + 1
    }

    /// Underlying spot at node `(step, node)`.
    fn underlying(&self, step: usize, node: usize) -> Real;

    /// Transition probabilities `[down, middle, up]` out of `(step, node)`.
    fn probabilities(&self, step: usize, node: usize) -> [Probability; 3];

    /// Discount factor from slice `step` to slice `step + 1`.
    fn discount(&self, step: usize) -> DiscountFactor;
}

/// Price `payoff` by backward induction over `lattice`.
///
/// Terminal values come from [`OptionPayoff::payoff_at_expiry`] at every node
/// of the last slice; each earlier node receives the discounted,
/// probability-weighted value of its three children passed through
/// [`OptionPayoff::continuation_or_intrinsic`].
pub fn backward_induction(lattice: &dyn RecombiningLattice, payoff: &OptionPayoff) -> Price {
    let n = lattice.steps();

    let mut values: Vec<Price> = (0..lattice.size(n))
        .map(|j| payoff.payoff_at_expiry(lattice.underlying(n, j)))
        .collect();

    for i in (0..n).rev() {
        let discount = lattice.discount(i);
        values = (0..lattice.size(i))
            .map(|j| {
                let [pd, pm, pu] = lattice.probabilities(i, j);
                let hold = discount * (pd * values[j] + pm * values[j + 1] + pu * values[j + 2]);
                payoff.continuation_or_intrinsic(hold, lattice.underlying(i, j))
            })
            .collect();
    }

    values[0]
}

// ─── Tests ────────────────────────────────────────────────────────────────────
