//! # lv-methods
//!
//! Lattice methods: the constant-parameter trinomial lattice specification,
//! the option payoffs evaluated on lattices, and the backward-induction
//! pricer shared by constant and calibrated lattices.
//!
//! # Modules
//!
//! * [`lattice`]: time grids, lattice parameterisations, the trinomial tree
//!   engine and generic backward induction
//! * [`payoff`]: European, American and knock-out barrier payoffs

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Recombining trinomial lattices and backward induction.
pub mod lattice;

/// Payoffs evaluated at lattice nodes.
pub mod payoff;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use lattice::{
    backward_induction, ConstantLattice, LatticeParameters, LatticeScheme, LatticeSpecification,
    RecombiningLattice, TimeGrid, TrinomialTreeEngine,
};
pub use payoff::{BarrierKind, OptionPayoff};
