//! Constant-parameter trinomial tree engine.
//!
//! Every step of the tree uses the same [`LatticeParameters`], so the node
//! spots form the closed-form ladder `S·d^i·(m/d)^j` and the whole tree is
//! described by a handful of numbers.

use lv_core::{ensure, errors::Result, DiscountFactor, Price, Probability, Rate, Real, Volatility};

use super::{
    backward_induction, LatticeParameters, LatticeSpecification, RecombiningLattice, TimeGrid,
};
use crate::payoff::OptionPayoff;

/// A recombining trinomial lattice with constant step parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantLattice {
    spot: Real,
    parameters: LatticeParameters,
    grid: TimeGrid,
    discount: DiscountFactor,
}

impl ConstantLattice {
    /// Lattice rooted at `spot` over `grid`, discounting each step by
    /// `discount`.
    pub fn new(
        spot: Real,
        parameters: LatticeParameters,
        grid: TimeGrid,
        discount: DiscountFactor,
    ) -> Self {
        Self {
            spot,
            parameters,
            grid,
            discount,
        }
    }

    /// The step parameters.
    pub fn parameters(&self) -> &LatticeParameters {
        &self.parameters
    }

    /// The time grid.
    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }
}

impl RecombiningLattice for ConstantLattice {
    fn steps(&self) -> usize {
        self.grid.steps()
    }

    fn underlying(&self, step: usize, node: usize) -> Real {
        self.spot
            * self.parameters.down_factor.powi(step as i32)
            * self.parameters.middle_over_down().powi(node as i32)
    }

    fn probabilities(&self, _step: usize, _node: usize) -> [Probability; 3] {
        self.parameters.probabilities()
    }

    fn discount(&self, _step: usize) -> DiscountFactor {
        self.discount
    }
}

/// Prices payoffs by backward induction on a constant-parameter lattice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrinomialTreeEngine;

impl TrinomialTreeEngine {
    /// Create the engine.
    pub fn new() -> Self {
        Self
    }

    /// Build the lattice used to price `payoff`.
    ///
    /// `dt = T / steps`, drift `r − q`, per-step discount `e^{−r·dt}`.
    pub fn build_lattice(
        &self,
        spec: &LatticeSpecification,
        payoff: &OptionPayoff,
        spot: Real,
        volatility: Volatility,
        interest_rate: Rate,
        dividend_rate: Rate,
    ) -> Result<ConstantLattice> {
        check_market(spot, interest_rate, dividend_rate)?;
        payoff.validate()?;
        let grid = TimeGrid::uniform(payoff.time_to_expiry(), spec.step_count())?;
        let dt = grid.dt();
        let parameters = spec.parameters(volatility, interest_rate - dividend_rate, dt)?;
        Ok(ConstantLattice::new(
            spot,
            parameters,
            grid,
            (-interest_rate * dt).exp(),
        ))
    }

    /// Price `payoff` under constant volatility and rates.
    ///
    /// A payoff already at expiry returns its immediate value.
    ///
    /// # Errors
    /// `InvalidInput` for non-positive spot or volatility, non-finite rates
    /// or a malformed payoff; `CalibrationFailure` if the lattice
    /// probabilities leave `(0, 1)`.
    pub fn price(
        &self,
        spec: &LatticeSpecification,
        payoff: &OptionPayoff,
        spot: Real,
        volatility: Volatility,
        interest_rate: Rate,
        dividend_rate: Rate,
    ) -> Result<Price> {
        check_market(spot, interest_rate, dividend_rate)?;
        payoff.validate()?;
        if payoff.time_to_expiry() == 0.0 {
            ensure!(
                volatility.is_finite() && volatility > 0.0,
                "volatility must be positive, got {volatility}"
            );
            return Ok(payoff.payoff_at_expiry(spot));
        }
        let lattice =
            self.build_lattice(spec, payoff, spot, volatility, interest_rate, dividend_rate)?;
        Ok(backward_induction(&lattice, payoff))
    }
}

fn check_market(spot: Real, interest_rate: Rate, dividend_rate: Rate) -> Result<()> {
    ensure!(
        spot.is_finite() && spot > 0.0,
        "spot must be positive, got {spot}"
    );
    ensure!(
        interest_rate.is_finite() && dividend_rate.is_finite(),
        "rates must be finite"
    );
    Ok(())
}
