//! Forward construction of the implied trinomial lattice.
//!
//! The lattice is grown one time slice at a time. For slice `i` every node
//! `j` is paired with one calibration option expiring at `t_{i+1}` and struck
//! at the node's spot: a call for the upper half (`j ≥ i`), a put for the
//! lower half. Because the strike coincides with the middle child of node
//! `j`, only one child of node `j` is in the money and every other node's
//! contribution to the option price is fixed by its forward. That leaves a
//! 3×3 linear system per node:
//!
//! ```text
//! p_d + p_m + p_u                     = 1
//! p_d·s_j + p_m·s_{j+1} + p_u·s_{j+2} = F_j
//! p_u·(s_{j+2} − s_{j+1})             = (C/df − Σ_{j'>j} λ_{j'}(F_{j'} − K)) / λ_j   (call)
//! p_d·(s_{j+1} − s_j)                 = (P/df − Σ_{j'<j} λ_{j'}(K − F_{j'})) / λ_j   (put)
//! ```
//!
//! where `s` are the child spots, `λ` the state prices of slice `i`, `df`
//! the one-step discount factor and `F` the one-step forwards. Nodes whose
//! solution leaves `(0, 1)` fall back to a forward-only assignment.

use std::fmt;

use rayon::prelude::*;

use lv_core::{
    calibration_failure, ensure, ensure_calibrated,
    errors::{Error, Result},
    Diagnostics, DiscountFactor, Location, NumericalWarning, OptionType, Price, Probability, Real,
};
use lv_math::solve_3x3;
use lv_methods::{LatticeSpecification, OptionPayoff, TimeGrid, TrinomialTreeEngine};
use lv_termstructures::{RateCurve, VolatilitySurface};

use super::lattice::{CalibratedLattice, LocalVarianceSample};
use crate::config::ImpliedTreeConfig;
use crate::dupire::LOCAL_VARIANCE_FLOOR;

/// Progress of an implied lattice build.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildState {
    /// Nothing built yet.
    Empty,
    /// Slices `0..=slice` are calibrated.
    Growing {
        /// Last calibrated slice.
        slice: usize,
    },
    /// All slices calibrated and local variances extracted.
    Calibrated,
    /// The build failed while growing out of `slice`; no further progress
    /// is possible.
    Failed {
        /// Slice being grown when the failure occurred.
        slice: usize,
        /// The failure.
        error: Error,
    },
}

impl BuildState {
    /// `true` for `Calibrated` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildState::Calibrated | BuildState::Failed { .. })
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildState::Empty => write!(f, "empty"),
            BuildState::Growing { slice } => write!(f, "growing (slice {slice})"),
            BuildState::Calibrated => write!(f, "calibrated"),
            BuildState::Failed { slice, error } => write!(f, "failed at slice {slice}: {error}"),
        }
    }
}

/// Builds a [`CalibratedLattice`] slice by slice.
#[derive(Debug)]
pub struct ImpliedLatticeBuilder<'a> {
    config: ImpliedTreeConfig,
    surface: &'a dyn VolatilitySurface,
    spot: Real,
    interest_rate: &'a dyn RateCurve,
    dividend_rate: &'a dyn RateCurve,
    engine: TrinomialTreeEngine,
    calibration_spec: LatticeSpecification,
    grid: TimeGrid,
    log_spacing: Real,
    state: BuildState,
    spots: Vec<Vec<Real>>,
    state_prices: Vec<Vec<Real>>,
    transitions: Vec<Vec<[Probability; 3]>>,
    discounts: Vec<DiscountFactor>,
    samples: Vec<LocalVarianceSample>,
    diagnostics: Diagnostics,
}

impl<'a> ImpliedLatticeBuilder<'a> {
    /// Prepare a build. The reference volatility `σ(max_time, spot)` fixes
    /// the log-spacing `Δx = λ·σ_ref·√(3·dt)` of every slice.
    pub fn new(
        config: ImpliedTreeConfig,
        surface: &'a dyn VolatilitySurface,
        spot: Real,
        interest_rate: &'a dyn RateCurve,
        dividend_rate: &'a dyn RateCurve,
    ) -> Result<Self> {
        config.validate()?;
        ensure!(
            spot.is_finite() && spot > 0.0,
            "spot must be positive, got {spot}"
        );
        let grid = TimeGrid::uniform(config.max_time(), config.step_count())?;
        let reference_vol = surface.volatility(config.max_time(), spot)?;
        ensure!(
            reference_vol.is_finite() && reference_vol > 0.0,
            "reference volatility must be positive, got {reference_vol}"
        );
        let log_spacing = config.spacing() * reference_vol * (3.0 * grid.dt()).sqrt();
        let calibration_spec =
            LatticeSpecification::moment_matching(config.spacing(), config.step_count())?;

        tracing::debug!(
            steps = config.step_count(),
            spacing = config.spacing(),
            max_time = config.max_time(),
            reference_vol,
            log_spacing,
            "implied lattice build started"
        );

        Ok(Self {
            config,
            surface,
            spot,
            interest_rate,
            dividend_rate,
            engine: TrinomialTreeEngine::new(),
            calibration_spec,
            grid,
            log_spacing,
            state: BuildState::Empty,
            spots: Vec::new(),
            state_prices: Vec::new(),
            transitions: Vec::new(),
            discounts: Vec::new(),
            samples: Vec::new(),
            diagnostics: Diagnostics::new(),
        })
    }

    /// Current build state.
    pub fn state(&self) -> &BuildState {
        &self.state
    }

    /// Advance the build by one transition of the state machine.
    ///
    /// `Empty` seeds slice 0; `Growing` calibrates the next slice, or
    /// extracts the local variances once the last slice exists. A failure
    /// moves the build to `Failed` and is returned; stepping a terminal build
    /// changes nothing (a failed build keeps returning its error).
    pub fn step(&mut self) -> Result<&BuildState> {
        match &self.state {
            BuildState::Empty => {
                self.spots.push(vec![self.spot]);
                self.state_prices.push(vec![1.0]);
                self.state = BuildState::Growing { slice: 0 };
            }
            BuildState::Growing { slice } => {
                let slice = *slice;
                let outcome = if slice == self.grid.steps() {
                    self.extract_local_variances()
                        .map(|()| BuildState::Calibrated)
                } else {
                    self.grow(slice)
                        .map(|()| BuildState::Growing { slice: slice + 1 })
                };
                match outcome {
                    Ok(next) => self.state = next,
                    Err(error) => {
                        tracing::debug!(slice, %error, "implied lattice build failed");
                        self.state = BuildState::Failed {
                            slice,
                            error: error.clone(),
                        };
                        return Err(error);
                    }
                }
            }
            BuildState::Calibrated => {}
            BuildState::Failed { error, .. } => return Err(error.clone()),
        }
        Ok(&self.state)
    }

    /// Step until the build is calibrated and hand over the lattice.
    pub fn run(mut self) -> Result<CalibratedLattice> {
        while !self.state.is_terminal() {
            self.step()?;
        }
        self.into_lattice()
    }

    /// The finished lattice, if the build is calibrated.
    pub fn into_lattice(self) -> Result<CalibratedLattice> {
        match self.state {
            BuildState::Calibrated => {
                tracing::debug!(
                    samples = self.samples.len(),
                    warnings = self.diagnostics.len(),
                    wing_fallbacks = self.diagnostics.wing_fallback_count(),
                    "implied lattice build complete"
                );
                Ok(CalibratedLattice {
                    grid: self.grid,
                    log_spacing: self.log_spacing,
                    spots: self.spots,
                    state_prices: self.state_prices,
                    transitions: self.transitions,
                    discounts: self.discounts,
                    samples: self.samples,
                    diagnostics: self.diagnostics,
                })
            }
            BuildState::Failed { error, .. } => Err(error),
            state => Err(Error::InvalidInput(format!(
                "implied lattice is not calibrated yet ({state})"
            ))),
        }
    }

    // ── Slice construction ────────────────────────────────────────────────

    /// Spot of node `node` in slice `slice`: `S·e^{(node − slice)·Δx}`.
    fn node_spot(&self, slice: usize, node: usize) -> Real {
        self.spot * ((node as Real - slice as Real) * self.log_spacing).exp()
    }

    /// Calibrate transitions out of slice `i` and the state prices of
    /// slice `i + 1`.
    fn grow(&mut self, i: usize) -> Result<()> {
        let (t0, t1) = (self.grid.time(i), self.grid.time(i + 1));
        let dt = t1 - t0;
        let d0 = self.interest_rate.discount(t0);
        let d1 = self.interest_rate.discount(t1);
        let df = d1 / d0;
        let growth = ((self.interest_rate.forward_rate(t0, t1)
            - self.dividend_rate.forward_rate(t0, t1))
            * dt)
            .exp();

        let children: Vec<Real> = (0..2 * i + 3).map(|k| self.node_spot(i + 1, k)).collect();
        let parents = &self.spots[i];
        let lambdas = &self.state_prices[i];
        let forwards: Vec<Real> = parents.iter().map(|s| s * growth).collect();

        let prices = self.calibration_prices(i, t1)?;

        let mut transitions = vec![[0.0; 3]; 2 * i + 1];
        let mut fallbacks = Vec::new();

        // Calls top-down through the upper half.
        for j in (i..=2 * i).rev() {
            let strike = children[j + 1];
            let covered: Real = (j + 1..=2 * i)
                .map(|jj| lambdas[jj] * (forwards[jj] - strike))
                .sum();
            let target = prices[j] / df - covered;
            let row = [0.0, 0.0, children[j + 2] - children[j + 1]];
            transitions[j] =
                self.solve_node(i, j, &children, forwards[j], lambdas[j], row, target, &mut fallbacks)?;
        }
        // Puts bottom-up through the lower half.
        for j in 0..i {
            let strike = children[j + 1];
            let covered: Real = (0..j)
                .map(|jj| lambdas[jj] * (strike - forwards[jj]))
                .sum();
            let target = prices[j] / df - covered;
            let row = [children[j + 1] - children[j], 0.0, 0.0];
            transitions[j] =
                self.solve_node(i, j, &children, forwards[j], lambdas[j], row, target, &mut fallbacks)?;
        }

        let mut next = vec![0.0; 2 * i + 3];
        for (j, p) in transitions.iter().enumerate() {
            for (branch, pb) in p.iter().enumerate() {
                next[j + branch] += df * lambdas[j] * pb;
            }
        }
        let mass: Real = next.iter().sum();
        ensure_calibrated!(
            (mass - d1).abs() <= self.config.mass_tolerance() * d1,
            Location::Slice { slice: i + 1 },
            "state-price mass {mass} differs from discount factor {d1}"
        );

        tracing::trace!(slice = i + 1, mass, fallbacks = fallbacks.len(), "slice calibrated");
        for node in fallbacks {
            self.diagnostics
                .record(NumericalWarning::WingFallback { slice: i, node });
        }
        self.spots.push(children);
        self.state_prices.push(next);
        self.transitions.push(transitions);
        self.discounts.push(df);
        Ok(())
    }

    /// Prices of the calibration options of slice `i`, one per node,
    /// computed in parallel with the constant-parameter engine.
    fn calibration_prices(&self, i: usize, expiry: Real) -> Result<Vec<Price>> {
        let spec = self.calibration_spec.with_steps(i + 1)?;
        let r = self.interest_rate.zero_rate(expiry);
        let q = self.dividend_rate.zero_rate(expiry);
        let parents = &self.spots[i];

        (0..=2 * i)
            .into_par_iter()
            .map(|j| {
                let strike = parents[j];
                let option_type = if j >= i {
                    OptionType::Call
                } else {
                    OptionType::Put
                };
                let vol = self.surface.volatility(expiry, strike)?;
                let payoff = OptionPayoff::european(option_type, strike, expiry);
                self.engine.price(&spec, &payoff, self.spot, vol, r, q)
            })
            .collect()
    }

    /// Solve the 3×3 system of node `(i, j)`, falling back to the
    /// forward-only assignment when the solution is unusable.
    #[allow(clippy::too_many_arguments)]
    fn solve_node(
        &self,
        i: usize,
        j: usize,
        children: &[Real],
        forward: Real,
        lambda: Real,
        option_row: [Real; 3],
        option_target: Real,
        fallbacks: &mut Vec<usize>,
    ) -> Result<[Probability; 3]> {
        let (s0, s1, s2) = (children[j], children[j + 1], children[j + 2]);
        let solved = (lambda > 0.0)
            .then(|| {
                solve_3x3(
                    &[[1.0, 1.0, 1.0], [s0, s1, s2], option_row],
                    &[1.0, forward, option_target / lambda],
                )
            })
            .flatten()
            .map(|[pd, _, pu]| [pd, 1.0 - pd - pu, pu])
            .filter(|p| is_valid(p));

        let location = Location::Node { slice: i, node: j };
        let p = match solved {
            Some(p) => p,
            None => {
                fallbacks.push(j);
                forward_only(s0, s1, s2, forward, location)?
            }
        };
        ensure_calibrated!(
            is_valid(&p),
            location,
            "probabilities {p:?} outside (0, 1)"
        );
        Ok(p)
    }

    // ── Local variance ────────────────────────────────────────────────────

    /// Local variance at every interior node: slice 0's root and nodes
    /// `1..=2i−1` of slices `1..N−1`.
    fn extract_local_variances(&mut self) -> Result<()> {
        let dt = self.grid.dt();
        let mut samples = Vec::new();
        for i in 0..self.grid.steps() {
            let nodes = if i == 0 { 0..1 } else { 1..2 * i };
            for j in nodes {
                let spot = self.spots[i][j];
                let p = self.transitions[i][j];
                let children = &self.spots[i + 1][j..j + 3];
                let (m1, m2) = p.iter().zip(children).fold((0.0, 0.0), |(m1, m2), (pb, s)| {
                    let x = s / spot;
                    (m1 + pb * x, m2 + pb * x * x)
                });
                let raw_variance = (m2 / (m1 * m1)).ln() / dt;
                let time = self.grid.time(i);
                let variance = if raw_variance.is_finite() && raw_variance >= LOCAL_VARIANCE_FLOOR
                {
                    raw_variance
                } else {
                    self.diagnostics.record(NumericalWarning::VarianceFloored {
                        time,
                        strike: spot,
                        raw_variance,
                    });
                    LOCAL_VARIANCE_FLOOR
                };
                samples.push(LocalVarianceSample {
                    slice: i,
                    node: j,
                    time,
                    spot,
                    variance,
                });
            }
        }
        self.samples = samples;
        Ok(())
    }
}

fn is_valid(p: &[Probability; 3]) -> bool {
    p.iter().all(|q| q.is_finite() && *q > 0.0 && *q < 1.0)
        && (p.iter().sum::<Real>() - 1.0).abs() <= 1e-12
}

/// Probabilities matching only the forward, spread over the two children
/// that bracket it.
fn forward_only(
    s0: Real,
    s1: Real,
    s2: Real,
    forward: Real,
    location: Location,
) -> Result<[Probability; 3]> {
    let (pd, pu) = if forward >= s1 && forward < s2 {
        let pu = 0.5 * ((forward - s1) / (s2 - s1) + (forward - s0) / (s2 - s0));
        (0.5 * (s2 - forward) / (s2 - s0), pu)
    } else if forward > s0 && forward < s1 {
        let pd = 0.5 * ((s1 - forward) / (s1 - s0) + (s2 - forward) / (s2 - s0));
        (pd, 0.5 * (forward - s0) / (s2 - s0))
    } else {
        calibration_failure!(
            location,
            "forward {forward} outside child span [{s0}, {s2}]"
        );
    };
    Ok([pd, 1.0 - pd - pu, pu])
}
