//! Implied trinomial tree local volatility.
//!
//! A recombining trinomial lattice with fixed log-spacing is grown forward
//! from the spot. The transition probabilities out of each slice are chosen
//! so that the lattice reprices one European option per node (struck at that
//! node, expiring at the next slice) and the one-step forward of every node.
//! The local variance of a node is then read off the log-variance of its
//! calibrated one-step distribution.

mod builder;
mod lattice;

pub use builder::{BuildState, ImpliedLatticeBuilder};
pub use lattice::{CalibratedLattice, LocalVarianceSample};

use lv_core::{errors::Result, Real};
use lv_termstructures::{LocalVolatilitySurface, RateCurve, VolatilitySurface};

use crate::config::ImpliedTreeConfig;

/// Calibrates implied trinomial lattices and extracts local volatility.
///
/// # Example
/// ```
/// use lv_calibration::{ImpliedTreeConfig, ImpliedTrinomialTreeLocalVolatilityCalculator};
/// use lv_termstructures::{ConstantVolatilitySurface, FlatRateCurve, VolatilitySurface};
///
/// let config = ImpliedTreeConfig::default()
///     .with_step_count(8)
///     .and_then(|c| c.with_max_time(1.0))
///     .unwrap();
/// let calculator = ImpliedTrinomialTreeLocalVolatilityCalculator::new(config).unwrap();
/// let surface = ConstantVolatilitySurface::new(0.2).unwrap();
/// let r = FlatRateCurve::new(0.03).unwrap();
/// let q = FlatRateCurve::new(0.0).unwrap();
/// let local = calculator.local_volatility(&surface, 100.0, &r, &q).unwrap();
/// assert!((local.volatility(0.5, 100.0).unwrap() - 0.2).abs() < 1e-4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ImpliedTrinomialTreeLocalVolatilityCalculator {
    config: ImpliedTreeConfig,
}

impl ImpliedTrinomialTreeLocalVolatilityCalculator {
    /// Calculator with a validated configuration.
    pub fn new(config: ImpliedTreeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration.
    pub fn config(&self) -> &ImpliedTreeConfig {
        &self.config
    }

    /// A builder for stepping through the calibration slice by slice.
    pub fn builder<'a>(
        &self,
        surface: &'a dyn VolatilitySurface,
        spot: Real,
        interest_rate: &'a dyn RateCurve,
        dividend_rate: &'a dyn RateCurve,
    ) -> Result<ImpliedLatticeBuilder<'a>> {
        ImpliedLatticeBuilder::new(self.config, surface, spot, interest_rate, dividend_rate)
    }

    /// Calibrate the full lattice.
    ///
    /// # Errors
    /// `InvalidInput` for a non-positive spot or a surface that cannot be
    /// queried; `CalibrationFailure` at the node or slice where the
    /// calibration broke down.
    pub fn calibrate_lattice(
        &self,
        surface: &dyn VolatilitySurface,
        spot: Real,
        interest_rate: &dyn RateCurve,
        dividend_rate: &dyn RateCurve,
    ) -> Result<CalibratedLattice> {
        self.builder(surface, spot, interest_rate, dividend_rate)?
            .run()
    }

    /// Calibrate the lattice and fit a local-volatility surface to its
    /// node samples.
    pub fn local_volatility(
        &self,
        surface: &dyn VolatilitySurface,
        spot: Real,
        interest_rate: &dyn RateCurve,
        dividend_rate: &dyn RateCurve,
    ) -> Result<LocalVolatilitySurface> {
        self.calibrate_lattice(surface, spot, interest_rate, dividend_rate)?
            .local_volatility_surface()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use lv_core::{Location, OptionType};
    use lv_methods::{LatticeSpecification, OptionPayoff, TrinomialTreeEngine};
    use lv_termstructures::{ConstantVolatilitySurface, FlatRateCurve};

    fn calculator(steps: usize, max_time: Real) -> ImpliedTrinomialTreeLocalVolatilityCalculator {
        let config = ImpliedTreeConfig::default()
            .with_step_count(steps)
            .and_then(|c| c.with_max_time(max_time))
            .unwrap();
        ImpliedTrinomialTreeLocalVolatilityCalculator::new(config).unwrap()
    }

    #[test]
    fn flat_surface_reproduces_the_constant_tree() {
        let surface = ConstantVolatilitySurface::new(0.2).unwrap();
        let (r, q) = (FlatRateCurve::new(0.04).unwrap(), FlatRateCurve::new(0.01).unwrap());
        let lattice = calculator(6, 1.5)
            .calibrate_lattice(&surface, 100.0, &r, &q)
            .unwrap();

        let spec = LatticeSpecification::moment_matching(1.0, 6).unwrap();
        let payoff = OptionPayoff::european(OptionType::Call, 100.0, 1.5);
        let constant = TrinomialTreeEngine::new()
            .build_lattice(&spec, &payoff, 100.0, 0.2, 0.04, 0.01)
            .unwrap();
        let expected = constant.parameters().probabilities();
        for i in 0..6 {
            for p in lattice.transitions(i) {
                for b in 0..3 {
                    assert_abs_diff_eq!(p[b], expected[b], epsilon = 1e-8);
                }
            }
        }
        assert!(lattice.diagnostics().is_empty());
    }

    #[test]
    fn sample_layout() {
        let surface = ConstantVolatilitySurface::new(0.3).unwrap();
        let flat = FlatRateCurve::new(0.0).unwrap();
        let lattice = calculator(5, 1.0)
            .calibrate_lattice(&surface, 50.0, &flat, &flat)
            .unwrap();
        let samples = lattice.local_variance_samples();
        assert_eq!(samples.len(), 4 * 4 + 1);
        assert_eq!((samples[0].slice, samples[0].node), (0, 0));
        assert_eq!((samples[1].slice, samples[1].node), (1, 1));
        assert!(samples.iter().all(|s| s.slice < 5));
        assert_eq!(lattice.spots(5).len(), 11);
        assert_eq!(lattice.state_prices(3).len(), 7);
    }

    #[test]
    fn single_step_lattice_has_one_sample() {
        let surface = ConstantVolatilitySurface::new(0.25).unwrap();
        let flat = FlatRateCurve::new(0.02).unwrap();
        let calc = calculator(1, 0.5);
        let local = calc.local_volatility(&surface, 100.0, &flat, &flat).unwrap();
        assert_abs_diff_eq!(local.volatility(0.25, 80.0).unwrap(), 0.25, epsilon = 1e-8);
    }

    #[test]
    fn builder_state_machine() {
        let surface = ConstantVolatilitySurface::new(0.2).unwrap();
        let flat = FlatRateCurve::new(0.0).unwrap();
        let calc = calculator(2, 1.0);
        let mut builder = calc.builder(&surface, 100.0, &flat, &flat).unwrap();
        assert_eq!(builder.state(), &BuildState::Empty);
        assert_eq!(builder.step().unwrap(), &BuildState::Growing { slice: 0 });
        assert_eq!(builder.step().unwrap(), &BuildState::Growing { slice: 1 });
        assert_eq!(builder.step().unwrap(), &BuildState::Growing { slice: 2 });
        assert_eq!(builder.step().unwrap(), &BuildState::Calibrated);
        assert_eq!(builder.step().unwrap(), &BuildState::Calibrated);
        assert!(builder.into_lattice().is_ok());
    }

    #[test]
    fn unfinished_builder_has_no_lattice() {
        let surface = ConstantVolatilitySurface::new(0.2).unwrap();
        let flat = FlatRateCurve::new(0.0).unwrap();
        let calc = calculator(3, 1.0);
        let mut builder = calc.builder(&surface, 100.0, &flat, &flat).unwrap();
        builder.step().unwrap();
        assert!(builder.into_lattice().unwrap_err().is_invalid_input());
    }

    #[test]
    fn unreachable_forward_fails_at_a_node() {
        // A 300% rate pushes every one-step forward beyond the upper child.
        let surface = ConstantVolatilitySurface::new(0.05).unwrap();
        let r = FlatRateCurve::new(3.0).unwrap();
        let q = FlatRateCurve::new(0.0).unwrap();
        let calc = calculator(4, 1.0);
        let mut builder = calc.builder(&surface, 100.0, &r, &q).unwrap();
        builder.step().unwrap();
        let err = builder.step().unwrap_err();
        assert!(err.is_calibration_failure());
        assert!(matches!(
            builder.state(),
            BuildState::Failed { slice: 0, .. }
        ));
        assert_eq!(builder.step().unwrap_err(), err);
        assert!(matches!(
            err.location(),
            Some(Location::Node { .. } | Location::Lattice { .. })
        ));
    }

    #[test]
    fn invalid_inputs() {
        let surface = ConstantVolatilitySurface::new(0.2).unwrap();
        let flat = FlatRateCurve::new(0.0).unwrap();
        let calc = calculator(3, 1.0);
        assert!(calc
            .calibrate_lattice(&surface, 0.0, &flat, &flat)
            .unwrap_err()
            .is_invalid_input());
        assert!(calc
            .calibrate_lattice(&surface, f64::NAN, &flat, &flat)
            .unwrap_err()
            .is_invalid_input());
    }
}
