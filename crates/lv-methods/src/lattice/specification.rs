//! Constant-parameter trinomial lattice specification.
//!
//! A specification turns `(volatility, drift, dt)` into the multiplicative
//! factors and risk-neutral probabilities of one lattice step. Both schemes
//! use the standard trinomial log-spacing `Δx = λ·σ·√(3·dt)` widened by the
//! spacing multiplier `λ ≥ 1`, with `up = e^{Δx}`, `down = 1/up` and
//! `middle = 1`.
//!
//! Probabilities that leave the open interval `(0, 1)` mean the
//! discretisation cannot represent the step without arbitrage. They are
//! reported as a calibration failure and never clamped.

use lv_core::{
    ensure, ensure_calibrated, errors::Result, Location, Probability, Real, Time, Volatility,
};
use lv_math::linear_algebra::solve_3x3;

/// Tolerance on `p_d + p_m + p_u = 1`.
pub const PROBABILITY_SUM_TOLERANCE: Real = 1e-10;

/// Factors and probabilities of one trinomial step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatticeParameters {
    /// Spot multiplier along the up branch.
    pub up_factor: Real,
    /// Spot multiplier along the middle branch.
    pub middle_factor: Real,
    /// Spot multiplier along the down branch.
    pub down_factor: Real,
    /// Probability of the up branch.
    pub up_probability: Probability,
    /// Probability of the middle branch.
    pub middle_probability: Probability,
    /// Probability of the down branch.
    pub down_probability: Probability,
}

impl LatticeParameters {
    /// `[down, middle, up]` probabilities.
    pub fn probabilities(&self) -> [Probability; 3] {
        [
            self.down_probability,
            self.middle_probability,
            self.up_probability,
        ]
    }

    /// `[down, middle, up]` factors.
    pub fn factors(&self) -> [Real; 3] {
        [self.down_factor, self.middle_factor, self.up_factor]
    }

    /// `middle / down`, the ratio between neighbouring nodes of a slice.
    pub fn middle_over_down(&self) -> Real {
        self.middle_factor / self.down_factor
    }

    /// Check the probability and factor invariants, reporting violations at
    /// `location`.
    pub fn validate(&self, location: Location) -> Result<()> {
        for (name, p) in [
            ("down", self.down_probability),
            ("middle", self.middle_probability),
            ("up", self.up_probability),
        ] {
            ensure_calibrated!(
                p.is_finite() && p > 0.0 && p < 1.0,
                location,
                "{name} probability {p} outside (0, 1)"
            );
        }
        let sum: Real = self.probabilities().iter().sum();
        ensure_calibrated!(
            (sum - 1.0).abs() <= PROBABILITY_SUM_TOLERANCE,
            location,
            "probabilities sum to {sum}"
        );
        ensure_calibrated!(
            self.down_factor < self.middle_factor && self.middle_factor < self.up_factor,
            location,
            "factors not ordered: down {} middle {} up {}",
            self.down_factor,
            self.middle_factor,
            self.up_factor
        );
        Ok(())
    }
}

/// How the step probabilities are derived.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LatticeScheme {
    /// Match total mass and the first two moments of the lognormal step,
    /// `E[S'/S] = e^{μ·dt}` and `E[(S'/S)²] = e^{2μ·dt + σ²·dt}`, by a 3×3
    /// linear solve.
    MomentMatching {
        /// Spacing multiplier `λ ≥ 1`.
        spacing: Real,
    },
    /// Closed-form match of the mean `ν·dt` and second moment
    /// `σ²·dt + ν²·dt²` of log-spot, `ν = μ − σ²/2`.
    LogSpace {
        /// Spacing multiplier `λ ≥ 1`.
        spacing: Real,
    },
}

impl Default for LatticeScheme {
    fn default() -> Self {
        LatticeScheme::MomentMatching { spacing: 1.0 }
    }
}

impl LatticeScheme {
    /// The spacing multiplier `λ`.
    pub fn spacing(&self) -> Real {
        match *self {
            LatticeScheme::MomentMatching { spacing } | LatticeScheme::LogSpace { spacing } => {
                spacing
            }
        }
    }

    /// Log-spacing `Δx = λ·σ·√(3·dt)`.
    pub fn log_spacing(&self, volatility: Volatility, dt: Time) -> Real {
        self.spacing() * volatility * (3.0 * dt).sqrt()
    }
}

/// A constant-parameter trinomial lattice: scheme plus number of steps.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatticeSpecification {
    scheme: LatticeScheme,
    steps: usize,
}

impl LatticeSpecification {
    /// Specification with `steps > 0` and a scheme whose spacing is `≥ 1`.
    pub fn new(scheme: LatticeScheme, steps: usize) -> Result<Self> {
        ensure!(steps > 0, "step count must be positive");
        let spacing = scheme.spacing();
        ensure!(
            spacing.is_finite() && spacing >= 1.0,
            "spacing multiplier must be >= 1, got {spacing}"
        );
        Ok(Self { scheme, steps })
    }

    /// Moment-matching specification with spacing `λ`.
    pub fn moment_matching(spacing: Real, steps: usize) -> Result<Self> {
        Self::new(LatticeScheme::MomentMatching { spacing }, steps)
    }

    /// Number of time steps.
    pub fn step_count(&self) -> usize {
        self.steps
    }

    /// The probability scheme.
    pub fn scheme(&self) -> LatticeScheme {
        self.scheme
    }

    /// The same scheme with a different number of steps.
    pub fn with_steps(&self, steps: usize) -> Result<Self> {
        Self::new(self.scheme, steps)
    }

    /// Factors and probabilities for one step of length `dt` under
    /// `volatility` and `drift`.
    ///
    /// # Errors
    /// `InvalidInput` for non-positive volatility or `dt`;
    /// `CalibrationFailure` at [`Location::Lattice`] if the probabilities
    /// leave `(0, 1)`.
    pub fn parameters(
        &self,
        volatility: Volatility,
        drift: Real,
        dt: Time,
    ) -> Result<LatticeParameters> {
        ensure!(
            volatility.is_finite() && volatility > 0.0,
            "volatility must be positive, got {volatility}"
        );
        ensure!(dt.is_finite() && dt > 0.0, "dt must be positive, got {dt}");
        ensure!(drift.is_finite(), "drift must be finite, got {drift}");

        let location = Location::Lattice {
            volatility,
            drift,
            dt,
        };
        let dx = self.scheme.log_spacing(volatility, dt);
        let up = dx.exp();
        let down = 1.0 / up;

        let [pd, pm, pu] = match self.scheme {
            LatticeScheme::MomentMatching { .. } => {
                let growth = (drift * dt).exp();
                let second = growth * growth * (volatility * volatility * dt).exp();
                let a = [[1.0, 1.0, 1.0], [down, 1.0, up], [down * down, 1.0, up * up]];
                match solve_3x3(&a, &[1.0, growth, second]) {
                    Some(p) => p,
                    None => lv_core::calibration_failure!(location, "singular moment system"),
                }
            }
            LatticeScheme::LogSpace { .. } => {
                let nu = drift - 0.5 * volatility * volatility;
                let mean = nu * dt;
                let factor = (volatility * volatility * dt + mean * mean) / (dx * dx);
                [
                    0.5 * (factor - mean / dx),
                    1.0 - factor,
                    0.5 * (factor + mean / dx),
                ]
            }
        };

        let parameters = LatticeParameters {
            up_factor: up,
            middle_factor: 1.0,
            down_factor: down,
            up_probability: pu,
            middle_probability: pm,
            down_probability: pd,
        };
        parameters.validate(location)?;
        Ok(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn moment_matching_reproduces_moments() {
        let spec = LatticeSpecification::moment_matching(1.0, 10).unwrap();
        let (vol, drift, dt) = (0.2, 0.03, 0.1);
        let p = spec.parameters(vol, drift, dt).unwrap();
        let [fd, fm, fu] = p.factors();
        let [pd, pm, pu] = p.probabilities();
        assert_abs_diff_eq!(pd + pm + pu, 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(pd * fd + pm * fm + pu * fu, (drift * dt).exp(), epsilon = 1e-14);
        assert_abs_diff_eq!(
            pd * fd * fd + pm * fm * fm + pu * fu * fu,
            (2.0 * drift * dt + vol * vol * dt).exp(),
            epsilon = 1e-13
        );
    }

    #[test]
    fn zero_drift_is_close_to_one_sixth() {
        let spec = LatticeSpecification::moment_matching(1.0, 10).unwrap();
        let p = spec.parameters(0.15, 0.0, 0.01).unwrap();
        assert_abs_diff_eq!(p.middle_probability, 2.0 / 3.0, epsilon = 1e-3);
        assert_abs_diff_eq!(p.up_probability, 1.0 / 6.0, epsilon = 1e-3);
    }

    #[test]
    fn log_space_matches_log_moments() {
        let spec = LatticeSpecification::new(LatticeScheme::LogSpace { spacing: 1.2 }, 5).unwrap();
        let (vol, drift, dt) = (0.25, 0.05, 0.2);
        let p = spec.parameters(vol, drift, dt).unwrap();
        let dx = p.up_factor.ln();
        let nu = drift - 0.5 * vol * vol;
        let mean = (p.up_probability - p.down_probability) * dx;
        let second = (p.up_probability + p.down_probability) * dx * dx;
        assert_abs_diff_eq!(mean, nu * dt, epsilon = 1e-14);
        assert_abs_diff_eq!(second, vol * vol * dt + nu * nu * dt * dt, epsilon = 1e-14);
    }

    #[test]
    fn spacing_widens_the_step() {
        let narrow = LatticeSpecification::moment_matching(1.0, 1).unwrap();
        let wide = LatticeSpecification::moment_matching(1.5, 1).unwrap();
        let a = narrow.parameters(0.2, 0.0, 0.1).unwrap();
        let b = wide.parameters(0.2, 0.0, 0.1).unwrap();
        assert!(b.up_factor > a.up_factor);
        assert!(b.middle_probability > a.middle_probability);
    }

    #[test]
    fn drift_dominated_step_fails_without_clamping() {
        let spec = LatticeSpecification::new(LatticeScheme::LogSpace { spacing: 1.0 }, 1).unwrap();
        let err = spec.parameters(0.01, 0.5, 1.0).unwrap_err();
        assert!(err.is_calibration_failure());
        assert_eq!(
            err.location(),
            Some(Location::Lattice {
                volatility: 0.01,
                drift: 0.5,
                dt: 1.0
            })
        );

        let mm = LatticeSpecification::moment_matching(1.0, 1).unwrap();
        assert!(mm.parameters(0.01, 0.5, 1.0).unwrap_err().is_calibration_failure());
    }

    #[test]
    fn invalid_inputs() {
        assert!(LatticeSpecification::moment_matching(0.9, 10).is_err());
        assert!(LatticeSpecification::moment_matching(1.0, 0).is_err());
        let spec = LatticeSpecification::moment_matching(1.0, 10).unwrap();
        assert!(spec.parameters(0.0, 0.0, 0.1).unwrap_err().is_invalid_input());
        assert!(spec.parameters(0.2, 0.0, 0.0).unwrap_err().is_invalid_input());
    }
}
