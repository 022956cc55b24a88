//! Calculator configuration.
//!
//! Plain value types with documented defaults. The `with_*` methods validate
//! their argument and return `InvalidInput` on bad values; calculators
//! re-validate on construction, so deserialised configurations are checked
//! too.

use lv_core::{ensure, errors::Result, Real, Size, Time};

// ── Dupire ────────────────────────────────────────────────────────────────────

/// How the Dupire calculator obtains `∂σ/∂T`, `∂σ/∂K` and `∂²σ/∂K²`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DerivativeMethod {
    /// Use the surface's closed-form sensitivities when it provides them,
    /// otherwise central finite differences.
    #[default]
    PreferAnalytic,
    /// Always use central finite differences.
    FiniteDifference,
}

/// Configuration of [`DupireLocalVolatilityCalculator`](crate::DupireLocalVolatilityCalculator).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DupireConfig {
    derivative_method: DerivativeMethod,
    time_bump: Real,
    strike_bump: Real,
    denominator_tolerance: Real,
}

impl Default for DupireConfig {
    fn default() -> Self {
        Self {
            derivative_method: DerivativeMethod::PreferAnalytic,
            time_bump: 1e-4,
            strike_bump: 1e-4,
            denominator_tolerance: 1e-10,
        }
    }
}

impl DupireConfig {
    /// Derivative source.
    pub fn derivative_method(&self) -> DerivativeMethod {
        self.derivative_method
    }

    /// Relative time bump: central differences use `h = time_bump·T`.
    pub fn time_bump(&self) -> Real {
        self.time_bump
    }

    /// Relative strike bump: central differences use `h = strike_bump·K`.
    pub fn strike_bump(&self) -> Real {
        self.strike_bump
    }

    /// Denominators at or below this value are calibration failures.
    pub fn denominator_tolerance(&self) -> Real {
        self.denominator_tolerance
    }

    /// Set the derivative source.
    pub fn with_derivative_method(mut self, method: DerivativeMethod) -> Self {
        self.derivative_method = method;
        self
    }

    /// Set both relative bumps; each must lie in `(0, 0.5)`.
    pub fn with_bumps(mut self, time_bump: Real, strike_bump: Real) -> Result<Self> {
        self.time_bump = time_bump;
        self.strike_bump = strike_bump;
        self.validate()?;
        Ok(self)
    }

    /// Set the denominator tolerance (non-negative).
    pub fn with_denominator_tolerance(mut self, tolerance: Real) -> Result<Self> {
        self.denominator_tolerance = tolerance;
        self.validate()?;
        Ok(self)
    }

    /// Check every field.
    pub fn validate(&self) -> Result<()> {
        for (name, bump) in [("time", self.time_bump), ("strike", self.strike_bump)] {
            ensure!(
                bump.is_finite() && bump > 0.0 && bump < 0.5,
                "{name} bump must lie in (0, 0.5), got {bump}"
            );
        }
        ensure!(
            self.denominator_tolerance.is_finite() && self.denominator_tolerance >= 0.0,
            "denominator tolerance must be non-negative, got {}",
            self.denominator_tolerance
        );
        Ok(())
    }
}

// ── Implied tree ──────────────────────────────────────────────────────────────

/// Configuration of
/// [`ImpliedTrinomialTreeLocalVolatilityCalculator`](crate::ImpliedTrinomialTreeLocalVolatilityCalculator).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImpliedTreeConfig {
    step_count: Size,
    spacing: Real,
    max_time: Time,
    mass_tolerance: Real,
}

impl Default for ImpliedTreeConfig {
    fn default() -> Self {
        Self {
            step_count: 20,
            spacing: 1.0,
            max_time: 3.0,
            mass_tolerance: 1e-10,
        }
    }
}

impl ImpliedTreeConfig {
    /// Number of time slices.
    pub fn step_count(&self) -> Size {
        self.step_count
    }

    /// Spacing multiplier `λ`.
    pub fn spacing(&self) -> Real {
        self.spacing
    }

    /// Lattice horizon in years.
    pub fn max_time(&self) -> Time {
        self.max_time
    }

    /// Relative tolerance of the per-slice state-price mass check.
    pub fn mass_tolerance(&self) -> Real {
        self.mass_tolerance
    }

    /// Set the number of time slices (`> 0`).
    pub fn with_step_count(mut self, step_count: Size) -> Result<Self> {
        self.step_count = step_count;
        self.validate()?;
        Ok(self)
    }

    /// Set the spacing multiplier (`≥ 1`).
    pub fn with_spacing(mut self, spacing: Real) -> Result<Self> {
        self.spacing = spacing;
        self.validate()?;
        Ok(self)
    }

    /// Set the lattice horizon (`> 0`).
    pub fn with_max_time(mut self, max_time: Time) -> Result<Self> {
        self.max_time = max_time;
        self.validate()?;
        Ok(self)
    }

    /// Set the mass tolerance (`> 0`).
    pub fn with_mass_tolerance(mut self, tolerance: Real) -> Result<Self> {
        self.mass_tolerance = tolerance;
        self.validate()?;
        Ok(self)
    }

    /// Check every field.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.step_count > 0, "step count must be positive");
        ensure!(
            self.spacing.is_finite() && self.spacing >= 1.0,
            "spacing multiplier must be >= 1, got {}",
            self.spacing
        );
        ensure!(
            self.max_time.is_finite() && self.max_time > 0.0,
            "max time must be positive, got {}",
            self.max_time
        );
        ensure!(
            self.mass_tolerance.is_finite() && self.mass_tolerance > 0.0,
            "mass tolerance must be positive, got {}",
            self.mass_tolerance
        );
        Ok(())
    }
}
