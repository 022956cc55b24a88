//! `ConstantVolatilitySurface` — the same volatility at every point.

use lv_core::{ensure, errors::Result, Real, Time, Volatility};

use crate::volatility_surface::{check_domain, SurfaceDerivatives, VolatilitySurface};

/// A flat volatility surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantVolatilitySurface {
    volatility: Volatility,
}

impl ConstantVolatilitySurface {
    /// Flat surface at `volatility` (must be positive).
    pub fn new(volatility: Volatility) -> Result<Self> {
        ensure!(
            volatility.is_finite() && volatility > 0.0,
            "volatility must be positive, got {volatility}"
        );
        Ok(Self { volatility })
    }
}

impl VolatilitySurface for ConstantVolatilitySurface {
    fn volatility(&self, t: Time, strike: Real) -> Result<Volatility> {
        check_domain(t, strike)?;
        Ok(self.volatility)
    }

    fn derivatives(&self, t: Time, strike: Real) -> Option<Result<SurfaceDerivatives>> {
        Some(check_domain(t, strike).map(|()| SurfaceDerivatives {
            value: self.volatility,
            d_time: 0.0,
            d_strike: 0.0,
            d2_strike: 0.0,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_everywhere() {
        let s = ConstantVolatilitySurface::new(0.15).unwrap();
        assert_eq!(s.volatility(0.0, 50.0).unwrap(), 0.15);
        assert_eq!(s.volatility(7.0, 500.0).unwrap(), 0.15);
        let d = s.derivatives(1.0, 100.0).unwrap().unwrap();
        assert_eq!(d.d_strike, 0.0);
    }

    #[test]
    fn rejects_non_positive_volatility() {
        assert!(ConstantVolatilitySurface::new(0.0).is_err());
        assert!(ConstantVolatilitySurface::new(-0.2).is_err());
    }
}
