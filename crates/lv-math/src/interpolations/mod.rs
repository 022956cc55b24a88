//! 1D interpolation trait, extrapolation policies and implementations.
//!
//! Every interpolation here is *linear in its node values*: the value and
//! both derivatives at `x` are weighted sums of the `y` nodes. The
//! `*_sensitivity` methods return those weights, which is what the surface
//! layer uses to obtain analytic partial derivatives without bumping.

mod cubic;
mod linear;

pub use cubic::NaturalCubicSpline;
pub use linear::LinearInterpolation;

use lv_core::{errors::Result, Real};

/// A 1D interpolation function `f: R → R` defined by a set of known points.
pub trait Interpolation1D: std::fmt::Debug + Send + Sync {
    /// Evaluate the interpolation at `x`.
    fn value(&self, x: Real) -> Real;

    /// First derivative `f'(x)`.
    fn derivative(&self, x: Real) -> Real;

    /// Second derivative `f''(x)`.
    fn second_derivative(&self, x: Real) -> Real;

    /// Weights `w` with `f(x) = Σ w_i y_i`.
    fn node_sensitivity(&self, x: Real) -> Vec<Real>;

    /// Weights `w` with `f'(x) = Σ w_i y_i`.
    fn derivative_sensitivity(&self, x: Real) -> Vec<Real>;

    /// Weights `w` with `f''(x) = Σ w_i y_i`.
    fn second_derivative_sensitivity(&self, x: Real) -> Vec<Real>;

    /// Number of nodes.
    fn size(&self) -> usize;

    /// Return the lower bound of the interpolation domain.
    fn x_min(&self) -> Real;

    /// Return the upper bound of the interpolation domain.
    fn x_max(&self) -> Real;

    /// Return `true` if `x` is within the interpolation range.
    fn is_in_range(&self, x: Real) -> bool {
        x >= self.x_min() && x <= self.x_max()
    }
}

// ── Extrapolation ─────────────────────────────────────────────────────────────

/// Behaviour beyond one end of the node range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extrapolation {
    /// Hold the boundary value constant.
    #[default]
    Flat,
    /// Continue along the boundary tangent.
    Linear,
}

/// Wraps an interpolation with an extrapolation policy at each end.
///
/// Inside `[x_min, x_max]` the inner interpolation is used unchanged.
#[derive(Debug)]
pub struct Extrapolated {
    inner: Box<dyn Interpolation1D>,
    left: Extrapolation,
    right: Extrapolation,
}

/// Which end of the domain a point falls beyond.
enum Side {
    Inside,
    Left(Real, Extrapolation),
    Right(Real, Extrapolation),
}

impl Extrapolated {
    /// Wrap `inner` with the given left / right policies.
    pub fn new(inner: Box<dyn Interpolation1D>, left: Extrapolation, right: Extrapolation) -> Self {
        Self { inner, left, right }
    }

    fn side(&self, x: Real) -> Side {
        if x < self.inner.x_min() {
            Side::Left(self.inner.x_min(), self.left)
        } else if x > self.inner.x_max() {
            Side::Right(self.inner.x_max(), self.right)
        } else {
            Side::Inside
        }
    }
}

impl Interpolation1D for Extrapolated {
    fn value(&self, x: Real) -> Real {
        match self.side(x) {
            Side::Inside => self.inner.value(x),
            Side::Left(edge, Extrapolation::Flat) | Side::Right(edge, Extrapolation::Flat) => {
                self.inner.value(edge)
            }
            Side::Left(edge, Extrapolation::Linear) | Side::Right(edge, Extrapolation::Linear) => {
                self.inner.value(edge) + (x - edge) * self.inner.derivative(edge)
            }
        }
    }

    fn derivative(&self, x: Real) -> Real {
        match self.side(x) {
            Side::Inside => self.inner.derivative(x),
            Side::Left(_, Extrapolation::Flat) | Side::Right(_, Extrapolation::Flat) => 0.0,
            Side::Left(edge, Extrapolation::Linear) | Side::Right(edge, Extrapolation::Linear) => {
                self.inner.derivative(edge)
            }
        }
    }

    fn second_derivative(&self, x: Real) -> Real {
        match self.side(x) {
            Side::Inside => self.inner.second_derivative(x),
            _ => 0.0,
        }
    }

    fn node_sensitivity(&self, x: Real) -> Vec<Real> {
        match self.side(x) {
            Side::Inside => self.inner.node_sensitivity(x),
            Side::Left(edge, Extrapolation::Flat) | Side::Right(edge, Extrapolation::Flat) => {
                self.inner.node_sensitivity(edge)
            }
            Side::Left(edge, Extrapolation::Linear) | Side::Right(edge, Extrapolation::Linear) => {
                let slope = self.inner.derivative_sensitivity(edge);
                self.inner
                    .node_sensitivity(edge)
                    .into_iter()
                    .zip(slope)
                    .map(|(w, s)| w + (x - edge) * s)
                    .collect()
            }
        }
    }

    fn derivative_sensitivity(&self, x: Real) -> Vec<Real> {
        match self.side(x) {
            Side::Inside => self.inner.derivative_sensitivity(x),
            Side::Left(_, Extrapolation::Flat) | Side::Right(_, Extrapolation::Flat) => {
                vec![0.0; self.size()]
            }
            Side::Left(edge, Extrapolation::Linear) | Side::Right(edge, Extrapolation::Linear) => {
                self.inner.derivative_sensitivity(edge)
            }
        }
    }

    fn second_derivative_sensitivity(&self, x: Real) -> Vec<Real> {
        match self.side(x) {
            Side::Inside => self.inner.second_derivative_sensitivity(x),
            _ => vec![0.0; self.size()],
        }
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn x_min(&self) -> Real {
        self.inner.x_min()
    }

    fn x_max(&self) -> Real {
        self.inner.x_max()
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Selects an interpolation scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolatorKind {
    /// Piecewise linear.
    #[default]
    Linear,
    /// Natural cubic spline (zero second derivative at both ends).
    NaturalCubic,
}

impl InterpolatorKind {
    /// Build the interpolation over `(xs, ys)` wrapped with the given
    /// extrapolation policies.
    pub fn build(
        self,
        xs: &[Real],
        ys: &[Real],
        left: Extrapolation,
        right: Extrapolation,
    ) -> Result<Extrapolated> {
        let inner: Box<dyn Interpolation1D> = match self {
            InterpolatorKind::Linear => Box::new(LinearInterpolation::new(xs, ys)?),
            InterpolatorKind::NaturalCubic => Box::new(NaturalCubicSpline::new(xs, ys)?),
        };
        Ok(Extrapolated::new(inner, left, right))
    }
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Validate node abscissae and ordinates shared by all schemes.
pub(crate) fn check_nodes(xs: &[Real], ys: &[Real]) -> Result<()> {
    lv_core::ensure!(xs.len() >= 2, "need at least 2 points for interpolation");
    lv_core::ensure!(
        xs.len() == ys.len(),
        "xs ({}) and ys ({}) must have the same length",
        xs.len(),
        ys.len()
    );
    lv_core::ensure!(
        xs.iter().chain(ys).all(|v| v.is_finite()),
        "interpolation nodes must be finite"
    );
    lv_core::ensure!(
        xs.windows(2).all(|w| w[1] > w[0]),
        "xs must be strictly increasing"
    );
    Ok(())
}

/// Binary search: find `i` such that `xs[i] <= x < xs[i+1]`, clamped to
/// `[0, n-2]`.
pub(crate) fn locate(xs: &[Real], x: Real) -> usize {
    let n = xs.len();
    if x <= xs[0] {
        return 0;
    }
    if x >= xs[n - 1] {
        return n - 2;
    }
    let mut lo = 0;
    let mut hi = n - 1;
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if xs[mid] <= x {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}
