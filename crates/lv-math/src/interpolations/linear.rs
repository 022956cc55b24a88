//! Piecewise-linear interpolation.

use lv_core::{errors::Result, Real};

use super::{check_nodes, locate, Interpolation1D};

/// Linear interpolation.
///
/// `f(x) = y[i] + (y[i+1] - y[i]) * (x - x[i]) / (x[i+1] - x[i])`
///
/// Queries outside the node range continue the end segments; wrap in
/// [`Extrapolated`](super::Extrapolated) for another policy.
#[derive(Debug, Clone)]
pub struct LinearInterpolation {
    xs: Vec<Real>,
    ys: Vec<Real>,
}

impl LinearInterpolation {
    /// Construct a linear interpolation from strictly increasing `xs` and
    /// corresponding `ys`.
    ///
    /// # Errors
    /// `InvalidInput` for fewer than 2 points, mismatched lengths, unsorted
    /// or non-finite nodes.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        check_nodes(xs, ys)?;
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
        })
    }

    fn segment(&self, x: Real) -> (usize, Real, Real) {
        let i = locate(&self.xs, x);
        let h = self.xs[i + 1] - self.xs[i];
        (i, h, (x - self.xs[i]) / h)
    }
}

impl Interpolation1D for LinearInterpolation {
    fn value(&self, x: Real) -> Real {
        let (i, _, b) = self.segment(x);
        (1.0 - b) * self.ys[i] + b * self.ys[i + 1]
    }

    fn derivative(&self, x: Real) -> Real {
        let (i, h, _) = self.segment(x);
        (self.ys[i + 1] - self.ys[i]) / h
    }

    fn second_derivative(&self, _x: Real) -> Real {
        0.0
    }

    fn node_sensitivity(&self, x: Real) -> Vec<Real> {
        let (i, _, b) = self.segment(x);
        let mut w = vec![0.0; self.xs.len()];
        w[i] = 1.0 - b;
        w[i + 1] = b;
        w
    }

    fn derivative_sensitivity(&self, x: Real) -> Vec<Real> {
        let (i, h, _) = self.segment(x);
        let mut w = vec![0.0; self.xs.len()];
        w[i] = -1.0 / h;
        w[i + 1] = 1.0 / h;
        w
    }

    fn second_derivative_sensitivity(&self, _x: Real) -> Vec<Real> {
        vec![0.0; self.xs.len()]
    }

    fn size(&self) -> usize {
        self.xs.len()
    }

    fn x_min(&self) -> Real {
        self.xs[0]
    }

    fn x_max(&self) -> Real {
        self.xs[self.xs.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn passes_through_nodes() {
        let f = LinearInterpolation::new(&[0.0, 1.0, 3.0], &[2.0, 4.0, 0.0]).unwrap();
        assert_abs_diff_eq!(f.value(0.0), 2.0);
        assert_abs_diff_eq!(f.value(1.0), 4.0);
        assert_abs_diff_eq!(f.value(3.0), 0.0);
        assert_abs_diff_eq!(f.value(2.0), 2.0, epsilon = 1e-15);
    }

    #[test]
    fn slope_is_piecewise_constant() {
        let f = LinearInterpolation::new(&[0.0, 1.0, 3.0], &[2.0, 4.0, 0.0]).unwrap();
        assert_abs_diff_eq!(f.derivative(0.5), 2.0);
        assert_abs_diff_eq!(f.derivative(2.5), -2.0);
        assert_eq!(f.second_derivative(0.5), 0.0);
    }

    #[test]
    fn weights_are_local() {
        let f = LinearInterpolation::new(&[0.0, 1.0, 2.0, 3.0], &[0.0; 4]).unwrap();
        assert_eq!(f.node_sensitivity(1.25), vec![0.0, 0.75, 0.25, 0.0]);
        assert_eq!(f.derivative_sensitivity(1.25), vec![0.0, -1.0, 1.0, 0.0]);
    }

    #[test]
    fn needs_two_points() {
        assert!(LinearInterpolation::new(&[1.0], &[1.0]).is_err());
        assert!(LinearInterpolation::new(&[1.0, 2.0], &[1.0]).is_err());
    }

    proptest::proptest! {
        #[test]
        fn value_stays_within_bracketing_nodes(x in 0.0f64..3.0) {
            let ys = [2.0, 4.0, 0.0, 1.0];
            let f = LinearInterpolation::new(&[0.0, 1.0, 2.0, 3.0], &ys).unwrap();
            let i = (x.floor() as usize).min(2);
            let (lo, hi) = (ys[i].min(ys[i + 1]), ys[i].max(ys[i + 1]));
            let v = f.value(x);
            proptest::prop_assert!(v >= lo - 1e-12 && v <= hi + 1e-12);
        }
    }
}
