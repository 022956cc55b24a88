//! Natural cubic spline.
//!
//! The second derivatives `M` at the nodes solve the usual tridiagonal
//! continuity system with `M_0 = M_{n-1} = 0`. Because that system is linear
//! in `y`, the spline keeps the basis matrix `C = A⁻¹B` with `M = C·y`, from
//! which node sensitivities of the value and both derivatives follow
//! directly.

use nalgebra::DMatrix;

use lv_core::{errors::Result, Real};

use super::{check_nodes, locate, Interpolation1D};
use crate::linear_algebra::solve_dense;

/// Natural cubic spline interpolation.
#[derive(Debug, Clone)]
pub struct NaturalCubicSpline {
    xs: Vec<Real>,
    ys: Vec<Real>,
    /// `n × n` map from node values to node second derivatives.
    basis: DMatrix<Real>,
    /// Node second derivatives.
    m: Vec<Real>,
}

/// Local coordinates of `x` on its segment.
struct Segment {
    i: usize,
    h: Real,
    a: Real,
    b: Real,
}

impl NaturalCubicSpline {
    /// Construct a natural cubic spline through `(xs, ys)`.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        check_nodes(xs, ys)?;
        let n = xs.len();
        let h: Vec<Real> = xs.windows(2).map(|w| w[1] - w[0]).collect();

        let mut a = DMatrix::<Real>::zeros(n, n);
        let mut b = DMatrix::<Real>::zeros(n, n);
        a[(0, 0)] = 1.0;
        a[(n - 1, n - 1)] = 1.0;
        for i in 1..n - 1 {
            a[(i, i - 1)] = h[i - 1] / 6.0;
            a[(i, i)] = (h[i - 1] + h[i]) / 3.0;
            a[(i, i + 1)] = h[i] / 6.0;
            b[(i, i - 1)] = 1.0 / h[i - 1];
            b[(i, i)] = -1.0 / h[i - 1] - 1.0 / h[i];
            b[(i, i + 1)] = 1.0 / h[i];
        }
        let basis = solve_dense(&a, &b)?;
        let m = (0..n)
            .map(|k| (0..n).map(|j| basis[(k, j)] * ys[j]).sum())
            .collect();

        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            basis,
            m,
        })
    }

    /// Second derivatives at the nodes.
    pub fn node_second_derivatives(&self) -> &[Real] {
        &self.m
    }

    fn segment(&self, x: Real) -> Segment {
        let i = locate(&self.xs, x);
        let h = self.xs[i + 1] - self.xs[i];
        let b = (x - self.xs[i]) / h;
        Segment { i, h, a: 1.0 - b, b }
    }

    /// Weights `w` with `f = Σ w_j y_j`, given the direct coefficients on
    /// `y_i, y_{i+1}` and the coefficients on `M_i, M_{i+1}`.
    fn weights(&self, i: usize, direct: [Real; 2], curvature: [Real; 2]) -> Vec<Real> {
        let n = self.xs.len();
        let mut w: Vec<Real> = (0..n)
            .map(|j| curvature[0] * self.basis[(i, j)] + curvature[1] * self.basis[(i + 1, j)])
            .collect();
        w[i] += direct[0];
        w[i + 1] += direct[1];
        w
    }
}

impl Interpolation1D for NaturalCubicSpline {
    fn value(&self, x: Real) -> Real {
        let Segment { i, h, a, b } = self.segment(x);
        a * self.ys[i]
            + b * self.ys[i + 1]
            + ((a * a * a - a) * self.m[i] + (b * b * b - b) * self.m[i + 1]) * h * h / 6.0
    }

    fn derivative(&self, x: Real) -> Real {
        let Segment { i, h, a, b } = self.segment(x);
        (self.ys[i + 1] - self.ys[i]) / h - (3.0 * a * a - 1.0) * h * self.m[i] / 6.0
            + (3.0 * b * b - 1.0) * h * self.m[i + 1] / 6.0
    }

    fn second_derivative(&self, x: Real) -> Real {
        let Segment { i, a, b, .. } = self.segment(x);
        a * self.m[i] + b * self.m[i + 1]
    }

    fn node_sensitivity(&self, x: Real) -> Vec<Real> {
        let Segment { i, h, a, b } = self.segment(x);
        let k = h * h / 6.0;
        self.weights(i, [a, b], [(a * a * a - a) * k, (b * b * b - b) * k])
    }

    fn derivative_sensitivity(&self, x: Real) -> Vec<Real> {
        let Segment { i, h, a, b } = self.segment(x);
        self.weights(
            i,
            [-1.0 / h, 1.0 / h],
            [
                -(3.0 * a * a - 1.0) * h / 6.0,
                (3.0 * b * b - 1.0) * h / 6.0,
            ],
        )
    }

    fn second_derivative_sensitivity(&self, x: Real) -> Vec<Real> {
        let Segment { i, a, b, .. } = self.segment(x);
        self.weights(i, [0.0, 0.0], [a, b])
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
