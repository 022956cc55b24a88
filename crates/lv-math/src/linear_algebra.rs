//! Small dense linear solves.
//!
//! Thin wrappers over nalgebra's LU decomposition with partial pivoting.
//! The 3×3 solver is the workhorse of the lattice code: one call per node
//! and time slice, so it stays on the stack.

use nalgebra::{DMatrix, Matrix3, Vector3};

use lv_core::{ensure, errors::Result, Real};

/// Solve `A x = b` for a 3×3 system given in row-major order.
///
/// Returns `None` if `A` is singular or the solution is not finite.
pub fn solve_3x3(a: &[[Real; 3]; 3], b: &[Real; 3]) -> Option<[Real; 3]> {
    let m = Matrix3::new(
        a[0][0], a[0][1], a[0][2], //
        a[1][0], a[1][1], a[1][2], //
        a[2][0], a[2][1], a[2][2],
    );
    let x = m.lu().solve(&Vector3::new(b[0], b[1], b[2]))?;
    let x = [x[0], x[1], x[2]];
    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Solve `A X = B` for square `A` and any number of right-hand-side columns.
///
/// # Errors
/// `InvalidInput` on shape mismatch or a singular / ill-conditioned `A`.
pub fn solve_dense(a: &DMatrix<Real>, b: &DMatrix<Real>) -> Result<DMatrix<Real>> {
    ensure!(a.nrows() == a.ncols(), "matrix must be square");
    ensure!(
        a.nrows() == b.nrows(),
        "row count mismatch: {} vs {}",
        a.nrows(),
        b.nrows()
    );
    let x = a.clone().lu().solve(b);
    match x {
        Some(x) if x.iter().all(|v| v.is_finite()) => Ok(x),
        _ => Err(lv_core::Error::InvalidInput(
            "linear system is singular".into(),
        )),
    }
}
