use sprs::{CsMat, FillInReduction, SymmetryCheck};
use sprs_ldl::Ldl;
use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum SparseDirectSolveError {
    #[error("System matrix and right-hand side sizes do not match")]
    DimensionMismatch,
    #[error("Sparse factorization failed")]
    FactorizationFailed,
    #[error("System matrix is singular or not positive definite")]
    MatrixIsSingular,
    #[error("Linear solve produced non-finite values")]
    NonFiniteSolution,
}

/// Sparse direct solver for symmetric positive definite systems.
///
/// The matrix is factorized with a fill-reducing LDLᵀ decomposition on every call. All pivots
/// must be positive, otherwise the system is reported as singular.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SparseDirectSolver {
    /// Multiple of the identity added to the matrix before factorization.
    pub regularization: f64,
}

impl SparseDirectSolver {
    pub fn new(regularization: f64) -> Self {
        SparseDirectSolver { regularization }
    }

    /// Solve `mtx · x = rhs`.
    pub fn solve(&self, mtx: &CsMat<f64>, rhs: &[f64]) -> Result<Vec<f64>, SparseDirectSolveError> {
        Ok(self.solve_many(mtx, &[rhs])?.remove(0))
    }

    /// Solve `mtx · x = rhs` for several right-hand sides sharing one factorization.
    pub fn solve_many(
        &self,
        mtx: &CsMat<f64>,
        rhs: &[&[f64]],
    ) -> Result<Vec<Vec<f64>>, SparseDirectSolveError> {
        let n = mtx.rows();
        if mtx.cols() != n || rhs.iter().any(|r| r.len() != n) {
            return Err(SparseDirectSolveError::DimensionMismatch);
        }
        if n == 0 {
            return Ok(vec![Vec::new(); rhs.len()]);
        }
        if n == 1 {
            // The LDL factorization needs at least two rows.
            let d = mtx.get(0, 0).cloned().unwrap_or(0.0) + self.regularization;
            if !(d > 0.0) {
                return Err(SparseDirectSolveError::MatrixIsSingular);
            }
            return rhs
                .iter()
                .map(|r| {
                    let x = r[0] / d;
                    if x.is_finite() {
                        Ok(vec![x])
                    } else {
                        Err(SparseDirectSolveError::NonFiniteSolution)
                    }
                })
                .collect();
        }

        let mtx = if self.regularization > 0.0 {
            let reg = self.regularization;
            mtx + &CsMat::eye(n).map(|&v: &f64| v * reg)
        } else {
            mtx.clone()
        }
        .to_csc();

        let ldl = Ldl::new()
            .fill_in_reduction(FillInReduction::ReverseCuthillMcKee)
            .check_symmetry(SymmetryCheck::DontCheckSymmetry)
            .numeric(mtx.view())
            .map_err(|e| {
                log::debug!("LDL factorization error: {:?}", e);
                SparseDirectSolveError::FactorizationFailed
            })?;

        if ldl.d().iter().any(|&d| !(d > 0.0)) {
            return Err(SparseDirectSolveError::MatrixIsSingular);
        }

        rhs.iter()
            .map(|&r| {
                let sol = ldl.solve(r);
                if sol.iter().all(|x| x.is_finite()) {
                    Ok(sol)
                } else {
                    Err(SparseDirectSolveError::NonFiniteSolution)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;
    use sprs::TriMat;

    fn laplacian_1d(n: usize, diag: f64) -> CsMat<f64> {
        let mut tri = TriMat::new((n, n));
        for i in 0..n {
            tri.add_triplet(i, i, diag);
            if i + 1 < n {
                tri.add_triplet(i, i + 1, -1.0);
                tri.add_triplet(i + 1, i, -1.0);
            }
        }
        tri.to_csr()
    }

    #[test]
    fn spd_solve() {
        let mtx = laplacian_1d(5, 2.5);
        let rhs = [1.0, 0.0, -2.0, 0.5, 3.0];
        let x = SparseDirectSolver::default().solve(&mtx, &rhs).unwrap();
        for (i, row) in mtx.outer_iterator().enumerate() {
            let ax: f64 = row.iter().map(|(j, &v)| v * x[j]).sum();
            assert_relative_eq!(ax, rhs[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn many_rhs() {
        let mtx = laplacian_1d(4, 3.0);
        let e0 = [1.0, 0.0, 0.0, 0.0];
        let e3 = [0.0, 0.0, 0.0, 1.0];
        let sols = SparseDirectSolver::default()
            .solve_many(&mtx, &[&e0[..], &e3[..]])
            .unwrap();
        assert_eq!(sols.len(), 2);
        // The inverse of a symmetric matrix is symmetric.
        assert_relative_eq!(sols[0][3], sols[1][0], epsilon = 1e-14);
    }

    #[test]
    fn singular() {
        // Pure Neumann Laplacian: constant vectors are in the null space.
        let mut tri = TriMat::new((2, 2));
        tri.add_triplet(0, 0, 1.0);
        tri.add_triplet(0, 1, -1.0);
        tri.add_triplet(1, 0, -1.0);
        tri.add_triplet(1, 1, 1.0);
        let mtx: CsMat<f64> = tri.to_csr();
        assert!(SparseDirectSolver::default().solve(&mtx, &[1.0, -1.0]).is_err());

        // Regularization removes the null space.
        let x = SparseDirectSolver::new(1.0).solve(&mtx, &[1.0, -1.0]).unwrap();
        assert_relative_eq!(x[0], 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], -1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn single_unknown() {
        let mut tri = TriMat::new((1, 1));
        tri.add_triplet(0, 0, 4.0);
        let mtx: CsMat<f64> = tri.to_csr();
        assert_eq!(SparseDirectSolver::default().solve(&mtx, &[2.0]), Ok(vec![0.5]));
        assert_eq!(
            SparseDirectSolver::new(4.0).solve_many(&mtx, &[&[2.0][..], &[-8.0][..]]),
            Ok(vec![vec![0.25], vec![-1.0]])
        );

        let zero: CsMat<f64> = TriMat::new((1, 1)).to_csr();
        assert_eq!(
            SparseDirectSolver::default().solve(&zero, &[1.0]),
            Err(SparseDirectSolveError::MatrixIsSingular)
        );
        assert_eq!(SparseDirectSolver::new(2.0).solve(&zero, &[1.0]), Ok(vec![0.5]));
    }

    #[test]
    fn dimension_mismatch() {
        let mtx = laplacian_1d(3, 2.0);
        assert_eq!(
            SparseDirectSolver::default().solve(&mtx, &[1.0]),
            Err(SparseDirectSolveError::DimensionMismatch)
        );
    }
}
