//! Projection of local element Hessians onto the cone of positive semi-definite matrices.

use na::{DMatrix, SMatrix, SymmetricEigen};

/// Default lower bound on the eigenvalues of projected element Hessians.
pub const DEFAULT_EIGENVALUE_FLOOR: f64 = 1e-9;

/// Replace the symmetric matrix `hess` by the nearest matrix whose eigenvalues are all at least
/// `floor`.
///
/// The matrix is symmetrized first. Matrices whose spectrum is already bounded below by `floor`
/// are left as is. Returns `true` if the matrix was modified by clamping.
pub fn project_psd<const N: usize>(hess: &mut SMatrix<f64, N, N>, floor: f64) -> bool {
    let sym = (*hess + hess.transpose()) * 0.5;
    *hess = sym;

    let mut eigen = SymmetricEigen::new(DMatrix::from_column_slice(N, N, sym.as_slice()));
    if eigen.eigenvalues.iter().all(|&lambda| lambda >= floor) {
        return false;
    }

    for lambda in eigen.eigenvalues.iter_mut() {
        *lambda = lambda.max(floor);
    }
    let recomposed = eigen.recompose();
    hess.copy_from(&recomposed);

    // Reconstruction is only symmetric up to round-off.
    let sym = (*hess + hess.transpose()) * 0.5;
    *hess = sym;
    true
}
