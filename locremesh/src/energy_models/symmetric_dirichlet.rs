//! Symmetric Dirichlet distortion energy for triangle parametrizations.
//!
//! For a triangle with reference shape matrix `DX` and current 2D shape matrix `Dx` (edge vectors
//! as columns), the map `J = Dx DX⁻¹` is penalized by `‖J‖² + ‖J⁻¹‖²`. For 2x2 matrices
//! `‖J⁻¹‖² = ‖J‖² / det(J)²`, which gives the closed form used below. The constant `4`, attained
//! exactly at isometries, is subtracted so that an undistorted triangle has zero energy.

use na::{Matrix2, Matrix4, Matrix6, SMatrix, Vector3, Vector4, Vector6};

use crate::energy::*;

/// Flatten a 3D triangle into its own plane.
///
/// The first vertex is placed at the origin and the first edge along the positive x axis, so the
/// returned reference shape matrix (edge vectors as columns) always has a positive determinant.
/// Returns `None` for triangles with zero area.
pub fn flatten_reference_triangle(tri: [[f64; 3]; 3]) -> Option<Matrix2<f64>> {
    let [a, b, c] = tri.map(Vector3::from);
    let e1 = b - a;
    let e2 = c - a;
    let normal = e1.cross(&e2);
    let e1_norm = e1.norm();
    let normal_norm = normal.norm();
    if e1_norm == 0.0 || normal_norm <= f64::EPSILON * e1_norm * e2.norm() {
        return None;
    }
    let x_axis = e1 / e1_norm;
    let y_axis = (normal / normal_norm).cross(&x_axis);
    Some(Matrix2::new(
        e1_norm,
        e2.dot(&x_axis),
        0.0,
        e2.dot(&y_axis),
    ))
}

/// Per-triangle symmetric Dirichlet energy over the 2D coordinates of its three vertices.
#[allow(non_snake_case)]
#[derive(Clone, Debug, PartialEq)]
pub struct SymmetricDirichletEnergy {
    vertices: [usize; 3],
    DX_inv: Matrix2<f64>,
    weight: f64,
}

impl SymmetricDirichletEnergy {
    /// Create the energy for the triangle `vertices` with the given reference shape matrix.
    ///
    /// Returns `None` if the reference shape is not positively oriented.
    #[allow(non_snake_case)]
    pub fn new(vertices: [usize; 3], DX: Matrix2<f64>, weight: f64) -> Option<Self> {
        if DX.determinant() <= 0.0 {
            return None;
        }
        DX.try_inverse().map(|DX_inv| SymmetricDirichletEnergy {
            vertices,
            DX_inv,
            weight,
        })
    }

    pub fn vertices(&self) -> [usize; 3] {
        self.vertices
    }

    /// Shape matrix with edge vectors `b - a` and `c - a` as columns.
    #[inline]
    pub fn shape_matrix(x: &Vector6<f64>) -> Matrix2<f64> {
        Matrix2::new(x[2] - x[0], x[4] - x[0], x[3] - x[1], x[5] - x[1])
    }

    /// Linear map from local coordinates to the row-major entries of `J`.
    fn jacobian_map(&self) -> SMatrix<f64, 4, 6> {
        let mut a = SMatrix::<f64, 4, 6>::zeros();
        for r in 0..2 {
            for k in 0..2 {
                let row = 2 * r + k;
                let b0 = self.DX_inv[(0, k)];
                let b1 = self.DX_inv[(1, k)];
                a[(row, r)] = -(b0 + b1);
                a[(row, 2 + r)] = b0;
                a[(row, 4 + r)] = b1;
            }
        }
        a
    }
}

impl ElementEnergy<6> for SymmetricDirichletEnergy {
    fn dofs(&self) -> [usize; 6] {
        let [a, b, c] = self.vertices;
        [2 * a, 2 * a + 1, 2 * b, 2 * b + 1, 2 * c, 2 * c + 1]
    }

    #[allow(non_snake_case)]
    fn energy(&self, x: &Vector6<f64>) -> EnergyValue {
        let Dx = Self::shape_matrix(x);
        if Dx.determinant() <= 0.0 {
            return Feasibility::Infeasible;
        }
        let J = Dx * self.DX_inv;
        let s = J.norm_squared();
        let d = J.determinant();
        Feasibility::Feasible(self.weight * (s + s / (d * d) - 4.0))
    }

    #[allow(non_snake_case)]
    fn evaluate(&self, x: &Vector6<f64>) -> Feasibility<LocalDerivatives<6>> {
        let Dx = Self::shape_matrix(x);
        if Dx.determinant() <= 0.0 {
            return Feasibility::Infeasible;
        }
        let J = Dx * self.DX_inv;
        let j = Vector4::new(J[(0, 0)], J[(0, 1)], J[(1, 0)], J[(1, 1)]);
        // Derivative of det(J) with respect to the entries of J.
        let cof = Vector4::new(J[(1, 1)], -J[(1, 0)], -J[(0, 1)], J[(0, 0)]);

        let s = j.norm_squared();
        let d = J.determinant();
        let d2 = d * d;
        let d3 = d2 * d;

        // E = s * f with f = 1 + 1/d²
        let f = 1.0 + 1.0 / d2;
        let grad_s = j * 2.0;
        let grad_f = cof * (-2.0 / d3);
        let grad_j = grad_s * f + grad_f * s;

        let mut hess_det = Matrix4::zeros();
        hess_det[(0, 3)] = 1.0;
        hess_det[(3, 0)] = 1.0;
        hess_det[(1, 2)] = -1.0;
        hess_det[(2, 1)] = -1.0;
        let hess_f = cof * cof.transpose() * (6.0 / (d2 * d2)) - hess_det * (2.0 / d3);
        let hess_j = Matrix4::identity() * (2.0 * f)
            + grad_s * grad_f.transpose()
            + grad_f * grad_s.transpose()
            + hess_f * s;

        let a = self.jacobian_map();
        let gradient: Vector6<f64> = a.transpose() * grad_j * self.weight;
        let hessian: Matrix6<f64> = a.transpose() * hess_j * a * self.weight;

        Feasibility::Feasible(LocalDerivatives {
            energy: self.weight * (s * f - 4.0),
            gradient,
            hessian,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy_models::test_utils::*;
    use approx::*;

    fn tilted_triangle() -> [[f64; 3]; 3] {
        [[0.1, 0.2, 0.3], [1.1, 0.4, 0.2], [0.4, 1.3, 0.9]]
    }

    fn test_energy() -> SymmetricDirichletEnergy {
        let ref_shape = flatten_reference_triangle(tilted_triangle()).unwrap();
        SymmetricDirichletEnergy::new([0, 1, 2], ref_shape, 0.5).unwrap()
    }

    /// Local coordinates of the reference triangle itself.
    fn reference_embedding(ref_shape: &Matrix2<f64>) -> Vector6<f64> {
        Vector6::new(
            0.0,
            0.0,
            ref_shape[(0, 0)],
            ref_shape[(1, 0)],
            ref_shape[(0, 1)],
            ref_shape[(1, 1)],
        )
    }

    #[test]
    fn flattening_preserves_lengths() {
        let [a, b, c] = tilted_triangle().map(Vector3::from);
        let ref_shape = flatten_reference_triangle(tilted_triangle()).unwrap();
        assert!(ref_shape.determinant() > 0.0);
        assert_eq!(ref_shape[(1, 0)], 0.0);
        assert_relative_eq!(ref_shape.column(0).norm(), (b - a).norm(), epsilon = 1e-12);
        assert_relative_eq!(ref_shape.column(1).norm(), (c - a).norm(), epsilon = 1e-12);
        let e3 = ref_shape.column(1) - ref_shape.column(0);
        assert_relative_eq!(e3.norm(), (c - b).norm(), epsilon = 1e-12);
    }

    #[test]
    fn degenerate_reference() {
        let collinear = [[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]];
        assert!(flatten_reference_triangle(collinear).is_none());
        let repeated = [[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        assert!(flatten_reference_triangle(repeated).is_none());
        let flipped = Matrix2::new(1.0, 0.0, 0.0, -1.0);
        assert!(SymmetricDirichletEnergy::new([0, 1, 2], flipped, 1.0).is_none());
    }

    #[test]
    fn isometry_has_zero_energy() {
        let ref_shape = flatten_reference_triangle(tilted_triangle()).unwrap();
        let energy = SymmetricDirichletEnergy::new([0, 1, 2], ref_shape, 1.0).unwrap();
        // Rotate and translate the reference embedding.
        let (sin, cos) = 0.7_f64.sin_cos();
        let x0 = reference_embedding(&ref_shape);
        let x = Vector6::from_fn(|i, _| {
            let (px, py) = (x0[2 * (i / 2)], x0[2 * (i / 2) + 1]);
            if i % 2 == 0 {
                cos * px - sin * py + 3.0
            } else {
                sin * px + cos * py - 1.0
            }
        });
        let d = energy.evaluate(&x).feasible().unwrap();
        assert_relative_eq!(d.energy, 0.0, epsilon = 1e-12);
        assert_relative_eq!(d.gradient.norm(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn uniform_scaling() {
        let ref_shape = flatten_reference_triangle(tilted_triangle()).unwrap();
        let energy = SymmetricDirichletEnergy::new([0, 1, 2], ref_shape, 0.25).unwrap();
        let x = reference_embedding(&ref_shape) * 2.0;
        // J = 2I: ‖J‖² + ‖J⁻¹‖² - 4 = 8 + 0.5 - 4
        assert_relative_eq!(energy.energy(&x).feasible().unwrap(), 0.25 * 4.5, epsilon = 1e-12);
    }

    #[test]
    fn inverted_is_infeasible() {
        let energy = test_energy();
        let flipped = Vector6::new(0.0, 0.0, 0.0, 1.0, 1.0, 0.0);
        assert_eq!(energy.energy(&flipped), Feasibility::Infeasible);
        assert!(!energy.evaluate(&flipped).is_feasible());
        let collapsed = Vector6::new(0.0, 0.0, 1.0, 1.0, 2.0, 2.0);
        assert_eq!(energy.energy(&collapsed), Feasibility::Infeasible);
    }

    #[test]
    fn dofs() {
        let ref_shape = Matrix2::identity();
        let energy = SymmetricDirichletEnergy::new([3, 0, 5], ref_shape, 1.0).unwrap();
        assert_eq!(energy.dofs(), [6, 7, 0, 1, 10, 11]);
        let x: Vec<f64> = (0..12).map(|i| i as f64).collect();
        assert_eq!(energy.gather(&x), Vector6::new(6.0, 7.0, 0.0, 1.0, 10.0, 11.0));
    }

    #[test]
    fn gradient() {
        let energy = test_energy();
        let ref_shape = flatten_reference_triangle(tilted_triangle()).unwrap();
        let x0 = reference_embedding(&ref_shape);
        for seed in 0..5 {
            gradient_tester(&energy, &perturb(&x0, 0.1, seed));
        }
    }

    #[test]
    fn hessian() {
        let energy = test_energy();
        let ref_shape = flatten_reference_triangle(tilted_triangle()).unwrap();
        let x0 = reference_embedding(&ref_shape);
        for seed in 0..5 {
            hessian_tester(&energy, &perturb(&x0, 0.1, seed));
        }
    }
}
