use na::{SMatrix, SVector};

use crate::energy::*;

/// Zero-length threshold below which a spring exerts no force.
const MIN_LENGTH: f64 = 1e-12;

/// Hookean spring between two vertices of a point set in `D` dimensions.
///
/// The local variables are the `N = 2D` coordinates of the two endpoints.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpringEnergy<const D: usize, const N: usize> {
    pub vertices: [usize; 2],
    pub rest_length: f64,
    pub stiffness: f64,
}

pub type SpringEnergy2 = SpringEnergy<2, 4>;
pub type SpringEnergy3 = SpringEnergy<3, 6>;

impl<const D: usize, const N: usize> SpringEnergy<D, N> {
    pub fn new(vertices: [usize; 2], rest_length: f64, stiffness: f64) -> Self {
        assert_eq!(N, 2 * D, "Spring energy expects both endpoints as local variables");
        SpringEnergy {
            vertices,
            rest_length,
            stiffness,
        }
    }

    /// Vector from the first to the second endpoint.
    #[inline]
    fn edge(x: &SVector<f64, N>) -> SVector<f64, D> {
        SVector::from_fn(|i, _| x[D + i] - x[i])
    }
}

impl<const D: usize, const N: usize> ElementEnergy<N> for SpringEnergy<D, N> {
    fn dofs(&self) -> [usize; N] {
        let [a, b] = self.vertices;
        std::array::from_fn(|k| if k < D { D * a + k } else { D * b + k - D })
    }

    fn energy(&self, x: &SVector<f64, N>) -> EnergyValue {
        let stretch = Self::edge(x).norm() - self.rest_length;
        Feasibility::Feasible(0.5 * self.stiffness * stretch * stretch)
    }

    fn evaluate(&self, x: &SVector<f64, N>) -> Feasibility<LocalDerivatives<N>> {
        let edge = Self::edge(x);
        let length = edge.norm();
        let stretch = length - self.rest_length;
        let energy = 0.5 * self.stiffness * stretch * stretch;

        let mut gradient = SVector::<f64, N>::zeros();
        let mut hessian = SMatrix::<f64, N, N>::zeros();

        if length > MIN_LENGTH {
            let dir = edge / length;
            let force = dir * (self.stiffness * stretch);
            let dir_outer = dir * dir.transpose();
            let k = dir_outer * self.stiffness
                + (SMatrix::<f64, D, D>::identity() - dir_outer)
                    * (self.stiffness * stretch / length);

            for i in 0..D {
                gradient[i] = -force[i];
                gradient[D + i] = force[i];
                for j in 0..D {
                    hessian[(i, j)] = k[(i, j)];
                    hessian[(D + i, D + j)] = k[(i, j)];
                    hessian[(i, D + j)] = -k[(i, j)];
                    hessian[(D + i, j)] = -k[(i, j)];
                }
            }
        }

        Feasibility::Feasible(LocalDerivatives {
            energy,
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
    use na::{Vector4, Vector6};

    #[test]
    fn dofs() {
        assert_eq!(SpringEnergy2::new([1, 3], 1.0, 1.0).dofs(), [2, 3, 6, 7]);
        assert_eq!(SpringEnergy3::new([2, 0], 1.0, 1.0).dofs(), [6, 7, 8, 0, 1, 2]);
    }

    #[test]
    fn rest_state() {
        let spring = SpringEnergy2::new([0, 1], 2.0, 10.0);
        let x = Vector4::new(1.0, 1.0, 1.0, 3.0);
        let d = spring.evaluate(&x).feasible().unwrap();
        assert_relative_eq!(d.energy, 0.0);
        assert_relative_eq!(d.gradient.norm(), 0.0);
        // Only the axial direction is stiff at rest.
        assert_relative_eq!(d.hessian[(1, 1)], 10.0);
        assert_relative_eq!(d.hessian[(0, 0)], 0.0);
        assert_relative_eq!(d.hessian[(1, 3)], -10.0);
    }

    #[test]
    fn stretched_spring_pulls_endpoints_together() {
        let spring = SpringEnergy2::new([0, 1], 1.0, 4.0);
        let x = Vector4::new(0.0, 0.0, 3.0, 0.0);
        let d = spring.evaluate(&x).feasible().unwrap();
        assert_relative_eq!(d.energy, 0.5 * 4.0 * 4.0);
        // The negative gradient is the force on each endpoint.
        assert_relative_eq!(d.gradient, Vector4::new(-8.0, 0.0, 8.0, 0.0));
    }

    #[test]
    fn zero_length() {
        let spring = SpringEnergy3::new([0, 1], 1.0, 4.0);
        let x = Vector6::repeat(0.5);
        let d = spring.evaluate(&x).feasible().unwrap();
        assert_relative_eq!(d.energy, 2.0);
        assert_eq!(d.gradient, Vector6::zeros());
        assert_eq!(d.hessian, SMatrix::<f64, 6, 6>::zeros());
    }

    #[test]
    fn gradient() {
        let spring = SpringEnergy3::new([0, 1], 0.8, 3.0);
        let x0 = Vector6::new(0.0, 0.0, 0.0, 1.0, 0.5, -0.2);
        for seed in 0..5 {
            gradient_tester(&spring, &perturb(&x0, 0.2, seed));
        }
    }

    #[test]
    fn hessian() {
        let spring = SpringEnergy2::new([0, 1], 1.5, 2.0);
        let x0 = Vector4::new(0.0, 0.0, 1.0, 0.3);
        for seed in 0..5 {
            hessian_tester(&spring, &perturb(&x0, 0.2, seed));
        }
    }
}
