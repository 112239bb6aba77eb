use na::{SMatrix, SVector};

use crate::energy::*;

/// Inertial part of the implicit Euler incremental potential for a single vertex:
///
/// `E(x) = ½ m ‖(x − x̃) / dt‖²`
///
/// where `x̃` is the predicted position of the vertex in the absence of internal forces.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InertiaEnergy<const D: usize> {
    pub vertex: usize,
    pub mass: f64,
    pub time_step: f64,
    pub target: SVector<f64, D>,
}

impl<const D: usize> InertiaEnergy<D> {
    pub fn new(vertex: usize, mass: f64, time_step: f64, target: SVector<f64, D>) -> Self {
        InertiaEnergy {
            vertex,
            mass,
            time_step,
            target,
        }
    }

    /// Predicted position `x_prev + dt·v + dt²·g` used as the inertial target.
    pub fn implicit_euler_target(
        prev_pos: SVector<f64, D>,
        vel: SVector<f64, D>,
        gravity: SVector<f64, D>,
        time_step: f64,
    ) -> SVector<f64, D> {
        prev_pos + vel * time_step + gravity * (time_step * time_step)
    }
}

impl<const D: usize> ElementEnergy<D> for InertiaEnergy<D> {
    fn dofs(&self) -> [usize; D] {
        std::array::from_fn(|i| D * self.vertex + i)
    }

    fn energy(&self, x: &SVector<f64, D>) -> EnergyValue {
        let v = (x - self.target) / self.time_step;
        Feasibility::Feasible(0.5 * self.mass * v.norm_squared())
    }

    fn evaluate(&self, x: &SVector<f64, D>) -> Feasibility<LocalDerivatives<D>> {
        let dt = self.time_step;
        let v = (x - self.target) / dt;
        Feasibility::Feasible(LocalDerivatives {
            energy: 0.5 * self.mass * v.norm_squared(),
            gradient: v * (self.mass / dt),
            hessian: SMatrix::<f64, D, D>::identity() * (self.mass / (dt * dt)),
        })
    }
}
