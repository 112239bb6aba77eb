//! Mass-spring systems advanced in time with a single projected Newton step of implicit Euler.
//!
//! Each step minimizes the incremental potential
//!
//! `Σᵥ ½ mᵥ ‖(xᵥ − x̃ᵥ) / dt‖² + Σₛ ½ kₛ (‖xᵢ − xⱼ‖ − rₛ)²`
//!
//! over the positions of free vertices, where `x̃` is the inertial prediction. Only one Newton
//! iteration is taken by default, trading accuracy of the implicit solve for a fixed cost per
//! step.

use na::SVector;
use serde::{Deserialize, Serialize};

use crate::energy::*;
use crate::energy_models::{InertiaEnergy, SpringEnergy};
use crate::opt::{Assembler, DofMap, LineSearch, Newton, NewtonParams, NonLinearProblem};
use crate::{Error, SolveResult};

/// Simulation parameters.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    pub time_step: f64,
    /// Gravitational acceleration. Only the first `dim` components are used.
    pub gravity: [f64; 3],
    /// Newton decrement tolerance.
    pub tolerance: f64,
    /// Number of Newton iterations per step.
    pub max_iterations: u32,
    /// Drop the previous velocity from the inertial prediction.
    pub clear_velocity: bool,
    /// Fraction of the previous velocity removed each step. Unused when velocities are cleared.
    pub damping: f64,
    pub line_search: LineSearch,
}

impl Default for SimParams {
    fn default() -> Self {
        SimParams {
            time_step: 0.01,
            gravity: [0.0, -9.8, 0.0],
            tolerance: 1e-4,
            max_iterations: 1,
            clear_velocity: true,
            damping: 0.0,
            line_search: LineSearch::default(),
        }
    }
}

impl SimParams {
    /// Parse parameters from RON. Missing fields take their default values.
    pub fn from_ron_str(s: &str) -> Result<Self, Error> {
        Ok(ron::from_str(s)?)
    }

    pub fn newton_params(&self) -> NewtonParams {
        NewtonParams {
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
            line_search: self.line_search,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |name: &str| {
            Err(Error::InvalidParameter {
                name: name.to_string(),
            })
        };
        if !(self.time_step > 0.0 && self.time_step.is_finite()) {
            return invalid("time_step");
        }
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return invalid("gravity");
        }
        if !(0.0..=1.0).contains(&self.damping) {
            return invalid("damping");
        }
        self.newton_params().validate()
    }
}

/// An elastic connection between two vertices.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spring {
    pub vertices: [usize; 2],
    pub rest_length: f64,
    pub stiffness: f64,
}

/// Incremental potential of one implicit Euler step in `D` dimensions (`N = 2D`).
pub struct ImplicitEulerProblem<const D: usize, const N: usize> {
    dof_map: DofMap,
    springs: Vec<SpringEnergy<D, N>>,
    inertia: Vec<InertiaEnergy<D>>,
}

impl<const D: usize, const N: usize> NonLinearProblem for ImplicitEulerProblem<D, N> {
    fn dof_map(&self) -> &DofMap {
        &self.dof_map
    }
    fn energy(&self, x: &[f64]) -> EnergyValue {
        total_energy(&self.springs, x) + total_energy(&self.inertia, x)
    }
    fn assemble(&self, x: &[f64], assembler: &mut Assembler) -> Feasibility<()> {
        match assembler.add_elements(&self.springs, x, &self.dof_map) {
            Feasibility::Feasible(()) => assembler.add_elements(&self.inertia, x, &self.dof_map),
            Feasibility::Infeasible => Feasibility::Infeasible,
        }
    }
}

/// A set of point masses connected by springs in 2D or 3D.
///
/// Positions and velocities are stored as flat vectors with `dim` consecutive coordinates per
/// vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct MassSpringSystem {
    dim: usize,
    pos: Vec<f64>,
    vel: Vec<f64>,
    mass: Vec<f64>,
    springs: Vec<Spring>,
    fixed: Vec<usize>,
    params: SimParams,
}

impl MassSpringSystem {
    /// Create a system at rest.
    ///
    /// Vertices listed in `fixed` never move. All inputs are validated here so that stepping
    /// can only fail in the solver.
    pub fn new<const D: usize>(
        positions: &[[f64; D]],
        masses: &[f64],
        springs: Vec<Spring>,
        fixed: &[usize],
        params: SimParams,
    ) -> Result<Self, Error> {
        if D != 2 && D != 3 {
            return Err(Error::InvalidParameter {
                name: "dim".to_string(),
            });
        }
        params.validate()?;

        let n = positions.len();
        if masses.len() != n {
            return Err(Error::SizeMismatch {
                what: "masses",
                expected: n,
                actual: masses.len(),
            });
        }
        if !masses.iter().all(|&m| m > 0.0 && m.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "mass".to_string(),
            });
        }
        for s in springs.iter() {
            if let Some(&v) = s.vertices.iter().find(|&&v| v >= n) {
                return Err(Error::SizeMismatch {
                    what: "spring vertex index",
                    expected: n,
                    actual: v,
                });
            }
            if !(s.stiffness >= 0.0 && s.stiffness.is_finite()) {
                return Err(Error::InvalidParameter {
                    name: "stiffness".to_string(),
                });
            }
            if !(s.rest_length >= 0.0 && s.rest_length.is_finite()) {
                return Err(Error::InvalidParameter {
                    name: "rest_length".to_string(),
                });
            }
        }

        // Validates the fixed indices.
        let dof_map = DofMap::new(n, D, fixed)?;

        Ok(MassSpringSystem {
            dim: D,
            pos: positions.iter().flat_map(|p| p.iter().cloned()).collect(),
            vel: vec![0.0; n * D],
            mass: masses.to_vec(),
            springs,
            fixed: dof_map.fixed_vertices().collect(),
            params,
        })
    }

    /// A planar grid of `rows x cols` unit masses with structural springs at rest.
    ///
    /// Row `i` and column `j` is placed at `(j, -i) * spacing` and the top row is pinned.
    pub fn grid(
        rows: usize,
        cols: usize,
        spacing: f64,
        stiffness: f64,
        params: SimParams,
    ) -> Result<Self, Error> {
        if !(spacing > 0.0) {
            return Err(Error::InvalidParameter {
                name: "spacing".to_string(),
            });
        }
        let idx = |i: usize, j: usize| i * cols + j;
        let mut positions = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                positions.push([j as f64 * spacing, -(i as f64) * spacing]);
            }
        }

        let mut springs = Vec::new();
        for i in 0..rows {
            for j in 0..cols {
                if j + 1 < cols {
                    springs.push(Spring {
                        vertices: [idx(i, j), idx(i, j + 1)],
                        rest_length: spacing,
                        stiffness,
                    });
                }
                if i + 1 < rows {
                    springs.push(Spring {
                        vertices: [idx(i, j), idx(i + 1, j)],
                        rest_length: spacing,
                        stiffness,
                    });
                }
            }
        }

        let fixed: Vec<usize> = (0..cols.min(positions.len())).collect();
        MassSpringSystem::new(
            &positions,
            &vec![1.0; positions.len()],
            springs,
            &fixed,
            params,
        )
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.mass.len()
    }

    /// Flat vertex positions.
    #[inline]
    pub fn positions(&self) -> &[f64] {
        &self.pos
    }

    /// Position of a single vertex.
    #[inline]
    pub fn position(&self, vtx: usize) -> &[f64] {
        &self.pos[self.dim * vtx..self.dim * (vtx + 1)]
    }

    /// Flat vertex velocities.
    #[inline]
    pub fn velocities(&self) -> &[f64] {
        &self.vel
    }

    pub fn set_velocities(&mut self, vel: &[f64]) -> Result<(), Error> {
        if vel.len() != self.vel.len() {
            return Err(Error::SizeMismatch {
                what: "velocities",
                expected: self.vel.len(),
                actual: vel.len(),
            });
        }
        self.vel.copy_from_slice(vel);
        Ok(())
    }

    pub fn masses(&self) -> &[f64] {
        &self.mass
    }

    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    /// Sorted indices of pinned vertices.
    pub fn fixed(&self) -> &[usize] {
        &self.fixed
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Replace the simulation parameters.
    pub fn set_params(&mut self, params: SimParams) -> Result<(), Error> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// Advance the system by one time step.
    ///
    /// Positions are updated by the Newton iterate and velocities are set to the finite
    /// difference of positions. If the solve fails, the state is left unchanged and the solve
    /// result is returned in the error.
    pub fn step_implicit_euler(&mut self) -> Result<SolveResult, Error> {
        match self.dim {
            2 => self.step::<2, 4>(),
            3 => self.step::<3, 6>(),
            _ => Err(Error::InvalidParameter {
                name: "dim".to_string(),
            }),
        }
    }

    fn step<const D: usize, const N: usize>(&mut self) -> Result<SolveResult, Error> {
        let SimParams {
            time_step: dt,
            gravity,
            clear_velocity,
            damping,
            ..
        } = self.params;

        let gravity = SVector::<f64, D>::from_fn(|i, _| gravity[i]);
        let vel_scale = if clear_velocity { 0.0 } else { 1.0 - damping };
        let dof_map = DofMap::new(self.num_vertices(), D, &self.fixed)?;

        let inertia = (0..self.num_vertices())
            .filter(|&v| !dof_map.is_fixed_vertex(v))
            .map(|v| {
                let prev = SVector::<f64, D>::from_column_slice(&self.pos[D * v..D * (v + 1)]);
                let vel = SVector::<f64, D>::from_column_slice(&self.vel[D * v..D * (v + 1)]);
                let target =
                    InertiaEnergy::implicit_euler_target(prev, vel * vel_scale, gravity, dt);
                InertiaEnergy::new(v, self.mass[v], dt, target)
            })
            .collect();
        let springs = self
            .springs
            .iter()
            .map(|s| SpringEnergy::new(s.vertices, s.rest_length, s.stiffness))
            .collect();

        let problem = ImplicitEulerProblem::<D, N> {
            dof_map,
            springs,
            inertia,
        };

        let mut x = self.pos.clone();
        let mut solver = Newton::new(problem, self.params.newton_params());
        let result = solver.solve_with(&mut x);
        if result.is_failure() {
            log::warn!("Implicit Euler step failed: {}", result);
            return Err(Error::NLSolveError { result });
        }

        for ((v, &x), &x_prev) in self.vel.iter_mut().zip(x.iter()).zip(self.pos.iter()) {
            *v = (x - x_prev) / dt;
        }
        self.pos = x;
        Ok(result)
    }
}
