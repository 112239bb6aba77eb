use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::line_search::{line_search, LineSearch, LineSearchOutcome};
use super::linsolve::SparseDirectSolver;
use super::{Assembler, DofMap, SolveResult, Status};
use crate::energy::*;
use crate::project::DEFAULT_EIGENVALUE_FLOOR;
use crate::{inf_norm, Error};

// Parameters for the Newton solver.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonParams {
    /// Newton decrement tolerance.
    pub tolerance: f64,
    /// Maximum number of Newton iterations permitted.
    pub max_iterations: u32,
    /// Line search method.
    pub line_search: LineSearch,
    /// Lower bound on the eigenvalues of projected element Hessians.
    pub eigenvalue_floor: f64,
    /// Multiple of the identity added to the reduced Hessian before factorization.
    pub regularization: f64,
}

impl Default for NewtonParams {
    fn default() -> Self {
        NewtonParams {
            tolerance: 1e-4,
            max_iterations: 30,
            line_search: LineSearch::default(),
            eigenvalue_floor: DEFAULT_EIGENVALUE_FLOOR,
            regularization: 0.0,
        }
    }
}

impl NewtonParams {
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |name: &str| {
            Err(Error::InvalidParameter {
                name: name.to_string(),
            })
        };
        if !(self.tolerance >= 0.0) {
            return invalid("tolerance");
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations");
        }
        if !self.line_search.validate() {
            return invalid("line_search");
        }
        if !(self.eigenvalue_floor >= 0.0) {
            return invalid("eigenvalue_floor");
        }
        if !(self.regularization >= 0.0) {
            return invalid("regularization");
        }
        Ok(())
    }
}

/// A minimization problem whose energy is a sum of element energies.
pub trait NonLinearProblem {
    /// Partition of the variables into fixed and free.
    fn dof_map(&self) -> &DofMap;
    /// Total energy at the configuration `x`.
    fn energy(&self, x: &[f64]) -> EnergyValue;
    /// Accumulate all element contributions at `x` into the assembler.
    fn assemble(&self, x: &[f64], assembler: &mut Assembler) -> Feasibility<()>;
}

/// Newton decrement `λ = -½ gᵀd` for the gradient `g` and the Newton direction `d = -H⁻¹g`.
///
/// This is half the squared `H⁻¹` norm of the gradient, which is also the energy decrease
/// predicted by the quadratic model.
pub fn newton_decrement(gradient: &[f64], direction: &[f64]) -> f64 {
    -0.5 * gradient
        .iter()
        .zip(direction.iter())
        .map(|(&g, &d)| g * d)
        .sum::<f64>()
}

/// Projected Newton minimizer.
pub struct Newton<P> {
    problem: P,
    params: NewtonParams,
    assembler: Assembler,
    solver: SparseDirectSolver,
    /// Newton decrement of each iteration of the last solve.
    history: Vec<f64>,
}

impl<P: NonLinearProblem> Newton<P> {
    pub fn new(problem: P, params: NewtonParams) -> Self {
        Newton {
            problem,
            params,
            assembler: Assembler::new(params.eigenvalue_floor),
            solver: SparseDirectSolver::new(params.regularization),
            history: Vec::new(),
        }
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Newton decrements recorded during the last call to `solve_with`.
    pub fn convergence_history(&self) -> &[f64] {
        &self.history
    }

    /// Minimize starting from `x`, which is overwritten by the final iterate.
    ///
    /// If the run fails, `x` holds the last accepted iterate. Fixed variables are never written.
    pub fn solve_with(&mut self, x: &mut [f64]) -> SolveResult {
        let Newton {
            problem,
            params,
            assembler,
            solver,
            history,
        } = self;
        history.clear();

        let dof_map = problem.dof_map();
        assert_eq!(x.len(), dof_map.num_dofs(), "Variable vector size mismatch");

        if dof_map.num_free() == 0 {
            return SolveResult {
                iterations: 0,
                energy: problem.energy(x).feasible().unwrap_or(f64::INFINITY),
                decrement: 0.0,
                status: Status::NothingToSolve,
            };
        }

        let mut iterations = 0;
        let mut x0 = x.to_vec();
        let mut rhs = vec![0.0; dof_map.num_free()];

        // Timing stats
        let mut assembly_time = Duration::new(0, 0);
        let mut linsolve_time = Duration::new(0, 0);
        let mut ls_time = Duration::new(0, 0);

        log_debug_stats_header();

        let result = loop {
            let t_begin_assembly = Instant::now();
            assembler.begin(dof_map.num_free());
            let energy = match (problem.assemble(x, assembler), assembler.energy()) {
                (Feasibility::Feasible(()), Feasibility::Feasible(energy)) => energy,
                _ => {
                    break SolveResult {
                        iterations,
                        energy: f64::INFINITY,
                        decrement: f64::INFINITY,
                        status: Status::InfeasibleInitialPoint,
                    };
                }
            };
            let hessian = assembler.hessian();
            let gradient = assembler.gradient();
            rhs.iter_mut()
                .zip(gradient.iter())
                .for_each(|(r, &g)| *r = -g);
            assembly_time += Instant::now() - t_begin_assembly;
            log::trace!(
                "Projected {} element Hessians",
                assembler.num_projected()
            );

            let t_begin_linsolve = Instant::now();
            let direction = match solver.solve(&hessian, &rhs) {
                Ok(direction) => direction,
                Err(err) => {
                    log::warn!("Linear solve failed: {}", err);
                    break SolveResult {
                        iterations,
                        energy,
                        decrement: f64::INFINITY,
                        status: Status::LinearSolveError(err),
                    };
                }
            };
            linsolve_time += Instant::now() - t_begin_linsolve;

            let decrement = newton_decrement(gradient, &direction);
            history.push(decrement);

            let t_begin_ls = Instant::now();
            x0.copy_from_slice(x);
            let outcome = line_search(
                &params.line_search,
                dof_map,
                &x0,
                &direction,
                energy,
                -2.0 * decrement,
                x,
                |x| problem.energy(x),
            );
            ls_time += Instant::now() - t_begin_ls;

            iterations += 1;

            log_debug_stats(
                iterations,
                energy,
                inf_norm(gradient.iter().cloned()),
                decrement,
                &outcome,
            );

            let converged = decrement < params.tolerance;
            match outcome {
                LineSearchOutcome::Exhausted { .. } => {
                    let status = if converged {
                        Status::Converged
                    } else {
                        log::warn!("Line search exhausted after {} iterations", iterations);
                        Status::StepRejectionExhausted
                    };
                    break SolveResult {
                        iterations,
                        energy,
                        decrement,
                        status,
                    };
                }
                LineSearchOutcome::Accepted { energy, .. } => {
                    if converged {
                        break SolveResult {
                            iterations,
                            energy,
                            decrement,
                            status: Status::Converged,
                        };
                    }
                    if iterations >= params.max_iterations {
                        break SolveResult {
                            iterations,
                            energy,
                            decrement,
                            status: Status::MaximumIterationsReached,
                        };
                    }
                }
            }
        };

        log::debug!("Assembly time: {}ms", assembly_time.as_millis());
        log::debug!("Linear solve time: {}ms", linsolve_time.as_millis());
        log::debug!("Line search time: {}ms", ls_time.as_millis());

        if result.status == Status::Converged {
            log::info!("Converged in {} iterations", result.iterations);
        } else {
            log::info!("Newton solve finished: {}", result);
        }
        result
    }
}

/*
 * Status print routines.
 * i       - iteration number
 * energy  - energy before the step
 * g-inf   - inf-norm of the free gradient
 * dec     - Newton decrement
 * alpha   - accepted step size (0 if rejected)
 * ls #    - number of line search trial points
 */
fn log_debug_stats_header() {
    log::debug!("    i |   energy   |   g-inf    |    dec     |   alpha    | ls # ");
    log::debug!("------+------------+------------+------------+------------+------");
}

fn log_debug_stats(
    iterations: u32,
    energy: f64,
    grad_inf: f64,
    decrement: f64,
    outcome: &LineSearchOutcome,
) {
    log::debug!(
        "{i:>5} | {e:10.3e} | {g:10.3e} | {dec:10.3e} | {alpha:10.3e} | {ls:>4} ",
        i = iterations,
        e = energy,
        g = grad_inf,
        dec = decrement,
        alpha = outcome.alpha(),
        ls = outcome.steps()
    );
}
