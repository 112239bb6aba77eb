//! Projected Newton minimization of sums of per-element energies.
//!
//! The pieces are kept separate so they can be tested in isolation: [`DofMap`] partitions the
//! variables into fixed and free, [`Assembler`] builds the free gradient and projected Hessian,
//! [`SparseDirectSolver`] computes the Newton direction, [`line_search`] globalizes the step and
//! [`Newton`] drives the iteration.

pub mod assembly;
pub mod dof_map;
pub mod line_search;
pub mod linsolve;
pub mod newton;

pub use assembly::Assembler;
pub use dof_map::DofMap;
pub use line_search::{line_search, LineSearch, LineSearchOutcome};
pub use linsolve::{SparseDirectSolveError, SparseDirectSolver};
pub use newton::{newton_decrement, Newton, NewtonParams, NonLinearProblem};

/// Terminal state of a Newton run.
#[derive(Clone, Debug, PartialEq)]
pub enum Status {
    /// The Newton decrement dropped below the tolerance.
    Converged,
    /// The iteration cap was reached. This is the normal outcome of a single step solve.
    MaximumIterationsReached,
    /// Every trial step of the line search was rejected. The variables hold the last accepted
    /// iterate.
    StepRejectionExhausted,
    /// The reduced linear system could not be solved.
    LinearSolveError(SparseDirectSolveError),
    /// The starting configuration has an infinite energy.
    InfeasibleInitialPoint,
    /// There are no free variables.
    NothingToSolve,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolveResult {
    /// Number of completed Newton iterations.
    pub iterations: u32,
    /// Energy at the returned iterate.
    pub energy: f64,
    /// Newton decrement of the last computed direction.
    pub decrement: f64,
    /// Solve status.
    pub status: Status,
}

impl SolveResult {
    /// Whether the run was aborted without producing a usable iterate.
    pub fn is_failure(&self) -> bool {
        matches!(
            self.status,
            Status::LinearSolveError(_) | Status::InfeasibleInitialPoint
        )
    }
}

impl std::fmt::Display for SolveResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} after {} iterations (energy: {:.6e}, decrement: {:.3e})",
            self.status, self.iterations, self.energy, self.decrement
        )
    }
}
