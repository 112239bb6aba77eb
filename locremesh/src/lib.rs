//! Newton-type energy minimization for mesh parametrization and mass-spring dynamics.
//!
//! Both problems are expressed as a sum of small per-element energies over a flat vector of
//! vertex coordinates with an optional set of pinned vertices. The [`opt`] module minimizes such
//! sums with a projected Newton method, a sparse direct solver and a backtracking line search
//! that rejects inverted elements. The [`param`] and [`mass_spring`] modules build the two
//! concrete problems on top of it.

pub mod energy;
pub mod energy_models;
pub mod mass_spring;
mod matrix;
pub mod opt;
pub mod param;
pub mod project;

// TODO: This should be feature gated, but integration tests and benches need the mesh builders
// without passing extra features on the command line.
pub mod test_utils;

pub use energy::{ElementEnergy, EnergyValue, Feasibility, LocalDerivatives};
pub use mass_spring::{MassSpringSystem, SimParams, Spring};
pub use opt::{LineSearch, NewtonParams, SolveResult, Status};
pub use param::{parametrize, ParamParams, Parametrization};
pub use utils::index::Index;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Size mismatch in {what}: expected {expected}, got {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Invalid parameter: {name:?}")]
    InvalidParameter { name: String },
    #[error("Degenerate reference element detected: {:?}", .degens[0])]
    DegenerateReferenceElement { degens: Vec<usize> },
    #[error("Mesh has no boundary to embed")]
    NoBoundary,
    #[error("Error during the non-linear solve: {result}")]
    NLSolveError { result: SolveResult },
    #[error("Linear solve error: {source}")]
    LinearSolveError {
        #[from]
        source: opt::SparseDirectSolveError,
    },
    #[error("Configuration error: {source}")]
    ConfigError {
        #[from]
        source: ron::error::SpannedError,
    },
}

/// Infinity norm of the given values.
pub(crate) fn inf_norm<I>(iter: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    iter.into_iter().map(f64::abs).fold(0.0, f64::max)
}
