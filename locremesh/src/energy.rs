/*!
 * Per-element energy interface.
 *
 * An element reads a small fixed number `N` of scalar degrees of freedom from the global variable
 * vector and provides its energy along with the local gradient and Hessian. The minimizer only
 * depends on this contract, not on how the derivatives are produced.
 *
 * Configurations that are not admissible (for instance inverted triangles) are reported as
 * `Feasibility::Infeasible` instead of an infinite energy, which keeps downstream arithmetic free
 * of infinities and NaNs.
 */

use std::iter::Sum;
use std::ops::Add;

use na::{SMatrix, SVector};
use rayon::prelude::*;

/// A value that only exists for admissible configurations.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Feasibility<T> {
    Feasible(T),
    Infeasible,
}

/// Energy of a configuration.
pub type EnergyValue = Feasibility<f64>;

impl<T> Feasibility<T> {
    #[inline]
    pub fn is_feasible(&self) -> bool {
        matches!(self, Feasibility::Feasible(_))
    }

    /// Convert into an `Option`, discarding the infeasibility tag.
    #[inline]
    pub fn feasible(self) -> Option<T> {
        match self {
            Feasibility::Feasible(t) => Some(t),
            Feasibility::Infeasible => None,
        }
    }

    #[inline]
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Feasibility<U> {
        match self {
            Feasibility::Feasible(t) => Feasibility::Feasible(f(t)),
            Feasibility::Infeasible => Feasibility::Infeasible,
        }
    }
}

impl<T> From<Option<T>> for Feasibility<T> {
    #[inline]
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Feasibility::Infeasible, Feasibility::Feasible)
    }
}

/// Infeasibility is absorbing: the sum of energies is feasible only if every term is.
impl Add for EnergyValue {
    type Output = EnergyValue;

    #[inline]
    fn add(self, rhs: EnergyValue) -> EnergyValue {
        match (self, rhs) {
            (Feasibility::Feasible(a), Feasibility::Feasible(b)) => Feasibility::Feasible(a + b),
            _ => Feasibility::Infeasible,
        }
    }
}

impl Sum for EnergyValue {
    fn sum<I: Iterator<Item = EnergyValue>>(iter: I) -> EnergyValue {
        let mut total = 0.0;
        for e in iter {
            match e {
                Feasibility::Feasible(e) => total += e,
                Feasibility::Infeasible => return Feasibility::Infeasible,
            }
        }
        Feasibility::Feasible(total)
    }
}

/// Energy, gradient and Hessian of a single element with respect to its `N` local variables.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalDerivatives<const N: usize> {
    pub energy: f64,
    pub gradient: SVector<f64, N>,
    pub hessian: SMatrix<f64, N, N>,
}

/// An energy term depending on `N` scalar degrees of freedom of the global variable vector.
pub trait ElementEnergy<const N: usize>: Sync {
    /// Global variable indices read by this element, in local order.
    fn dofs(&self) -> [usize; N];

    /// Energy of the element at the given local configuration.
    fn energy(&self, x: &SVector<f64, N>) -> EnergyValue;

    /// Energy together with its first and second derivatives.
    fn evaluate(&self, x: &SVector<f64, N>) -> Feasibility<LocalDerivatives<N>>;

    /// Gather the local variables of this element from the global vector.
    #[inline]
    fn gather(&self, x: &[f64]) -> SVector<f64, N> {
        let dofs = self.dofs();
        SVector::from_fn(|i, _| x[dofs[i]])
    }
}

/// Sum the energies of all given elements at the global configuration `x`.
///
/// Elements are evaluated in parallel, but the sum is accumulated in element order so the result
/// does not depend on thread scheduling.
pub fn total_energy<E, const N: usize>(elements: &[E], x: &[f64]) -> EnergyValue
where
    E: ElementEnergy<N>,
{
    elements
        .par_iter()
        .map(|e| e.energy(&e.gather(x)))
        .collect::<Vec<_>>()
        .into_iter()
        .sum()
}
