//! Assembly of the global energy, free gradient and projected free Hessian.

use rayon::prelude::*;
use sprs::CsMat;

use super::DofMap;
use crate::energy::*;
use crate::matrix::{MatrixElementIndex, SparsePattern};
use crate::project::{project_psd, DEFAULT_EIGENVALUE_FLOOR};

/// Accumulates element contributions over the free variables of a [`DofMap`].
///
/// Element Hessians are projected onto the positive semi-definite cone before they are scattered,
/// so the assembled Hessian is positive semi-definite. Only lower triangular triplets are stored;
/// the compressed matrix is mirrored by the cached [`SparsePattern`].
#[derive(Clone, Debug)]
pub struct Assembler {
    eigenvalue_floor: f64,
    energy: EnergyValue,
    gradient: Vec<f64>,
    triplets: Vec<MatrixElementIndex>,
    values: Vec<f64>,
    pattern: Option<SparsePattern>,
    num_projected: usize,
    #[cfg(test)]
    pattern_builds: usize,
}

impl Default for Assembler {
    fn default() -> Self {
        Assembler::new(DEFAULT_EIGENVALUE_FLOOR)
    }
}

impl Assembler {
    pub fn new(eigenvalue_floor: f64) -> Self {
        Assembler {
            eigenvalue_floor,
            energy: Feasibility::Feasible(0.0),
            gradient: Vec::new(),
            triplets: Vec::new(),
            values: Vec::new(),
            pattern: None,
            num_projected: 0,
            #[cfg(test)]
            pattern_builds: 0,
        }
    }

    /// Reset all accumulators for a system with `num_free` free variables.
    ///
    /// The cached sparsity pattern is kept.
    pub fn begin(&mut self, num_free: usize) {
        self.energy = Feasibility::Feasible(0.0);
        self.gradient.clear();
        self.gradient.resize(num_free, 0.0);
        self.triplets.clear();
        self.values.clear();
        self.num_projected = 0;
    }

    /// Evaluate and accumulate the given elements at the global configuration `x`.
    ///
    /// Elements are evaluated in parallel and scattered sequentially in element order, so the
    /// result is deterministic. Returns `Infeasible` as soon as any element is infeasible, in
    /// which case the accumulated energy is `Infeasible` as well.
    pub fn add_elements<E, const N: usize>(
        &mut self,
        elements: &[E],
        x: &[f64],
        dof_map: &DofMap,
    ) -> Feasibility<()>
    where
        E: ElementEnergy<N>,
    {
        debug_assert_eq!(self.gradient.len(), dof_map.num_free());
        let floor = self.eigenvalue_floor;
        let local: Vec<_> = elements
            .par_iter()
            .map(|e| {
                e.evaluate(&e.gather(x)).map(|mut d| {
                    let projected = project_psd(&mut d.hessian, floor);
                    (d, projected)
                })
            })
            .collect();

        for (elem, result) in elements.iter().zip(local.into_iter()) {
            let (d, projected) = match result {
                Feasibility::Feasible(d) => d,
                Feasibility::Infeasible => {
                    self.energy = Feasibility::Infeasible;
                    return Feasibility::Infeasible;
                }
            };
            if projected {
                self.num_projected += 1;
            }
            self.energy = self.energy + Feasibility::Feasible(d.energy);

            let free = elem.dofs().map(|dof| dof_map.free_index(dof));
            for (i, fi) in free.iter().enumerate() {
                let fi = match fi {
                    Some(fi) => *fi,
                    None => continue,
                };
                self.gradient[fi] += d.gradient[i];
                for (j, fj) in free.iter().enumerate() {
                    match fj {
                        Some(fj) if fi >= *fj => {
                            self.triplets.push((fi, *fj).into());
                            self.values.push(d.hessian[(i, j)]);
                        }
                        _ => {}
                    }
                }
            }
        }
        Feasibility::Feasible(())
    }

    /// Total energy accumulated since the last call to `begin`.
    #[inline]
    pub fn energy(&self) -> EnergyValue {
        self.energy
    }

    /// Gradient with respect to the free variables.
    #[inline]
    pub fn gradient(&self) -> &[f64] {
        &self.gradient
    }

    /// Number of element Hessians modified by the projection since the last call to `begin`.
    #[inline]
    pub fn num_projected(&self) -> usize {
        self.num_projected
    }

    /// Compress the accumulated Hessian triplets into a symmetric sparse matrix.
    ///
    /// The sparsity pattern is rebuilt only when the triplet indices change.
    pub fn hessian(&mut self) -> CsMat<f64> {
        let size = self.gradient.len();
        if self
            .pattern
            .as_ref()
            .map_or(false, |p| !p.matches(&self.triplets, size))
        {
            self.pattern = None;
        }
        #[cfg(test)]
        if self.pattern.is_none() {
            self.pattern_builds += 1;
        }
        let Assembler {
            triplets,
            values,
            pattern,
            ..
        } = self;
        pattern
            .get_or_insert_with(|| {
                log::trace!("Building Hessian sparsity pattern");
                SparsePattern::new(triplets, size)
            })
            .compress(values)
    }
}
