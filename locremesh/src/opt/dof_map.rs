use utils::Index;

use crate::Error;

/// Partition of the flat variable vector into fixed and free degrees of freedom.
///
/// Variables are stored as `dim` consecutive scalars per vertex. Fixing a vertex fixes all of its
/// scalars. Free variables are numbered consecutively in increasing global order, which defines
/// the row and column order of the reduced linear system.
#[derive(Clone, Debug, PartialEq)]
pub struct DofMap {
    dim: usize,
    fixed_vertices: Vec<bool>,
    /// Free index of each global variable.
    free_index: Vec<Index>,
    /// Global index of each free variable.
    free_dofs: Vec<usize>,
}

impl DofMap {
    /// Build the map for `num_vertices` vertices with `dim` scalars each.
    ///
    /// Duplicate entries in `fixed` are allowed. An out of range vertex index is an error.
    pub fn new(num_vertices: usize, dim: usize, fixed: &[usize]) -> Result<Self, Error> {
        let mut fixed_vertices = vec![false; num_vertices];
        for &v in fixed {
            if v >= num_vertices {
                return Err(Error::SizeMismatch {
                    what: "fixed vertex index",
                    expected: num_vertices,
                    actual: v,
                });
            }
            fixed_vertices[v] = true;
        }

        let mut free_index = vec![Index::INVALID; num_vertices * dim];
        let mut free_dofs = Vec::with_capacity(num_vertices * dim);
        for (v, _) in fixed_vertices.iter().enumerate().filter(|(_, &f)| !f) {
            for k in 0..dim {
                free_index[dim * v + k] = Index::new(free_dofs.len());
                free_dofs.push(dim * v + k);
            }
        }

        Ok(DofMap {
            dim,
            fixed_vertices,
            free_index,
            free_dofs,
        })
    }

    /// Number of scalars per vertex.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.fixed_vertices.len()
    }

    /// Total number of scalar variables.
    #[inline]
    pub fn num_dofs(&self) -> usize {
        self.free_index.len()
    }

    #[inline]
    pub fn num_free(&self) -> usize {
        self.free_dofs.len()
    }

    /// Position of the global variable `dof` in the reduced system, if it is free.
    #[inline]
    pub fn free_index(&self, dof: usize) -> Option<usize> {
        self.free_index[dof].into_option()
    }

    /// Global indices of all free variables in reduced order.
    #[inline]
    pub fn free_dofs(&self) -> &[usize] {
        &self.free_dofs
    }

    #[inline]
    pub fn is_fixed_vertex(&self, vtx: usize) -> bool {
        self.fixed_vertices[vtx]
    }

    pub fn fixed_vertices(&self) -> impl Iterator<Item = usize> + '_ {
        self.fixed_vertices
            .iter()
            .enumerate()
            .filter_map(|(v, &f)| if f { Some(v) } else { None })
    }

    /// Set `x = x0 + alpha * dir` on free variables only.
    ///
    /// `dir` is indexed by free variables. Fixed entries of `x` are left untouched.
    pub fn apply_step(&self, x: &mut [f64], x0: &[f64], dir: &[f64], alpha: f64) {
        debug_assert_eq!(dir.len(), self.num_free());
        for (&g, &d) in self.free_dofs.iter().zip(dir.iter()) {
            x[g] = x0[g] + alpha * d;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition() {
        let map = DofMap::new(4, 2, &[1, 3, 1]).unwrap();
        assert_eq!(map.num_dofs(), 8);
        assert_eq!(map.num_free(), 4);
        assert_eq!(map.free_dofs(), &[0, 1, 4, 5]);
        assert_eq!(map.free_index(4), Some(2));
        assert_eq!(map.free_index(2), None);
        assert_eq!(map.fixed_vertices().collect::<Vec<_>>(), vec![1, 3]);
        assert!(map.is_fixed_vertex(3));
        assert!(!map.is_fixed_vertex(0));
    }

    #[test]
    fn out_of_range() {
        match DofMap::new(3, 3, &[3]) {
            Err(Error::SizeMismatch { actual, .. }) => assert_eq!(actual, 3),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn step_skips_fixed() {
        let map = DofMap::new(2, 2, &[0]).unwrap();
        let x0 = [1.0, 2.0, 3.0, 4.0];
        let mut x = [-1.0; 4];
        map.apply_step(&mut x, &x0, &[1.0, -1.0], 0.5);
        assert_eq!(x, [-1.0, -1.0, 3.5, 3.5]);
    }
}
