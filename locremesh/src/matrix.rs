//! This module provides the sparse matrix structures used to assemble the global Hessian from
//! per-element triplets.

use sprs::CsMat;
use utils::Index;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatrixElementIndex {
    pub row: usize,
    pub col: usize,
}

impl From<(usize, usize)> for MatrixElementIndex {
    #[inline]
    fn from((row, col): (usize, usize)) -> Self {
        MatrixElementIndex { row, col }
    }
}

/// Compressed sparsity pattern of a symmetric matrix assembled from lower triangular triplets.
///
/// Each triplet `(row, col)` with `row >= col` is mapped to its position in the compressed
/// storage, and off-diagonal triplets are also mapped to the mirrored `(col, row)` position. The
/// pattern only depends on triplet indices, so it can be reused as long as the sequence of
/// triplet indices is unchanged, while values are accumulated from scratch on every call to
/// [`SparsePattern::compress`].
#[derive(Clone, Debug)]
pub struct SparsePattern {
    size: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    /// Triplet indices this pattern was built from.
    triplets: Vec<MatrixElementIndex>,
    /// Position of each triplet in the lower triangle (including the diagonal).
    lower: Vec<Index>,
    /// Position of each off-diagonal triplet in the upper triangle.
    upper: Vec<Index>,
}

impl SparsePattern {
    /// Build the compressed pattern of a `size x size` symmetric matrix.
    pub fn new(triplets: &[MatrixElementIndex], size: usize) -> Self {
        let nnz = triplets.len();

        // Expanded entries including the mirrored upper triangle, tagged with their triplet.
        let mut entries = Vec::with_capacity(2 * nnz);
        for (t, &MatrixElementIndex { row, col }) in triplets.iter().enumerate() {
            assert!(row < size && col < size, "Triplet out of bounds");
            debug_assert!(row >= col, "Expected lower triangular triplets");
            entries.push((row, col, t));
            if row != col {
                entries.push((col, row, t));
            }
        }
        entries.sort_unstable();

        let mut indptr = vec![0; size + 1];
        let mut indices = Vec::with_capacity(entries.len());
        let mut lower = vec![Index::INVALID; nnz];
        let mut upper = vec![Index::INVALID; nnz];

        let mut last = None;
        for &(row, col, t) in entries.iter() {
            if last != Some((row, col)) {
                indices.push(col);
                indptr[row + 1] += 1;
                last = Some((row, col));
            }
            let pos = Index::new(indices.len() - 1);
            if row >= col {
                lower[t] = pos;
            } else {
                upper[t] = pos;
            }
        }

        for i in 0..size {
            indptr[i + 1] += indptr[i];
        }

        SparsePattern {
            size,
            indptr,
            indices,
            triplets: triplets.to_vec(),
            lower,
            upper,
        }
    }

    /// Check whether this pattern was built from the given triplet indices.
    pub fn matches(&self, triplets: &[MatrixElementIndex], size: usize) -> bool {
        self.size == size && self.triplets == triplets
    }

    /// Accumulate triplet values into a compressed symmetric matrix.
    ///
    /// Entries `(i, j)` and `(j, i)` accumulate the same values in the same order, so the result
    /// is exactly symmetric.
    pub fn compress(&self, values: &[f64]) -> CsMat<f64> {
        assert_eq!(values.len(), self.lower.len());
        let mut data = vec![0.0; self.indices.len()];
        for ((&lower, &upper), &val) in self.lower.iter().zip(self.upper.iter()).zip(values.iter())
        {
            if let Some(pos) = lower.into_option() {
                data[pos] += val;
            }
            if let Some(pos) = upper.into_option() {
                data[pos] += val;
            }
        }
        CsMat::new(
            (self.size, self.size),
            self.indptr.clone(),
            self.indices.clone(),
            data,
        )
    }
}
