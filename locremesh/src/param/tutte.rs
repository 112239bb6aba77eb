//! Tutte embedding used to seed a parametrization when no previous solution is available.

use sprs::{CsMat, TriMat};
use utils::topology::{boundary_loops, referenced_vertices, vertex_neighbors};

use super::validate_faces;
use crate::opt::SparseDirectSolver;
use crate::Error;

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}

/// Compute a Tutte embedding of the given triangle mesh into the unit disk.
///
/// The longest boundary loop is mapped onto the unit circle, spacing vertices by the arc length
/// of the 3D boundary. Every other referenced vertex is placed at the average of its neighbours,
/// which amounts to solving a uniform graph Laplacian system. Vertices not referenced by any face
/// are placed at the origin.
pub fn tutte_embedding(verts: &[[f64; 3]], faces: &[[usize; 3]]) -> Result<Vec<[f64; 2]>, Error> {
    validate_faces(verts.len(), faces)?;

    let loop_length = |l: &[usize]| -> f64 {
        (0..l.len())
            .map(|i| distance(verts[l[i]], verts[l[(i + 1) % l.len()]]))
            .sum()
    };

    let boundary = boundary_loops(faces)
        .into_iter()
        .map(|l| {
            let len = loop_length(&l);
            (l, len)
        })
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(l, _)| l)
        .ok_or(Error::NoBoundary)?;
    let total_length = loop_length(&boundary);

    let mut uv = vec![[0.0; 2]; verts.len()];
    let mut pinned = referenced_vertices(verts.len(), faces)
        .into_iter()
        .map(|r| !r)
        .collect::<Vec<_>>();

    let mut arc_length = 0.0;
    for (i, &vtx) in boundary.iter().enumerate() {
        let theta = if total_length > 0.0 {
            2.0 * std::f64::consts::PI * arc_length / total_length
        } else {
            2.0 * std::f64::consts::PI * i as f64 / boundary.len() as f64
        };
        uv[vtx] = [theta.cos(), theta.sin()];
        pinned[vtx] = true;
        arc_length += distance(verts[vtx], verts[boundary[(i + 1) % boundary.len()]]);
    }

    // Number the interior vertices.
    let mut interior_index = vec![None; verts.len()];
    let mut interior = Vec::new();
    for (vtx, _) in pinned.iter().enumerate().filter(|(_, &p)| !p) {
        interior_index[vtx] = Some(interior.len());
        interior.push(vtx);
    }

    if interior.is_empty() {
        return Ok(uv);
    }

    let neighbors = vertex_neighbors(verts.len(), faces);
    let n = interior.len();
    let mut laplacian = TriMat::new((n, n));
    let mut rhs_u = vec![0.0; n];
    let mut rhs_v = vec![0.0; n];
    for (row, &vtx) in interior.iter().enumerate() {
        laplacian.add_triplet(row, row, neighbors[vtx].len() as f64);
        for &nbr in neighbors[vtx].iter() {
            match interior_index[nbr] {
                Some(col) => laplacian.add_triplet(row, col, -1.0),
                None => {
                    rhs_u[row] += uv[nbr][0];
                    rhs_v[row] += uv[nbr][1];
                }
            }
        }
    }
    let laplacian: CsMat<f64> = laplacian.to_csr();

    let sol = SparseDirectSolver::default().solve_many(&laplacian, &[&rhs_u[..], &rhs_v[..]])?;
    for (row, &vtx) in interior.iter().enumerate() {
        uv[vtx] = [sol[0][row], sol[1][row]];
    }

    log::debug!(
        "Tutte embedding with {} boundary and {} interior vertices",
        boundary.len(),
        interior.len()
    );
    Ok(uv)
}
