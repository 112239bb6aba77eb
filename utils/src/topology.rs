//! Topology queries on indexed triangle meshes.
//!
//! Triangles are given as `[usize; 3]` vertex index triples and are assumed to be consistently
//! oriented.

use std::collections::{BTreeMap, HashSet};

/// Mark the vertices that are referenced by at least one face.
pub fn referenced_vertices(num_vertices: usize, faces: &[[usize; 3]]) -> Vec<bool> {
    let mut referenced = vec![false; num_vertices];
    for face in faces.iter() {
        for &vtx in face.iter() {
            referenced[vtx] = true;
        }
    }
    referenced
}

/// Compute the sorted one-ring neighbourhood of every vertex.
pub fn vertex_neighbors(num_vertices: usize, faces: &[[usize; 3]]) -> Vec<Vec<usize>> {
    let mut neighbors = vec![Vec::new(); num_vertices];
    for face in faces.iter() {
        for i in 0..3 {
            let vtx = face[i];
            neighbors[vtx].push(face[(i + 1) % 3]);
            neighbors[vtx].push(face[(i + 2) % 3]);
        }
    }
    for nbrs in neighbors.iter_mut() {
        nbrs.sort_unstable();
        nbrs.dedup();
    }
    neighbors
}

/// Extract all boundary loops of the mesh.
///
/// A directed face edge `(i, j)` is on the boundary if no face contains the opposite edge
/// `(j, i)`. Each loop is traversed in the direction of the face orientation, so for a
/// counter-clockwise oriented planar mesh the loops run counter-clockwise. Loops are returned in
/// order of their smallest starting vertex.
pub fn boundary_loops(faces: &[[usize; 3]]) -> Vec<Vec<usize>> {
    let edges: HashSet<(usize, usize)> = faces
        .iter()
        .flat_map(|f| (0..3).map(move |i| (f[i], f[(i + 1) % 3])))
        .collect();

    // Outgoing boundary edges per vertex.
    let mut next: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for face in faces.iter() {
        for i in 0..3 {
            let (a, b) = (face[i], face[(i + 1) % 3]);
            if !edges.contains(&(b, a)) {
                next.entry(a).or_default().push(b);
            }
        }
    }

    let mut loops = Vec::new();
    while let Some((&start, _)) = next.iter().find(|(_, out)| !out.is_empty()) {
        let mut boundary = vec![start];
        let mut cur = start;
        loop {
            let succ = match next.get_mut(&cur).and_then(|out| out.pop()) {
                Some(succ) => succ,
                None => {
                    log::debug!("Open boundary chain at vertex {}", cur);
                    break;
                }
            };
            if succ == start {
                break;
            }
            boundary.push(succ);
            cur = succ;
        }
        loops.push(boundary);
    }
    loops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<[usize; 3]> {
        // 3 --- 2
        // |   / |
        // | /   |
        // 0 --- 1
        vec![[0, 1, 2], [0, 2, 3]]
    }

    #[test]
    fn square_boundary() {
        let loops = boundary_loops(&unit_square());
        assert_eq!(loops, vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn closed_mesh_has_no_boundary() {
        let tet = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]];
        assert!(boundary_loops(&tet).is_empty());
    }

    #[test]
    fn two_components() {
        let faces = vec![[0, 1, 2], [3, 4, 5]];
        let loops = boundary_loops(&faces);
        assert_eq!(loops.len(), 2);
        assert_eq!(loops[0].len(), 3);
        assert_eq!(loops[1].len(), 3);
    }

    #[test]
    fn neighbors() {
        let nbrs = vertex_neighbors(4, &unit_square());
        assert_eq!(nbrs[0], vec![1, 2, 3]);
        assert_eq!(nbrs[1], vec![0, 2]);
        assert_eq!(nbrs[2], vec![0, 1, 3]);
        assert_eq!(nbrs[3], vec![0, 2]);
    }

    #[test]
    fn referenced() {
        let faces = vec![[0, 1, 3]];
        assert_eq!(referenced_vertices(4, &faces), vec![true, true, false, true]);
    }
}
