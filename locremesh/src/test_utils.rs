//! Small meshes and spring systems used in tests and benchmarks.

use crate::mass_spring::{MassSpringSystem, SimParams, Spring};
use crate::Error;

pub type TriMesh = (Vec<[f64; 3]>, Vec<[usize; 3]>);

/// A single equilateral triangle with unit edges in the XY plane.
pub fn equilateral_triangle() -> TriMesh {
    let verts = vec![
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.5, 0.75_f64.sqrt(), 0.0],
    ];
    (verts, vec![[0, 1, 2]])
}

/// The unit square split into two triangles along the `0-2` diagonal.
pub fn unit_square() -> TriMesh {
    let verts = vec![
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
    ];
    (verts, vec![[0, 1, 2], [0, 2, 3]])
}

/// A regular grid of `rows x cols` vertices in the XY plane with counter-clockwise faces.
///
/// Vertices are numbered row by row with row `i` and column `j` at `(j, i) * spacing`.
pub fn grid_mesh(rows: usize, cols: usize, spacing: f64) -> TriMesh {
    bumpy_grid_mesh(rows, cols, spacing, 0.0)
}

/// Same as [`grid_mesh`] but displaced along Z by a smooth bump of the given amplitude.
pub fn bumpy_grid_mesh(rows: usize, cols: usize, spacing: f64, amplitude: f64) -> TriMesh {
    let mut verts = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        for j in 0..cols {
            let (x, y) = (j as f64 * spacing, i as f64 * spacing);
            let z = amplitude * (1.3 * x).sin() * (0.7 * y).cos();
            verts.push([x, y, z]);
        }
    }

    let mut faces = Vec::with_capacity(2 * rows.saturating_sub(1) * cols.saturating_sub(1));
    for i in 0..rows.saturating_sub(1) {
        for j in 0..cols.saturating_sub(1) {
            let a = i * cols + j;
            let b = a + 1;
            let c = a + cols + 1;
            let d = a + cols;
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }
    (verts, faces)
}

/// A regular hexagon fanned around a single center vertex with index 0.
pub fn hexagon_fan() -> TriMesh {
    let mut verts = vec![[0.0, 0.0, 0.0]];
    for k in 0..6 {
        let theta = k as f64 * std::f64::consts::FRAC_PI_3;
        verts.push([theta.cos(), theta.sin(), 0.0]);
    }
    let faces = (1..=6).map(|k| [0, k, k % 6 + 1]).collect();
    (verts, faces)
}

/// A closed tetrahedron with outward facing triangles.
pub fn tetrahedron() -> TriMesh {
    let verts = vec![
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ];
    let faces = vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
    (verts, faces)
}

/// Four unit masses on the corners of a unit square hanging from the top-left corner.
///
/// The square is connected by its four edges with springs of stiffness 10 at rest.
pub fn spring_square(params: SimParams) -> Result<MassSpringSystem, Error> {
    let positions = [[0.0, 0.0], [1.0, 0.0], [0.0, -1.0], [1.0, -1.0]];
    let springs = [[0, 1], [0, 2], [1, 3], [2, 3]]
        .iter()
        .map(|&vertices| Spring {
            vertices,
            rest_length: 1.0,
            stiffness: 10.0,
        })
        .collect();
    MassSpringSystem::new(&positions, &[1.0; 4], springs, &[0], params)
}
