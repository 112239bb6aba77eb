use approx::*;
pub use locremesh::test_utils::*;

pub fn init_logger() {
    let _ = env_logger::Builder::from_env("LOCREMESH_LOG")
        .is_test(true)
        .try_init();
}

#[allow(dead_code)]
fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        .sqrt()
}

/// Checks that the pairwise distances between planar coordinates match those between the
/// original 3D vertex positions, which means the two agree up to a rigid motion or reflection.
#[allow(dead_code)]
pub fn assert_isometric(uv: &[[f64; 2]], verts: &[[f64; 3]], tol: f64) {
    for i in 0..verts.len() {
        for j in i + 1..verts.len() {
            assert_relative_eq!(
                distance(&uv[i], &uv[j]),
                distance(&verts[i], &verts[j]),
                epsilon = tol
            );
        }
    }
}
