/*!
 * This crate provides index and triangle mesh topology utilities shared by the minimization
 * engine.
 */

pub mod index;
pub mod topology;

pub use crate::index::Index;

/// Signed area of the 2D triangle `(a, b, c)`.
///
/// The area is positive when the vertices are ordered counter-clockwise.
#[inline]
pub fn signed_area(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    0.5 * ((b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]))
}
