//! Low distortion parametrization of triangle meshes.
//!
//! A 3D triangle mesh is mapped to the plane by minimizing the symmetric Dirichlet energy of all
//! faces with respect to their own flattened rest shapes. The minimization is warm started from a
//! previous solution when one is given, and from a [`tutte_embedding`] otherwise.

mod tutte;

pub use tutte::tutte_embedding;

use serde::{Deserialize, Serialize};
use utils::signed_area;
use utils::topology::referenced_vertices;

use crate::energy::*;
use crate::energy_models::{flatten_reference_triangle, SymmetricDirichletEnergy};
use crate::opt::{Assembler, DofMap, LineSearch, Newton, NewtonParams, NonLinearProblem};
use crate::{Error, SolveResult};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamParams {
    /// Maximum number of Newton iterations.
    pub max_iterations: u32,
    /// Newton decrement tolerance.
    pub tolerance: f64,
    pub line_search: LineSearch,
    /// Correct a globally mirrored result when no vertices are pinned.
    pub check_orientation: bool,
}

impl Default for ParamParams {
    fn default() -> Self {
        ParamParams {
            max_iterations: 30,
            tolerance: 1e-4,
            line_search: LineSearch::default(),
            check_orientation: true,
        }
    }
}

impl ParamParams {
    /// Parse parameters from RON. Missing fields take their default values.
    pub fn from_ron_str(s: &str) -> Result<Self, Error> {
        Ok(ron::from_str(s)?)
    }

    pub fn newton_params(&self) -> NewtonParams {
        NewtonParams {
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
            line_search: self.line_search,
            ..Default::default()
        }
    }
}

/// Result of a parametrization run.
#[derive(Clone, Debug, PartialEq)]
pub struct Parametrization {
    /// One 2D coordinate per input vertex.
    pub uv: Vec<[f64; 2]>,
    /// Solver diagnostics. A failed solve still produces the last valid coordinates.
    pub result: SolveResult,
    /// Newton decrement at each iteration.
    pub convergence_history: Vec<f64>,
    /// Whether the result was mirrored to restore a positive orientation.
    pub flipped: bool,
}

/// Symmetric Dirichlet energy of a whole mesh over its 2D vertex coordinates.
pub struct DistortionProblem {
    dof_map: DofMap,
    elements: Vec<SymmetricDirichletEnergy>,
}

impl DistortionProblem {
    /// Build the per-face energies of the given mesh.
    ///
    /// Each face is weighted by the reciprocal of the number of faces.
    pub fn new(verts: &[[f64; 3]], faces: &[[usize; 3]], dof_map: DofMap) -> Result<Self, Error> {
        validate_faces(verts.len(), faces)?;
        let weight = 1.0 / faces.len().max(1) as f64;
        let mut degens = Vec::new();
        let mut elements = Vec::with_capacity(faces.len());
        for (i, &[a, b, c]) in faces.iter().enumerate() {
            match flatten_reference_triangle([verts[a], verts[b], verts[c]])
                .and_then(|ref_shape| SymmetricDirichletEnergy::new([a, b, c], ref_shape, weight))
            {
                Some(elem) => elements.push(elem),
                None => degens.push(i),
            }
        }
        if !degens.is_empty() {
            return Err(Error::DegenerateReferenceElement { degens });
        }
        Ok(DistortionProblem { dof_map, elements })
    }

    pub fn elements(&self) -> &[SymmetricDirichletEnergy] {
        &self.elements
    }
}

impl NonLinearProblem for DistortionProblem {
    fn dof_map(&self) -> &DofMap {
        &self.dof_map
    }
    fn energy(&self, x: &[f64]) -> EnergyValue {
        total_energy(&self.elements, x)
    }
    fn assemble(&self, x: &[f64], assembler: &mut Assembler) -> Feasibility<()> {
        assembler.add_elements(&self.elements, x, &self.dof_map)
    }
}

pub(crate) fn validate_faces(num_vertices: usize, faces: &[[usize; 3]]) -> Result<(), Error> {
    match faces.iter().flatten().find(|&&v| v >= num_vertices) {
        Some(&v) => Err(Error::SizeMismatch {
            what: "face vertex index",
            expected: num_vertices,
            actual: v,
        }),
        None => Ok(()),
    }
}

/// Whether every face has a strictly positive signed area.
pub fn is_positively_oriented(uv: &[[f64; 2]], faces: &[[usize; 3]]) -> bool {
    faces
        .iter()
        .all(|&[a, b, c]| signed_area(uv[a], uv[b], uv[c]) > 0.0)
}

/// Mirror the parametrization if the majority of faces are negatively oriented.
///
/// The symmetric Dirichlet energy is invariant under reflections, so a minimizer may be a mirror
/// image of the expected result. Only the second coordinate of vertices referenced by a face is
/// negated. Returns `true` if the coordinates were mirrored. Applying this twice is the same as
/// applying it once.
pub fn canonicalize_orientation(uv: &mut [[f64; 2]], faces: &[[usize; 3]]) -> bool {
    let (mut pos, mut neg) = (0usize, 0usize);
    for &[a, b, c] in faces.iter() {
        let area = signed_area(uv[a], uv[b], uv[c]);
        if area > 0.0 {
            pos += 1;
        } else if area < 0.0 {
            neg += 1;
        }
    }
    if neg <= pos {
        return false;
    }
    log::warn!("Parametrization was flipped, correcting");
    let referenced = referenced_vertices(uv.len(), faces);
    for (p, _) in uv.iter_mut().zip(referenced).filter(|(_, r)| *r) {
        p[1] = -p[1];
    }
    true
}

/// Map coordinates into `[0,1]²` axis by axis.
///
/// An axis whose span is below `1e-12` is treated as having unit span.
pub fn normalize_uv(uv: &mut [[f64; 2]]) {
    for axis in 0..2 {
        let (min, max) = uv.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p[axis]), hi.max(p[axis]))
        });
        if !min.is_finite() {
            return;
        }
        let span = if max - min < 1e-12 { 1.0 } else { max - min };
        for p in uv.iter_mut() {
            p[axis] = (p[axis] - min) / span;
        }
    }
}

/// Compute a low distortion parametrization of the mesh `(verts, faces)`.
///
/// `seed` is an optional previous solution with one coordinate per vertex. Vertices listed in
/// `fixed` keep their seed coordinates, as do vertices not referenced by any face. When no
/// vertex is pinned by the caller, the seed is brought into canonical orientation and replaced by
/// a Tutte embedding if it still contains inverted faces.
///
/// Invalid input is rejected before any iteration. Solver failures are reported in the returned
/// [`SolveResult`] together with the last valid coordinates.
pub fn parametrize(
    verts: &[[f64; 3]],
    faces: &[[usize; 3]],
    seed: Option<&[[f64; 2]]>,
    fixed: &[usize],
    params: &ParamParams,
) -> Result<Parametrization, Error> {
    let newton_params = params.newton_params();
    newton_params.validate()?;
    validate_faces(verts.len(), faces)?;
    if let Some(seed) = seed {
        if seed.len() != verts.len() {
            return Err(Error::SizeMismatch {
                what: "seed coordinates",
                expected: verts.len(),
                actual: seed.len(),
            });
        }
    }

    let pinned_by_caller = !fixed.is_empty();
    let referenced = referenced_vertices(verts.len(), faces);
    let all_fixed: Vec<usize> = fixed
        .iter()
        .cloned()
        .chain((0..verts.len()).filter(|&v| !referenced[v]))
        .collect();
    let dof_map = DofMap::new(verts.len(), 2, &all_fixed)?;
    let problem = DistortionProblem::new(verts, faces, dof_map)?;

    let mut uv = match seed {
        Some(seed) => {
            let mut uv = seed.to_vec();
            if !pinned_by_caller {
                if params.check_orientation {
                    canonicalize_orientation(&mut uv, faces);
                }
                if !is_positively_oriented(&uv, faces) {
                    log::warn!("Warm start has inverted faces, falling back to a Tutte embedding");
                    uv = tutte_embedding(verts, faces)?;
                }
            }
            uv
        }
        None => tutte_embedding(verts, faces)?,
    };

    let mut x: Vec<f64> = uv.iter().flat_map(|p| p.iter().cloned()).collect();
    let mut solver = Newton::new(problem, newton_params);
    let result = solver.solve_with(&mut x);
    if result.is_failure() {
        log::warn!("Parametrization failed: {}", result);
    }

    for (p, x) in uv.iter_mut().zip(x.chunks_exact(2)) {
        *p = [x[0], x[1]];
    }

    let flipped = params.check_orientation
        && !pinned_by_caller
        && canonicalize_orientation(&mut uv, faces);

    Ok(Parametrization {
        uv,
        result,
        convergence_history: solver.convergence_history().to_vec(),
        flipped,
    })
}
