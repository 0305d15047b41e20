//! Triangle meshes as vertex positions plus connectivity.
//!
//! Lattice deformation only moves vertices; `indices` is carried through
//! untouched so the output has the input's topology.

use super::ffd::{FfdDiagnostics, FfdError, FfdOptions, deform_points};
use super::domain::FfdDomain;
use super::lattice::{ControlLattice, CornerDescription};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeomMesh {
    pub positions: Vec<[f64; 3]>,
    pub indices: Vec<u32>,
}

impl GeomMesh {
    #[must_use]
    pub fn new(positions: Vec<[f64; 3]>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if any vertex position contains NaN or Inf values.
    #[must_use]
    pub fn has_invalid_vertices(&self) -> bool {
        self.positions
            .iter()
            .any(|p| !p[0].is_finite() || !p[1].is_finite() || !p[2].is_finite())
    }

    /// Returns true if all vertex indices are within bounds.
    #[must_use]
    pub fn has_valid_indices(&self) -> bool {
        let n = self.positions.len();
        self.indices
            .iter()
            .all(|&i| usize::try_from(i).is_ok_and(|i| i < n))
    }

    /// # Errors
    /// Describes the first failed check.
    pub fn validate(&self) -> Result<(), String> {
        if self.positions.is_empty() {
            return Err("mesh has no vertices".to_string());
        }
        if self.indices.len() % 3 != 0 {
            return Err("mesh indices are not a triangle list (len % 3 != 0)".to_string());
        }
        if self.has_invalid_vertices() {
            return Err("mesh has invalid vertex coordinates (NaN/Inf)".to_string());
        }
        if !self.has_valid_indices() {
            return Err("mesh has out-of-bounds vertex indices".to_string());
        }
        Ok(())
    }
}

/// Deforms a mesh with a lattice spanning its own bounding box.
///
/// The box is the vertex min/max padded by `options.box_padding` on each
/// side. Each description's deformation is a fraction of the box extent and
/// is scaled to absolute units before evaluation.
///
/// # Errors
/// - [`FfdError::InvalidMesh`] if the mesh fails validation.
/// - [`FfdError::InvalidDomain`] if the padded box is still degenerate.
/// - Any corner error from [`ControlLattice::from_descriptions`].
pub fn deform_mesh<'a, I>(
    mesh: &GeomMesh,
    descriptions: I,
    options: FfdOptions,
) -> Result<(GeomMesh, FfdDiagnostics), FfdError>
where
    I: IntoIterator<Item = (&'a str, &'a CornerDescription)>,
{
    mesh.validate().map_err(FfdError::InvalidMesh)?;

    let domain = FfdDomain::from_points(&mesh.positions, options.box_padding)?;
    let bbox = domain.bbox();
    log::info!(
        "mesh with {} vertices and {} triangles: box min {:?} max {:?} size {:?}",
        mesh.vertex_count(),
        mesh.triangle_count(),
        bbox.min.to_array(),
        bbox.max.to_array(),
        domain.extent().to_array()
    );

    let lattice =
        ControlLattice::from_descriptions(descriptions, domain.extent(), options.corner_tolerance)?;
    if lattice.is_zero() {
        log::warn!("all lattice corners have zero deformation; mesh is returned unchanged");
    }

    let (positions, diagnostics) = deform_points(&mesh.positions, &domain, &lattice, options);
    Ok((GeomMesh::new(positions, mesh.indices.clone()), diagnostics))
}
