mod basis;
mod core;
mod domain;
mod ffd;
mod lattice;
mod mesh;

pub use basis::{BASIS_WIDTH, basis_weights, basis_weights_batch, basis_weights_into};
pub use core::{BBox, Point3, Tolerance, Vec3};
pub use domain::{FfdDomain, NormalizedPoint};
pub use ffd::{
    BatchDomain, CornerMode, FfdBatch, FfdDiagnostics, FfdError, FfdOptions, FfdScene,
    deform_batch, deform_points, deform_scene,
};
pub use lattice::{
    CORNER_COUNT, ControlLattice, CornerDescription, CornerIndex, ExpandedCornerTable, TABLE_WIDTH,
};
pub use mesh::{GeomMesh, deform_mesh};
