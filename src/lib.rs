#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Lattice-driven free-form deformation of point sets.
//!
//! Eight corner offsets on a bounding box define a C² displacement field
//! through a 2×2×2 cubic B-spline lattice. [`geom`] holds the evaluator and
//! its value types; [`parse`] reads lattice descriptions.

pub mod geom;
pub mod parse;

pub use geom::{
    BBox, BatchDomain, ControlLattice, CornerIndex, CornerMode, FfdBatch, FfdDiagnostics,
    FfdDomain, FfdError, FfdOptions, FfdScene, GeomMesh, Point3, Vec3, deform_batch, deform_mesh,
    deform_points, deform_scene,
};
