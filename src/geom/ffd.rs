//! Free-form deformation with a 2×2×2 cubic B-spline lattice.
//!
//! Every point is normalised into the box, weighted per axis with the cubic
//! basis, and displaced by the tensor-product sum of the 64 expanded corner
//! table entries:
//!
//! ```text
//! delta = Σ_dw Σ_dv Σ_du Ww[dw] · Wv[dv] · Wu[du] · table[dw][dv][du]
//! ```
//!
//! The single-scene entry points are the batched path run with one scene.
//! Scenes never share a table or a box, so they can be evaluated in any order
//! (and in parallel with the `parallel` feature) with identical results.
//!
//! # Example
//!
//! ```ignore
//! use ffd_engine::geom::{BBox, ControlLattice, CornerIndex, FfdDomain, FfdOptions, Point3, Vec3, deform_points};
//!
//! let domain = FfdDomain::new(BBox::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0)))?;
//! let mut lattice = ControlLattice::zero();
//! lattice.set(CornerIndex::from_bits(true, true, true), Vec3::new(0.2, 0.0, 0.0));
//! let (moved, diag) = deform_points(&[[1.0, 1.0, 1.0]], &domain, &lattice, FfdOptions::default());
//! ```

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::basis::{BASIS_WIDTH, basis_weights_batch};
use super::domain::FfdDomain;
use super::lattice::{ControlLattice, CornerIndex, ExpandedCornerTable};
use super::{BBox, Point3, Tolerance, Vec3};

// ============================================================================
// Error types
// ============================================================================

/// Errors raised while building a scene. Evaluation itself cannot fail.
#[derive(Debug, thiserror::Error)]
pub enum FfdError {
    /// The box has a non-positive or non-finite extent on `axis`.
    #[error("invalid domain: box extent along {axis} is {extent}, expected a finite value > 0")]
    InvalidDomain { axis: char, extent: f64 },

    /// A corner description does not resolve to a unit-cube corner.
    #[error("invalid corner `{key}`: original {original:?} is not a ±0.5 unit-cube corner")]
    InvalidCorner { key: String, original: [f64; 3] },

    /// Two corner descriptions resolve to the same lattice corner.
    #[error("corner `{key}` resolves to {corner}, already set by `{previous}`")]
    DuplicateCorner {
        key: String,
        previous: String,
        corner: CornerIndex,
    },

    /// A deformation component is NaN or Inf.
    #[error("corner `{key}` has a non-finite deformation")]
    InvalidDeformation { key: String },

    /// Batch inputs disagree on the number of scenes.
    #[error("batch shape mismatch: {lattices} lattices, {point_sets} point sets, {domains} boxes")]
    SceneCountMismatch {
        lattices: usize,
        point_sets: usize,
        domains: usize,
    },

    /// The input mesh failed validation.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
}

// ============================================================================
// Options
// ============================================================================

/// How corner offsets become B-spline control values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CornerMode {
    /// Prefilter the corners so the field passes exactly through each
    /// corner offset at the matching box corner.
    #[default]
    Interpolating,
    /// Use the corner offsets directly as control values. The field is
    /// smoother but only approaches the offsets (5/6 per axis at a corner).
    Approximating,
}

/// Options for lattice deformation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FfdOptions {
    /// How corner offsets are turned into control values.
    pub corner_mode: CornerMode,
    /// Allowed distance of `original + 0.5` from 0 or 1 per axis when
    /// resolving corner descriptions.
    pub corner_tolerance: f64,
    /// Padding added on each side of a box derived from a point set.
    pub box_padding: f64,
}

impl FfdOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            corner_mode: CornerMode::Interpolating,
            corner_tolerance: Tolerance::LOOSE.eps,
            box_padding: Tolerance::ZERO_LENGTH.eps,
        }
    }

    #[must_use]
    pub const fn corner_mode(mut self, mode: CornerMode) -> Self {
        self.corner_mode = mode;
        self
    }

    #[must_use]
    pub const fn corner_tolerance(mut self, tolerance: f64) -> Self {
        self.corner_tolerance = tolerance;
        self
    }

    #[must_use]
    pub const fn box_padding(mut self, padding: f64) -> Self {
        self.box_padding = padding;
        self
    }
}

impl Default for FfdOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Per-scene statistics of an evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FfdDiagnostics {
    /// Number of points evaluated.
    pub point_count: usize,
    /// Points that lay outside the box and took the boundary value.
    pub clamped_point_count: usize,
    /// Smallest displacement length.
    pub min_displacement: f64,
    /// Largest displacement length.
    pub max_displacement: f64,
    /// Mean displacement length.
    pub avg_displacement: f64,
    /// Warnings generated during the operation.
    pub warnings: Vec<String>,
}

// ============================================================================
// Scenes
// ============================================================================

/// One evaluation: a box, a lattice and the points to move.
#[derive(Debug, Clone, Copy)]
pub struct FfdScene<'a> {
    pub domain: FfdDomain,
    pub lattice: ControlLattice,
    pub points: &'a [[f64; 3]],
}

impl<'a> FfdScene<'a> {
    #[must_use]
    pub const fn new(domain: FfdDomain, lattice: ControlLattice, points: &'a [[f64; 3]]) -> Self {
        Self {
            domain,
            lattice,
            points,
        }
    }
}

/// Boxes for a batch: one broadcast to every scene, or one per scene.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchDomain {
    Shared(FfdDomain),
    PerScene(Vec<FfdDomain>),
}

impl BatchDomain {
    /// # Errors
    /// [`FfdError::InvalidDomain`] if `bbox` is degenerate.
    pub fn shared(bbox: BBox) -> Result<Self, FfdError> {
        FfdDomain::new(bbox).map(Self::Shared)
    }

    /// # Errors
    /// [`FfdError::InvalidDomain`] for the first degenerate box.
    pub fn per_scene<I>(boxes: I) -> Result<Self, FfdError>
    where
        I: IntoIterator<Item = BBox>,
    {
        boxes
            .into_iter()
            .map(FfdDomain::new)
            .collect::<Result<Vec<_>, _>>()
            .map(Self::PerScene)
    }

    fn for_scene(&self, index: usize) -> FfdDomain {
        match self {
            Self::Shared(domain) => *domain,
            Self::PerScene(domains) => domains[index],
        }
    }
}

/// Independent scenes evaluated together.
///
/// Point sets may differ in length; the shape checks only concern the number
/// of scenes.
#[derive(Debug, Clone)]
pub struct FfdBatch<'a> {
    domain: BatchDomain,
    lattices: Vec<ControlLattice>,
    point_sets: Vec<&'a [[f64; 3]]>,
}

impl<'a> FfdBatch<'a> {
    /// # Errors
    /// [`FfdError::SceneCountMismatch`] when `lattices`, `point_sets` and a
    /// per-scene domain list do not all have the same length.
    pub fn new(
        domain: BatchDomain,
        lattices: Vec<ControlLattice>,
        point_sets: Vec<&'a [[f64; 3]]>,
    ) -> Result<Self, FfdError> {
        let domains = match &domain {
            BatchDomain::Shared(_) => lattices.len(),
            BatchDomain::PerScene(domains) => domains.len(),
        };
        if lattices.len() != point_sets.len() || domains != lattices.len() {
            return Err(FfdError::SceneCountMismatch {
                lattices: lattices.len(),
                point_sets: point_sets.len(),
                domains,
            });
        }
        Ok(Self {
            domain,
            lattices,
            point_sets,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lattices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lattices.is_empty()
    }

    /// Scene `index`, with a shared box broadcast.
    ///
    /// # Panics
    /// Panics if `index >= self.len()`.
    #[must_use]
    pub fn scene(&self, index: usize) -> FfdScene<'a> {
        FfdScene::new(
            self.domain.for_scene(index),
            self.lattices[index],
            self.point_sets[index],
        )
    }

    pub fn scenes(&self) -> impl Iterator<Item = FfdScene<'a>> + '_ {
        (0..self.len()).map(|index| self.scene(index))
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Deforms `points` inside `domain` with the given corner offsets.
///
/// Returns the moved points in input order, plus diagnostics.
#[must_use]
pub fn deform_points(
    points: &[[f64; 3]],
    domain: &FfdDomain,
    lattice: &ControlLattice,
    options: FfdOptions,
) -> (Vec<[f64; 3]>, FfdDiagnostics) {
    deform_scene(&FfdScene::new(*domain, *lattice, points), options)
}

/// Deforms a single scene.
#[must_use]
pub fn deform_scene(scene: &FfdScene<'_>, options: FfdOptions) -> (Vec<[f64; 3]>, FfdDiagnostics) {
    let prepared = [PreparedScene::new(scene, options)];
    evaluate_scenes(&prepared)
        .pop()
        .unwrap_or_default()
}

/// Deforms every scene of `batch`; output `i` belongs to scene `i`.
#[must_use]
pub fn deform_batch(batch: &FfdBatch<'_>, options: FfdOptions) -> Vec<(Vec<[f64; 3]>, FfdDiagnostics)> {
    log::debug!("deforming batch of {} scenes", batch.len());
    let prepared: Vec<PreparedScene<'_>> = batch
        .scenes()
        .map(|scene| PreparedScene::new(&scene, options))
        .collect();
    evaluate_scenes(&prepared)
}

/// A scene whose corner table is built and read-only from here on.
struct PreparedScene<'a> {
    domain: FfdDomain,
    table: ExpandedCornerTable,
    points: &'a [[f64; 3]],
}

impl<'a> PreparedScene<'a> {
    fn new(scene: &FfdScene<'a>, options: FfdOptions) -> Self {
        let control = match options.corner_mode {
            CornerMode::Interpolating => scene.lattice.interpolating(),
            CornerMode::Approximating => scene.lattice,
        };
        Self {
            domain: scene.domain,
            table: ExpandedCornerTable::from_lattice(&control),
            points: scene.points,
        }
    }
}

#[cfg(feature = "parallel")]
fn evaluate_scenes(scenes: &[PreparedScene<'_>]) -> Vec<(Vec<[f64; 3]>, FfdDiagnostics)> {
    scenes.par_iter().map(evaluate_scene).collect()
}

#[cfg(not(feature = "parallel"))]
fn evaluate_scenes(scenes: &[PreparedScene<'_>]) -> Vec<(Vec<[f64; 3]>, FfdDiagnostics)> {
    scenes.iter().map(evaluate_scene).collect()
}

fn evaluate_scene(scene: &PreparedScene<'_>) -> (Vec<[f64; 3]>, FfdDiagnostics) {
    let point_count = scene.points.len();
    log::trace!("evaluating scene with {point_count} points");

    let mut params: [Vec<f64>; 3] = std::array::from_fn(|_| Vec::with_capacity(point_count));
    let mut clamped_point_count = 0;
    let mut nan_point_count = 0;
    for p in scene.points {
        let normalized = scene.domain.normalize(Point3::from_array(*p));
        clamped_point_count += usize::from(normalized.clamped);
        nan_point_count += usize::from(p.iter().any(|c| c.is_nan()));
        for (axis, column) in params.iter_mut().enumerate() {
            column.push(normalized.span_parameter(axis));
        }
    }

    let wu = basis_weights_batch(&params[0]);
    let wv = basis_weights_batch(&params[1]);
    let ww = basis_weights_batch(&params[2]);

    let deltas = contract_all(&scene.table, &wu, &wv, &ww);

    let deformed: Vec<[f64; 3]> = scene
        .points
        .iter()
        .zip(&deltas)
        .map(|(p, delta)| Point3::from_array(*p).add_vec(*delta).to_array())
        .collect();

    let lengths: Vec<f64> = deltas.iter().map(|d| d.length()).collect();
    let (min_displacement, max_displacement, avg_displacement) = compute_displacement_stats(&lengths);

    let mut warnings = Vec::new();
    if clamped_point_count > 0 {
        log::debug!("{clamped_point_count} of {point_count} points lie outside the box and were clamped");
        warnings.push(format!(
            "{clamped_point_count} point(s) outside the lattice box take the boundary displacement"
        ));
    }
    if nan_point_count > 0 {
        log::warn!("{nan_point_count} of {point_count} points have NaN coordinates");
        warnings.push(format!(
            "{nan_point_count} point(s) have NaN coordinates and evaluate to NaN"
        ));
    }

    let diagnostics = FfdDiagnostics {
        point_count,
        clamped_point_count,
        min_displacement,
        max_displacement,
        avg_displacement,
        warnings,
    };
    (deformed, diagnostics)
}

type Weights = [f64; BASIS_WIDTH];

#[cfg(feature = "parallel")]
fn contract_all(table: &ExpandedCornerTable, wu: &[Weights], wv: &[Weights], ww: &[Weights]) -> Vec<Vec3> {
    (0..wu.len())
        .into_par_iter()
        .map(|i| contract(table, &wu[i], &wv[i], &ww[i]))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn contract_all(table: &ExpandedCornerTable, wu: &[Weights], wv: &[Weights], ww: &[Weights]) -> Vec<Vec3> {
    wu.iter()
        .zip(wv)
        .zip(ww)
        .map(|((u, v), w)| contract(table, u, v, w))
        .collect()
}

/// Full 64-term tensor-product sum for one point.
fn contract(table: &ExpandedCornerTable, wu: &Weights, wv: &Weights, ww: &Weights) -> Vec3 {
    let mut delta = Vec3::ZERO;
    for (plane, w_weight) in table.entries().iter().zip(ww) {
        for (row, v_weight) in plane.iter().zip(wv) {
            let wv_weight = w_weight * v_weight;
            for (entry, u_weight) in row.iter().zip(wu) {
                delta = delta.add_scaled(*entry, wv_weight * u_weight);
            }
        }
    }
    delta
}

#[allow(clippy::cast_precision_loss)]
fn compute_displacement_stats(displacements: &[f64]) -> (f64, f64, f64) {
    if displacements.is_empty() {
        return (0.0, 0.0, 0.0);
    }

    let mut min_d = f64::MAX;
    let mut max_d = f64::MIN;
    let mut sum = 0.0;

    for &d in displacements {
        min_d = min_d.min(d);
        max_d = max_d.max(d);
        sum += d;
    }

    (min_d, max_d, sum / displacements.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_domain() -> FfdDomain {
        FfdDomain::new(BBox::new(
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, 1.0, 1.0),
        ))
        .expect("valid box")
    }

    #[test]
    fn test_contract_matches_explicit_triple_sum() {
        let mut lattice = ControlLattice::zero();
        for corner in CornerIndex::ALL {
            let id = f64::from(corner.id());
            lattice.set(corner, Vec3::new(id, 1.0 - id, 0.5 * id));
        }
        let table = ExpandedCornerTable::from_lattice(&lattice);
        let wu = crate::geom::basis_weights(0.3);
        let wv = crate::geom::basis_weights(0.6);
        let ww = crate::geom::basis_weights(0.9);

        let mut expected = Vec3::ZERO;
        for dw in 0..4 {
            for dv in 0..4 {
                for du in 0..4 {
                    expected = expected + table.get(du, dv, dw) * (wu[du] * wv[dv] * ww[dw]);
                }
            }
        }
        let got = contract(&table, &wu, &wv, &ww);
        assert!((got - expected).length() < 1e-12);
    }

    #[test]
    fn test_deform_scene_keeps_order_and_size() {
        let points = [[0.0, 0.0, 0.0], [0.5, -0.5, 0.25], [2.0, 0.0, 0.0]];
        let (out, diag) = deform_points(
            &points,
            &cube_domain(),
            &ControlLattice::zero(),
            FfdOptions::default(),
        );
        assert_eq!(out, points.to_vec());
        assert_eq!(diag.point_count, 3);
        assert_eq!(diag.clamped_point_count, 1);
        assert_eq!(diag.warnings.len(), 1);
        assert_eq!(diag.max_displacement, 0.0);
    }

    #[test]
    fn test_nan_points_are_not_reported_as_clamped() {
        let points = [[f64::NAN, 0.5, 0.5], [0.0, 0.0, 0.0]];
        let (out, diag) = deform_points(
            &points,
            &cube_domain(),
            &ControlLattice::zero(),
            FfdOptions::default(),
        );
        assert!(out[0][0].is_nan());
        assert_eq!(out[1], [0.0, 0.0, 0.0]);
        assert_eq!(diag.clamped_point_count, 0);
        assert_eq!(diag.warnings.len(), 1);
        assert!(diag.warnings[0].contains("NaN"));
    }

    #[test]
    fn test_empty_point_set() {
        let (out, diag) = deform_points(
            &[],
            &cube_domain(),
            &ControlLattice::zero(),
            FfdOptions::default(),
        );
        assert!(out.is_empty());
        assert_eq!(diag, FfdDiagnostics::default());
    }

    #[test]
    fn test_batch_shape_checked() {
        let points = [[0.0, 0.0, 0.0]];
        let result = FfdBatch::new(
            BatchDomain::Shared(cube_domain()),
            vec![ControlLattice::zero(); 2],
            vec![&points[..]],
        );
        assert!(matches!(
            result,
            Err(FfdError::SceneCountMismatch {
                lattices: 2,
                point_sets: 1,
                ..
            })
        ));

        let result = FfdBatch::new(
            BatchDomain::PerScene(vec![cube_domain(); 3]),
            vec![ControlLattice::zero(); 2],
            vec![&points[..], &points[..]],
        );
        assert!(matches!(
            result,
            Err(FfdError::SceneCountMismatch { domains: 3, .. })
        ));
    }

    #[test]
    fn test_options_builder() {
        let options = FfdOptions::new()
            .corner_mode(CornerMode::Approximating)
            .corner_tolerance(1e-3)
            .box_padding(0.0);
        assert_eq!(options.corner_mode, CornerMode::Approximating);
        assert_eq!(options.corner_tolerance, 1e-3);
        assert_eq!(options.box_padding, 0.0);
        assert_eq!(FfdOptions::default().corner_mode, CornerMode::Interpolating);
    }
}
