//! Box-relative parameterisation of points.
//!
//! Points outside the box are projected onto the nearest face, edge or
//! corner before evaluation, so their displacement is the boundary value and
//! never an extrapolation. This keeps the field bounded by construction.

use super::ffd::FfdError;
use super::{BBox, Point3, Vec3};

/// Axis labels used in error messages.
const AXIS_NAMES: [char; 3] = ['x', 'y', 'z'];

/// A bounding box accepted for evaluation: finite, with `max > min` on every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FfdDomain {
    bbox: BBox,
    extent: Vec3,
}

impl FfdDomain {
    /// Validates `bbox` as a normalization domain.
    ///
    /// # Errors
    /// [`FfdError::InvalidDomain`] when any axis has a non-positive or
    /// non-finite extent, or a bound is not finite.
    pub fn new(bbox: BBox) -> Result<Self, FfdError> {
        let extent = bbox.size();
        for (axis, name) in AXIS_NAMES.iter().enumerate() {
            let lo = bbox.min.to_vec3().axis(axis);
            let hi = bbox.max.to_vec3().axis(axis);
            let size = extent.axis(axis);
            if !lo.is_finite() || !hi.is_finite() || !size.is_finite() || size <= 0.0 {
                return Err(FfdError::InvalidDomain {
                    axis: *name,
                    extent: size,
                });
            }
        }
        Ok(Self { bbox, extent })
    }

    /// Box around `points`, padded by `padding` on each side.
    ///
    /// # Errors
    /// [`FfdError::InvalidDomain`] for an empty slice, or when the padded box
    /// is still degenerate (e.g. `padding == 0` on a flat point set).
    pub fn from_points(points: &[[f64; 3]], padding: f64) -> Result<Self, FfdError> {
        let bbox = BBox::from_points(points).ok_or(FfdError::InvalidDomain {
            axis: AXIS_NAMES[0],
            extent: 0.0,
        })?;
        Self::new(bbox.expand_by(padding))
    }

    #[must_use]
    pub const fn bbox(&self) -> BBox {
        self.bbox
    }

    /// `max - min` per axis; strictly positive.
    #[must_use]
    pub const fn extent(&self) -> Vec3 {
        self.extent
    }

    /// Maps `p` to clamped box coordinates and splits each axis into cell
    /// index and fractional remainder.
    #[must_use]
    pub fn normalize(&self, p: Point3) -> NormalizedPoint {
        let raw = p.sub_point(self.bbox.min).div_elem(self.extent);
        let mut cell = [0u8; 3];
        let mut frac = [0.0; 3];
        let mut clamped = false;
        for axis in 0..3 {
            let value = raw.axis(axis);
            let u = value.clamp(0.0, 1.0);
            clamped |= !value.is_nan() && u != value;
            let floor = u.floor();
            cell[axis] = u8::from(floor >= 1.0);
            frac[axis] = u - floor;
        }
        NormalizedPoint {
            cell,
            frac,
            clamped,
        }
    }
}

impl TryFrom<BBox> for FfdDomain {
    type Error = FfdError;

    fn try_from(bbox: BBox) -> Result<Self, Self::Error> {
        Self::new(bbox)
    }
}

/// A point in box-relative coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedPoint {
    /// `floor(u)` per axis; 1 only on the max face.
    pub cell: [u8; 3],
    /// `u - floor(u)` per axis, in `[0, 1)`.
    pub frac: [f64; 3],
    /// Whether any axis was pulled back into the box. NaN axes are never
    /// counted as clamped.
    pub clamped: bool,
}

impl NormalizedPoint {
    /// Basis parameter along `axis`.
    ///
    /// There is a single cell, closed on both ends, so the max face
    /// (`cell == 1`, `frac == 0`) evaluates at `t = 1` of that cell.
    #[must_use]
    pub fn span_parameter(&self, axis: usize) -> f64 {
        self.frac[axis] + f64::from(self.cell[axis])
    }

    /// Span parameters for all three axes.
    #[must_use]
    pub fn span_parameters(&self) -> [f64; 3] {
        [
            self.span_parameter(0),
            self.span_parameter(1),
            self.span_parameter(2),
        ]
    }
}
