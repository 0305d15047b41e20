//! The 2×2×2 control lattice and its 4×4×4 expansion.
//!
//! A [`ControlLattice`] holds one displacement per corner of the unit cube.
//! The cubic basis needs four control values per axis around the single
//! cell, so [`ExpandedCornerTable`] replicates the boundary corners outward:
//! logical index `-1` repeats corner `0` and logical index `2` repeats
//! corner `1`.

use serde::{Deserialize, Serialize};

use super::Vec3;
use super::ffd::FfdError;

/// Number of corners in the control lattice.
pub const CORNER_COUNT: usize = 8;

/// Entries per axis in the expanded table (logical indices `-1..=2`).
pub const TABLE_WIDTH: usize = 4;

/// A corner `(i, j, k)` of the unit cube with each component 0 or 1.
///
/// The 3-bit id packs `i` into bit 0, `j` into bit 1 and `k` into bit 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CornerIndex {
    id: u8,
}

impl CornerIndex {
    /// All corners in id order.
    pub const ALL: [Self; CORNER_COUNT] = [
        Self { id: 0 },
        Self { id: 1 },
        Self { id: 2 },
        Self { id: 3 },
        Self { id: 4 },
        Self { id: 5 },
        Self { id: 6 },
        Self { id: 7 },
    ];

    /// Corner from its three axis indices. `None` unless each is 0 or 1.
    #[must_use]
    pub const fn new(i: u8, j: u8, k: u8) -> Option<Self> {
        if i > 1 || j > 1 || k > 1 {
            return None;
        }
        Some(Self {
            id: i | (j << 1) | (k << 2),
        })
    }

    /// Corner selecting the max side on each axis where the flag is set.
    #[must_use]
    pub const fn from_bits(i: bool, j: bool, k: bool) -> Self {
        Self {
            id: (i as u8) | ((j as u8) << 1) | ((k as u8) << 2),
        }
    }

    /// Corner from its 3-bit id. `None` for ids above 7.
    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        if id < CORNER_COUNT as u8 {
            Some(Self { id })
        } else {
            None
        }
    }

    #[must_use]
    pub const fn id(self) -> u8 {
        self.id
    }

    /// `(i, j, k)` with each component 0 or 1.
    #[must_use]
    pub const fn ijk(self) -> (u8, u8, u8) {
        (self.id & 1, (self.id >> 1) & 1, (self.id >> 2) & 1)
    }

    /// Resolves a corner given in centered unit-cube coordinates (`±0.5` per
    /// axis) by rounding `original + 0.5` on each axis.
    ///
    /// Every axis must land within `tolerance` of 0 or 1; anything else
    /// returns `None` rather than truncating into a neighbouring slot.
    #[must_use]
    pub fn from_original(original: [f64; 3], tolerance: f64) -> Option<Self> {
        let mut bits = [false; 3];
        for (bit, coord) in bits.iter_mut().zip(original) {
            let shifted = coord + 0.5;
            if !shifted.is_finite() {
                return None;
            }
            let rounded = shifted.round();
            if (shifted - rounded).abs() > tolerance {
                return None;
            }
            *bit = if rounded == 0.0 {
                false
            } else if rounded == 1.0 {
                true
            } else {
                return None;
            };
        }
        Some(Self::from_bits(bits[0], bits[1], bits[2]))
    }
}

impl std::fmt::Display for CornerIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (i, j, k) = self.ijk();
        write!(f, "({i}, {j}, {k})")
    }
}

/// One corner entry of a lattice description.
///
/// `original` is the corner position in a unit cube centred on the origin;
/// `deformation` is the corner offset as a fraction of the box extent per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerDescription {
    pub original: [f64; 3],
    pub deformation: [f64; 3],
}

impl CornerDescription {
    #[must_use]
    pub const fn new(original: [f64; 3], deformation: [f64; 3]) -> Self {
        Self {
            original,
            deformation,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ControlLattice
// ─────────────────────────────────────────────────────────────────────────────

/// Eight corner displacements in absolute units. Unset corners are zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlLattice {
    offsets: [Vec3; CORNER_COUNT],
}

impl ControlLattice {
    /// All corners at zero displacement (identity deformation).
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            offsets: [Vec3::ZERO; CORNER_COUNT],
        }
    }

    /// Offsets indexed by corner id.
    #[must_use]
    pub const fn from_offsets(offsets: [Vec3; CORNER_COUNT]) -> Self {
        Self { offsets }
    }

    /// Builds a lattice from keyed corner descriptions.
    ///
    /// Each deformation is scaled component-wise by `extent` (the box size)
    /// before it is stored. Corners that no description names stay at zero.
    ///
    /// # Errors
    /// - [`FfdError::InvalidCorner`] if `original` does not round to a corner
    ///   within `tolerance`.
    /// - [`FfdError::DuplicateCorner`] if two entries name the same corner.
    /// - [`FfdError::InvalidDeformation`] for NaN/Inf deformation components.
    pub fn from_descriptions<'a, I>(
        descriptions: I,
        extent: Vec3,
        tolerance: f64,
    ) -> Result<Self, FfdError>
    where
        I: IntoIterator<Item = (&'a str, &'a CornerDescription)>,
    {
        let mut lattice = Self::zero();
        let mut seen: [Option<&str>; CORNER_COUNT] = [None; CORNER_COUNT];

        for (key, description) in descriptions {
            let corner = CornerIndex::from_original(description.original, tolerance).ok_or_else(
                || FfdError::InvalidCorner {
                    key: key.to_owned(),
                    original: description.original,
                },
            )?;

            let slot = &mut seen[usize::from(corner.id())];
            if let Some(previous) = slot {
                return Err(FfdError::DuplicateCorner {
                    key: key.to_owned(),
                    previous: (*previous).to_owned(),
                    corner,
                });
            }
            *slot = Some(key);

            let deformation = Vec3::from_array(description.deformation);
            if !deformation.is_finite() {
                return Err(FfdError::InvalidDeformation {
                    key: key.to_owned(),
                });
            }
            let offset = deformation.mul_elem(extent);
            log::info!("corner {corner} (key {key}): offset {:?}", offset.to_array());
            lattice.set(corner, offset);
        }

        Ok(lattice)
    }

    #[must_use]
    pub const fn get(&self, corner: CornerIndex) -> Vec3 {
        self.offsets[corner.id as usize]
    }

    pub fn set(&mut self, corner: CornerIndex, offset: Vec3) {
        self.offsets[usize::from(corner.id)] = offset;
    }

    /// Offsets indexed by corner id.
    #[must_use]
    pub const fn offsets(&self) -> &[Vec3; CORNER_COUNT] {
        &self.offsets
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.offsets.iter().all(|o| *o == Vec3::ZERO)
    }

    /// Control values whose B-spline field passes through `self` at the corners.
    ///
    /// With boundary replication the field on one axis reaches
    /// `(5a + b) / 6` at `t = 0` and `(a + 5b) / 6` at `t = 1`. Inverting that
    /// 2×2 system gives `a = (5c0 - c1) / 4` and `b = (5c1 - c0) / 4`, applied
    /// once per axis.
    #[must_use]
    pub fn interpolating(&self) -> Self {
        let mut offsets = self.offsets;
        for bit in [1u8, 2, 4] {
            for id in 0..CORNER_COUNT as u8 {
                if id & bit != 0 {
                    continue;
                }
                let lo_slot = usize::from(id);
                let hi_slot = usize::from(id | bit);
                let lo = offsets[lo_slot];
                let hi = offsets[hi_slot];
                offsets[lo_slot] = (lo * 5.0 - hi) * 0.25;
                offsets[hi_slot] = (hi * 5.0 - lo) * 0.25;
            }
        }
        Self { offsets }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ExpandedCornerTable
// ─────────────────────────────────────────────────────────────────────────────

/// 4×4×4 control displacements indexed `[w][v][u]`, storage index `d` being
/// logical index `d - 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpandedCornerTable {
    entries: [[[Vec3; TABLE_WIDTH]; TABLE_WIDTH]; TABLE_WIDTH],
}

impl ExpandedCornerTable {
    #[must_use]
    pub fn from_lattice(lattice: &ControlLattice) -> Self {
        let mut entries = [[[Vec3::ZERO; TABLE_WIDTH]; TABLE_WIDTH]; TABLE_WIDTH];
        for (dw, plane) in entries.iter_mut().enumerate() {
            for (dv, row) in plane.iter_mut().enumerate() {
                for (du, entry) in row.iter_mut().enumerate() {
                    let corner = CornerIndex::from_bits(
                        replicated_corner(du),
                        replicated_corner(dv),
                        replicated_corner(dw),
                    );
                    *entry = lattice.get(corner);
                }
            }
        }
        Self { entries }
    }

    /// Entry by storage index, each in `0..4`.
    ///
    /// # Panics
    /// Panics if an index is out of range.
    #[must_use]
    pub const fn get(&self, du: usize, dv: usize, dw: usize) -> Vec3 {
        self.entries[dw][dv][du]
    }

    /// Entry by logical index, each in `-1..=2`.
    ///
    /// # Panics
    /// Panics if an index is outside `-1..=2`.
    #[must_use]
    pub fn at_logical(&self, u: i32, v: i32, w: i32) -> Vec3 {
        let slot = |d: i32| {
            assert!((-1..=2).contains(&d), "logical index {d} outside -1..=2");
            usize::try_from(d + 1).unwrap_or_default()
        };
        self.entries[slot(w)][slot(v)][slot(u)]
    }

    #[must_use]
    pub const fn entries(&self) -> &[[[Vec3; TABLE_WIDTH]; TABLE_WIDTH]; TABLE_WIDTH] {
        &self.entries
    }
}

/// Whether storage index `d` maps to corner 1, i.e. `clamp(d - 1, 0, 1) == 1`.
const fn replicated_corner(d: usize) -> bool {
    d >= 2
}
