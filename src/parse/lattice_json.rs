//! Reader for JSON lattice descriptions.
//!
//! ```json
//! {
//!   "lattice_deformations": {
//!     "0": { "original": [0.5, -0.5, -0.5], "deformation": [-0.0023, -0.5887, 0.0] }
//!   }
//! }
//! ```
//!
//! Keys only label entries; the corner comes from `original`. Corners that are
//! not listed keep a zero deformation.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geom::{ControlLattice, CornerDescription, FfdError, Vec3};

/// Result type for lattice description parsing.
pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not valid JSON or does not match the expected shape.
    #[error("lattice JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The file could not be read.
    #[error("could not read lattice description: {0}")]
    Io(#[from] std::io::Error),
    /// The entries do not form a valid lattice.
    #[error("invalid lattice: {0}")]
    Lattice(#[from] FfdError),
}

/// A parsed lattice description document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatticeDocument {
    pub lattice_deformations: BTreeMap<String, CornerDescription>,
}

impl LatticeDocument {
    /// Entries as `(key, description)` pairs in key order.
    pub fn descriptions(&self) -> impl Iterator<Item = (&str, &CornerDescription)> {
        self.lattice_deformations
            .iter()
            .map(|(key, description)| (key.as_str(), description))
    }

    /// Resolves the entries into a lattice for a box of size `extent`.
    ///
    /// # Errors
    /// [`ParseError::Lattice`] for unresolvable or duplicate corners.
    pub fn to_lattice(&self, extent: Vec3, corner_tolerance: f64) -> ParseResult<ControlLattice> {
        Ok(ControlLattice::from_descriptions(
            self.descriptions(),
            extent,
            corner_tolerance,
        )?)
    }
}

/// Parses a lattice description from a JSON string.
///
/// # Errors
/// [`ParseError::Json`] for malformed input.
pub fn parse_str(input: &str) -> ParseResult<LatticeDocument> {
    let document: LatticeDocument = serde_json::from_str(input)?;
    log::debug!(
        "parsed lattice description with {} corner entries",
        document.lattice_deformations.len()
    );
    Ok(document)
}

/// Reads and parses a lattice description file.
///
/// # Errors
/// [`ParseError::Io`] if the file cannot be read, [`ParseError::Json`] for
/// malformed content.
pub fn read_file(path: &Path) -> ParseResult<LatticeDocument> {
    let text = std::fs::read_to_string(path)?;
    parse_str(&text)
}
