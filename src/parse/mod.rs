//! Readers for lattice descriptions.

pub mod lattice_json;
