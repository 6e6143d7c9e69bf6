//! File I/O for building models and exported meshes.

pub mod bim;
pub mod obj;

pub use bim::{BimElement, BimFile, BimMesh, read_bim};
