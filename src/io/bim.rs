//! dotbim (.bim) model files.
//!
//! Minimalist BIM format: JSON with a pool of triangulated meshes and a
//! list of elements that reference them, each carrying a type tag, a guid
//! and a placement.
//!
//! See: https://dotbim.net/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Root structure of a dotbim file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BimFile {
    /// Schema version (should be "1.1.0")
    pub schema_version: String,
    /// Mesh pool containing the geometry
    pub meshes: Vec<BimMesh>,
    /// Elements referencing meshes with metadata
    pub elements: Vec<BimElement>,
    /// File-level metadata
    #[serde(default)]
    pub info: HashMap<String, String>,
}

/// A mesh in dotbim format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BimMesh {
    /// Unique mesh identifier
    pub mesh_id: usize,
    /// Flat array of coordinates: [x0, y0, z0, x1, y1, z1, ...]
    pub coordinates: Vec<f64>,
    /// Flat array of triangle indices: [f0_v0, f0_v1, f0_v2, f1_v0, ...]
    pub indices: Vec<usize>,
}

/// An element in dotbim format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BimElement {
    /// Reference to mesh_id
    pub mesh_id: usize,
    /// Entity type tag (e.g. "IfcWall", "IfcSpace")
    #[serde(rename = "type")]
    pub element_type: String,
    /// RGBA color where values are 0-255
    #[serde(default)]
    pub color: BimColor,
    /// Placement translation
    #[serde(default)]
    pub vector: BimVector,
    /// Placement rotation quaternion
    #[serde(default)]
    pub rotation: BimRotation,
    /// Unique identifier; a fresh one is generated downstream when empty
    #[serde(default)]
    pub guid: String,
    /// Element metadata; the "name" key is used as the display label
    #[serde(default)]
    pub info: HashMap<String, String>,
    /// Optional face colors (per-triangle RGBA, flattened)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_colors: Option<Vec<u8>>,
}

/// RGBA color as [r, g, b, a] where values are 0-255.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BimColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for BimColor {
    fn default() -> Self {
        Self {
            r: 128,
            g: 128,
            b: 128,
            a: 255,
        }
    }
}

/// Translation vector [x, y, z].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BimVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Rotation quaternion [qx, qy, qz, qw].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BimRotation {
    pub qx: f64,
    pub qy: f64,
    pub qz: f64,
    pub qw: f64,
}

impl Default for BimRotation {
    fn default() -> Self {
        Self {
            qx: 0.0,
            qy: 0.0,
            qz: 0.0,
            qw: 1.0,
        }
    }
}

/// Reads a dotbim (.bim) model file.
///
/// # Arguments
/// * `path` - Input file path
pub fn read_bim(path: &Path) -> Result<BimFile> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let reader = BufReader::new(file);

    let bim_file: BimFile = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse BIM file: {}", path.display()))?;

    Ok(bim_file)
}

/// Parses a dotbim model from a JSON string.
///
/// Useful for in-memory fixtures.
pub fn from_bim_str(json: &str) -> Result<BimFile> {
    serde_json::from_str(json).context("Failed to parse BIM model")
}
