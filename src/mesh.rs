//! Flat-array triangle meshes.
//!
//! Vertices and normals are stored as flat coordinate sequences (stride 3)
//! and faces as a flat index sequence (stride 3), matching the layout used
//! by triangulated building-model files.

use anyhow::{Result, anyhow};
use std::collections::HashMap;

const EPS: f64 = 1e-10;

/// Quantization scale for vertex welding (~1 nm precision).
const WELD_SCALE: f64 = 1e9;

/// A triangle mesh with per-vertex normals.
///
/// Invariants: `vertices` and `normals` have equal length, both are
/// multiples of 3, and every face index references a vertex of this mesh.
#[derive(Debug, Clone, Default)]
pub struct TriMesh {
    /// Flat vertex coordinates: `[x0, y0, z0, x1, ...]`
    pub vertices: Vec<f64>,
    /// Flat normal components, parallel to `vertices`.
    pub normals: Vec<f64>,
    /// Flat triangle indices: `[t0_a, t0_b, t0_c, t1_a, ...]`
    pub indices: Vec<usize>,
}

impl TriMesh {
    /// Builds a mesh from flat coordinate and index arrays, computing
    /// per-vertex normals.
    ///
    /// Fails if either array length is not a multiple of 3 or an index is
    /// out of range.
    pub fn build(vertices: Vec<f64>, indices: Vec<usize>) -> Result<Self> {
        if !vertices.len().is_multiple_of(3) {
            return Err(anyhow!("Invalid coordinate count: {}", vertices.len()));
        }
        if !indices.len().is_multiple_of(3) {
            return Err(anyhow!("Invalid index count: {}", indices.len()));
        }
        let vertex_count = vertices.len() / 3;
        if let Some(&bad) = indices.iter().find(|&&i| i >= vertex_count) {
            return Err(anyhow!(
                "Face index {} out of range for {} vertices",
                bad,
                vertex_count
            ));
        }
        let normals = vertex_normals(&vertices, &indices);
        Ok(Self {
            vertices,
            normals,
            indices,
        })
    }

    /// Returns the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Returns the number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Applies an element placement to a flat coordinate array: quaternion
/// rotation about the origin, then translation.
///
/// The quaternion is `[qx, qy, qz, qw]` and need not be normalized.
/// A zero-length quaternion is treated as identity.
pub fn apply_placement(coords: &mut [f64], translation: [f64; 3], rotation: [f64; 4]) {
    let len = rotation.iter().map(|q| q * q).sum::<f64>().sqrt();
    let [qx, qy, qz, qw] = if len < EPS {
        [0.0, 0.0, 0.0, 1.0]
    } else {
        [
            rotation[0] / len,
            rotation[1] / len,
            rotation[2] / len,
            rotation[3] / len,
        ]
    };
    let u = [qx, qy, qz];

    for p in coords.chunks_exact_mut(3) {
        let v = [p[0], p[1], p[2]];
        // v' = v + w*t + u x t, where t = 2*(u x v)
        let t = cross(u, v);
        let t = [2.0 * t[0], 2.0 * t[1], 2.0 * t[2]];
        let uxt = cross(u, t);
        p[0] = v[0] + qw * t[0] + uxt[0] + translation[0];
        p[1] = v[1] + qw * t[1] + uxt[1] + translation[1];
        p[2] = v[2] + qw * t[2] + uxt[2] + translation[2];
    }
}

/// Merges coincident vertices and remaps face indices.
///
/// Vertices are considered identical when they quantize to the same
/// `(i64, i64, i64)` key at 1e9 scale. Indices must be in range for
/// `coords`.
pub fn weld_vertices(coords: &[f64], indices: &[usize]) -> (Vec<f64>, Vec<usize>) {
    let mut key_map: HashMap<(i64, i64, i64), usize> = HashMap::new();
    let mut welded: Vec<f64> = Vec::new();
    let mut old_to_new: Vec<usize> = Vec::with_capacity(coords.len() / 3);

    for p in coords.chunks_exact(3) {
        let key = (
            (p[0] * WELD_SCALE).round() as i64,
            (p[1] * WELD_SCALE).round() as i64,
            (p[2] * WELD_SCALE).round() as i64,
        );
        let idx = match key_map.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = welded.len() / 3;
                welded.extend_from_slice(p);
                key_map.insert(key, idx);
                idx
            }
        };
        old_to_new.push(idx);
    }

    let remapped: Vec<usize> = indices.iter().map(|&i| old_to_new[i]).collect();
    (welded, remapped)
}

/// Per-vertex normals: each vertex accumulates the cross-product normals
/// of its incident triangles (weighted by triangle area) and the sum is
/// normalized. Vertices with no incident triangles or a degenerate sum
/// get +Z.
fn vertex_normals(vertices: &[f64], indices: &[usize]) -> Vec<f64> {
    let mut normals = vec![0.0; vertices.len()];

    for tri in indices.chunks_exact(3) {
        let p0 = vertex(vertices, tri[0]);
        let p1 = vertex(vertices, tri[1]);
        let p2 = vertex(vertices, tri[2]);
        let n = cross(sub(p1, p0), sub(p2, p0));
        for &vi in tri {
            normals[vi * 3] += n[0];
            normals[vi * 3 + 1] += n[1];
            normals[vi * 3 + 2] += n[2];
        }
    }

    for n in normals.chunks_exact_mut(3) {
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if len < EPS {
            n[0] = 0.0;
            n[1] = 0.0;
            n[2] = 1.0;
        } else {
            n[0] /= len;
            n[1] /= len;
            n[2] /= len;
        }
    }

    normals
}

fn vertex(coords: &[f64], i: usize) -> [f64; 3] {
    [coords[i * 3], coords[i * 3 + 1], coords[i * 3 + 2]]
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}
