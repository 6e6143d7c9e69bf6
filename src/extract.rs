//! Geometry extraction from building-model files.
//!
//! The exporter consumes a [`GeometrySource`]: a lazy, finite,
//! non-restartable sequence of [`GeometryEntity`] values with a completion
//! percentage and an advisory diagnostics buffer. [`BimSource`] implements
//! it for dotbim-style model files.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::mem;
use std::path::Path;

use crate::guid::Guid;
use crate::io::bim::{BimFile, read_bim};
use crate::mesh::{TriMesh, apply_placement, weld_vertices};

/// Extraction options, set before opening a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    /// Apply element placements so coordinates are in world space.
    UseWorldCoords,
    /// Merge coincident vertices within each entity mesh.
    WeldVertices,
    /// Merge elements sharing a guid into one closed solid.
    SewShells,
}

/// Extraction configuration. All options default to off.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractSettings {
    pub use_world_coords: bool,
    pub weld_vertices: bool,
    pub sew_shells: bool,
}

impl ExtractSettings {
    pub fn set(&mut self, setting: Setting, value: bool) {
        match setting {
            Setting::UseWorldCoords => self.use_world_coords = value,
            Setting::WeldVertices => self.weld_vertices = value,
            Setting::SewShells => self.sew_shells = value,
        }
    }
}

/// One discrete object extracted from the model: a type classification,
/// identity and its own triangle mesh.
#[derive(Debug, Clone)]
pub struct GeometryEntity {
    pub element_type: String,
    pub name: Option<String>,
    pub guid: Guid,
    pub mesh: TriMesh,
}

impl GeometryEntity {
    /// Display label: the name when non-empty, the guid otherwise.
    pub fn label(&self) -> &str {
        match &self.name {
            Some(name) if !name.is_empty() => name,
            _ => self.guid.as_str(),
        }
    }
}

/// Pull-based source of geometry entities.
///
/// The sequence is finite and non-restartable and is consumed strictly
/// left to right. [`progress`](GeometrySource::progress) is non-decreasing
/// from 0 to 100 across the iteration. Diagnostics are advisory log text,
/// never errors.
pub trait GeometrySource: Iterator<Item = GeometryEntity> {
    /// Completion percentage, 0-100.
    fn progress(&self) -> u8;

    /// Messages accumulated while reading the model.
    fn diagnostics(&self) -> &[String];
}

/// An element slot: index into `elements` and index into `meshes`.
type ElemRef = (usize, usize);

/// Geometry source over dotbim-style model files.
pub struct BimSource {
    file: BimFile,
    /// Per-entity element refs; more than one when shells are sewn.
    groups: Vec<Vec<ElemRef>>,
    pos: usize,
    settings: ExtractSettings,
    log: Vec<String>,
}

impl BimSource {
    /// Opens a model file and validates its elements.
    ///
    /// Elements referencing a missing mesh or carrying malformed geometry
    /// are skipped with a diagnostic. Fails if the file cannot be parsed
    /// or no usable entities remain.
    pub fn open(path: &Path, settings: ExtractSettings) -> Result<Self> {
        let file = read_bim(path)?;
        Self::from_file(file, settings)
    }

    /// Builds a source from an already-parsed model.
    pub fn from_file(file: BimFile, settings: ExtractSettings) -> Result<Self> {
        let mut log = Vec::new();
        let mut valid: Vec<ElemRef> = Vec::new();

        for (i, element) in file.elements.iter().enumerate() {
            let Some(mesh_idx) = file
                .meshes
                .iter()
                .position(|m| m.mesh_id == element.mesh_id)
            else {
                log.push(format!(
                    "Skipping element {}: mesh {} not found",
                    i, element.mesh_id
                ));
                continue;
            };
            let mesh = &file.meshes[mesh_idx];
            if !mesh.coordinates.len().is_multiple_of(3) {
                log.push(format!(
                    "Skipping element {}: invalid coordinate count {}",
                    i,
                    mesh.coordinates.len()
                ));
                continue;
            }
            if !mesh.indices.len().is_multiple_of(3) {
                log.push(format!(
                    "Skipping element {}: invalid index count {}",
                    i,
                    mesh.indices.len()
                ));
                continue;
            }
            let vertex_count = mesh.coordinates.len() / 3;
            if mesh.indices.iter().any(|&ix| ix >= vertex_count) {
                log.push(format!("Skipping element {}: face index out of range", i));
                continue;
            }
            valid.push((i, mesh_idx));
        }

        let groups = group_shells(&file, &valid, settings.sew_shells);
        if groups.is_empty() {
            return Err(anyhow!("No geometrical entities found in the model"));
        }

        Ok(Self {
            file,
            groups,
            pos: 0,
            settings,
            log,
        })
    }

    fn build_entity(&mut self, group: &[ElemRef]) -> Option<GeometryEntity> {
        let &(first, _) = group.first()?;

        let mut coords: Vec<f64> = Vec::new();
        let mut indices: Vec<usize> = Vec::new();
        for &(elem_idx, mesh_idx) in group {
            let element = &self.file.elements[elem_idx];
            let mesh = &self.file.meshes[mesh_idx];

            let offset = coords.len() / 3;
            let mut part = mesh.coordinates.clone();
            if self.settings.use_world_coords {
                apply_placement(
                    &mut part,
                    [element.vector.x, element.vector.y, element.vector.z],
                    [
                        element.rotation.qx,
                        element.rotation.qy,
                        element.rotation.qz,
                        element.rotation.qw,
                    ],
                );
            }
            coords.extend_from_slice(&part);
            indices.extend(mesh.indices.iter().map(|&ix| ix + offset));
        }

        if self.settings.weld_vertices {
            (coords, indices) = weld_vertices(&coords, &indices);
        }

        let element = &self.file.elements[first];
        let element_type = element.element_type.clone();
        let name = element.info.get("name").cloned();
        let guid = if element.guid.is_empty() {
            let guid = Guid::new();
            self.log
                .push(format!("Element {} without guid, assigned {}", first, guid));
            guid
        } else {
            Guid::from(element.guid.as_str())
        };

        // Arrays were validated at open time, so a failure here means a
        // degenerate combination; report it and keep going.
        let mesh = match TriMesh::build(coords, indices) {
            Ok(mesh) => mesh,
            Err(err) => {
                self.log.push(format!("Element {}: {}", first, err));
                TriMesh::default()
            }
        };

        Some(GeometryEntity {
            element_type,
            name,
            guid,
            mesh,
        })
    }
}

impl Iterator for BimSource {
    type Item = GeometryEntity;

    fn next(&mut self) -> Option<GeometryEntity> {
        while self.pos < self.groups.len() {
            let group = mem::take(&mut self.groups[self.pos]);
            self.pos += 1;
            if let Some(entity) = self.build_entity(&group) {
                return Some(entity);
            }
        }
        None
    }
}

impl GeometrySource for BimSource {
    fn progress(&self) -> u8 {
        let total = self.groups.len().max(1);
        (self.pos * 100 / total) as u8
    }

    fn diagnostics(&self) -> &[String] {
        &self.log
    }
}

/// Groups validated element refs into entities.
///
/// With sewing enabled, elements sharing a non-empty guid are shells of
/// one product and merge into a single group, in first-seen order.
fn group_shells(file: &BimFile, valid: &[ElemRef], sew_shells: bool) -> Vec<Vec<ElemRef>> {
    if !sew_shells {
        return valid.iter().map(|&r| vec![r]).collect();
    }

    let mut groups: Vec<Vec<ElemRef>> = Vec::new();
    let mut by_guid: HashMap<&str, usize> = HashMap::new();
    for &(elem_idx, mesh_idx) in valid {
        let guid = file.elements[elem_idx].guid.as_str();
        if guid.is_empty() {
            groups.push(vec![(elem_idx, mesh_idx)]);
            continue;
        }
        match by_guid.get(guid) {
            Some(&g) => groups[g].push((elem_idx, mesh_idx)),
            None => {
                by_guid.insert(guid, groups.len());
                groups.push(vec![(elem_idx, mesh_idx)]);
            }
        }
    }
    groups
}
