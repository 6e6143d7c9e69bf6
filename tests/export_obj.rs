//! End-to-end export tests over on-disk model files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Result;
use bim2obj::{BimSource, ExportStats, ExtractSettings, Setting, export};
use serde_json::{Value, json};
use tempfile::tempdir;

/// Settings used by the command-line tool.
fn cli_settings() -> ExtractSettings {
    let mut settings = ExtractSettings::default();
    settings.set(Setting::UseWorldCoords, true);
    settings.set(Setting::WeldVertices, false);
    settings.set(Setting::SewShells, true);
    settings
}

fn write_model(path: &Path, model: &Value) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), model)?;
    Ok(())
}

fn run_export(path: &Path, settings: ExtractSettings) -> Result<(ExportStats, String, String, String)> {
    let mut source = BimSource::open(path, settings)?;
    let mut obj_out = Vec::new();
    let mut mtl_out = Vec::new();
    let mut console = Vec::new();
    let stats = export(
        &mut source,
        &mut obj_out,
        &mut mtl_out,
        "model.bim.mtl",
        &mut console,
    )?;
    Ok((
        stats,
        String::from_utf8(obj_out)?,
        String::from_utf8(mtl_out)?,
        String::from_utf8(console)?,
    ))
}

/// Unit quad in the XY plane: 4 vertices, 2 triangles.
fn quad_mesh(mesh_id: usize) -> Value {
    json!({
        "mesh_id": mesh_id,
        "coordinates": [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
        "indices": [0, 1, 2, 0, 2, 3]
    })
}

fn triangle_mesh(mesh_id: usize) -> Value {
    json!({
        "mesh_id": mesh_id,
        "coordinates": [0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0],
        "indices": [0, 1, 2]
    })
}

#[test]
fn single_wall_block_matches_mesh_size() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("model.bim");
    write_model(
        &path,
        &json!({
            "schema_version": "1.1.0",
            "meshes": [quad_mesh(0)],
            "elements": [
                {"mesh_id": 0, "type": "IfcWall", "guid": "wall-1", "info": {"name": "Wall"}}
            ]
        }),
    )?;

    let (stats, obj, mtl, _) = run_export(&path, cli_settings())?;

    // One entity with 4 vertices, 4 normals and 2 faces
    assert_eq!(stats.entities_written, 1);
    assert_eq!(obj.lines().filter(|l| l.starts_with("g ")).count(), 1);
    assert_eq!(obj.lines().filter(|l| l.starts_with("v ")).count(), 4);
    assert_eq!(obj.lines().filter(|l| l.starts_with("vn ")).count(), 4);
    assert_eq!(obj.lines().filter(|l| l.starts_with("f ")).count(), 2);
    assert!(obj.contains("usemtl IfcWall"));
    assert!(obj.contains("s 1"));

    // Exactly one material block
    assert_eq!(mtl.matches("newmtl ").count(), 1);
    assert!(mtl.contains("newmtl IfcWall"));
    Ok(())
}

#[test]
fn vertex_and_normal_counts_match_per_entity() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("model.bim");
    write_model(
        &path,
        &json!({
            "schema_version": "1.1.0",
            "meshes": [quad_mesh(0), triangle_mesh(1)],
            "elements": [
                {"mesh_id": 0, "type": "IfcWall", "guid": "a"},
                {"mesh_id": 1, "type": "IfcSlab", "guid": "b"}
            ]
        }),
    )?;

    let (_, obj, _, _) = run_export(&path, cli_settings())?;

    // Per-entity v and vn counts must agree
    let mut v_count = 0usize;
    let mut vn_count = 0usize;
    let mut seen_blocks = 0usize;
    for line in obj.lines() {
        if line.starts_with("g ") {
            if seen_blocks > 0 {
                assert_eq!(v_count, vn_count);
            }
            seen_blocks += 1;
            v_count = 0;
            vn_count = 0;
        } else if line.starts_with("v ") {
            v_count += 1;
        } else if line.starts_with("vn ") {
            vn_count += 1;
        }
    }
    assert_eq!(seen_blocks, 2);
    assert_eq!(v_count, vn_count);
    Ok(())
}

#[test]
fn face_indices_are_rebased_per_entity() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("model.bim");
    write_model(
        &path,
        &json!({
            "schema_version": "1.1.0",
            "meshes": [quad_mesh(0), triangle_mesh(1)],
            "elements": [
                {"mesh_id": 0, "type": "IfcWall", "guid": "a"},
                {"mesh_id": 1, "type": "IfcSlab", "guid": "b"}
            ]
        }),
    )?;

    let (_, obj, _, _) = run_export(&path, cli_settings())?;

    // The offset resets for each entity: every face index must lie in
    // [-vcount, -1] for its own block, and position == normal per corner.
    let mut vcount: i64 = 0;
    let mut blocks = 0usize;
    for line in obj.lines() {
        if line.starts_with("g ") {
            vcount = 0;
            blocks += 1;
        } else if line.starts_with("v ") {
            vcount += 1;
        } else if line.starts_with("f ") {
            for corner in line.split_whitespace().skip(1) {
                let mut parts = corner.split("//");
                let pos: i64 = parts.next().unwrap().parse()?;
                let normal: i64 = parts.next().unwrap().parse()?;
                assert_eq!(pos, normal, "position and normal index differ: {corner}");
                assert!(
                    (-vcount..0).contains(&pos),
                    "index {pos} outside [-{vcount}, -1] in block {blocks}"
                );
            }
        }
    }
    assert_eq!(blocks, 2);
    Ok(())
}

#[test]
fn void_entity_types_are_not_exported() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("model.bim");
    write_model(
        &path,
        &json!({
            "schema_version": "1.1.0",
            "meshes": [quad_mesh(0), quad_mesh(1), quad_mesh(2)],
            "elements": [
                {"mesh_id": 0, "type": "IfcSpace", "guid": "room", "info": {"name": "Room"}},
                {"mesh_id": 1, "type": "IfcOpeningElement", "guid": "hole"},
                {"mesh_id": 2, "type": "IfcWall", "guid": "wall"}
            ]
        }),
    )?;

    let (stats, obj, mtl, _) = run_export(&path, cli_settings())?;

    assert_eq!(stats.entities_written, 1);
    assert_eq!(stats.entities_skipped, 2);
    assert_eq!(obj.lines().filter(|l| l.starts_with("g ")).count(), 1);
    assert!(!obj.contains("Room"));
    assert!(!obj.contains("usemtl IfcSpace"));
    assert_eq!(mtl.matches("newmtl ").count(), 1);
    Ok(())
}

#[test]
fn one_material_per_distinct_type() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("model.bim");
    write_model(
        &path,
        &json!({
            "schema_version": "1.1.0",
            "meshes": [quad_mesh(0), quad_mesh(1), quad_mesh(2)],
            "elements": [
                {"mesh_id": 0, "type": "IfcWall", "guid": "w1"},
                {"mesh_id": 1, "type": "IfcWall", "guid": "w2"},
                {"mesh_id": 2, "type": "IfcWindow", "guid": "win"}
            ]
        }),
    )?;

    let (stats, obj, mtl, _) = run_export(&path, cli_settings())?;

    assert_eq!(stats.entities_written, 3);
    assert_eq!(obj.matches("usemtl IfcWall").count(), 2);
    assert_eq!(stats.materials, 2);
    assert_eq!(mtl.matches("newmtl ").count(), 2);
    assert!(mtl.contains("newmtl IfcWall"));
    assert!(mtl.contains("newmtl IfcWindow"));
    Ok(())
}

#[test]
fn sewing_merges_shells_sharing_a_guid() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("model.bim");
    let model = json!({
        "schema_version": "1.1.0",
        "meshes": [quad_mesh(0), quad_mesh(1)],
        "elements": [
            {"mesh_id": 0, "type": "IfcWall", "guid": "product", "info": {"name": "Shelled"}},
            {"mesh_id": 1, "type": "IfcWall", "guid": "product"}
        ]
    });
    write_model(&path, &model)?;

    let (stats, obj, _, _) = run_export(&path, cli_settings())?;
    assert_eq!(stats.entities_written, 1);
    assert_eq!(obj.lines().filter(|l| l.starts_with("g ")).count(), 1);
    assert_eq!(obj.lines().filter(|l| l.starts_with("v ")).count(), 8);

    let mut no_sew = cli_settings();
    no_sew.set(Setting::SewShells, false);
    let (stats, obj, _, _) = run_export(&path, no_sew)?;
    assert_eq!(stats.entities_written, 2);
    assert_eq!(obj.lines().filter(|l| l.starts_with("g ")).count(), 2);
    Ok(())
}

#[test]
fn welding_merges_duplicate_vertices() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("model.bim");
    // Two triangles sharing an edge, stored with duplicated vertices
    write_model(
        &path,
        &json!({
            "schema_version": "1.1.0",
            "meshes": [{
                "mesh_id": 0,
                "coordinates": [
                    0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0,
                    0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0
                ],
                "indices": [0, 1, 2, 3, 4, 5]
            }],
            "elements": [{"mesh_id": 0, "type": "IfcWall", "guid": "w"}]
        }),
    )?;

    // The CLI keeps welding off; vertex multiplicity is preserved
    let (_, obj, _, _) = run_export(&path, cli_settings())?;
    assert_eq!(obj.lines().filter(|l| l.starts_with("v ")).count(), 6);

    let mut welding = cli_settings();
    welding.set(Setting::WeldVertices, true);
    let (_, obj, _, _) = run_export(&path, welding)?;
    assert_eq!(obj.lines().filter(|l| l.starts_with("v ")).count(), 4);
    assert_eq!(obj.lines().filter(|l| l.starts_with("f ")).count(), 2);
    Ok(())
}

#[test]
fn placement_is_applied_in_world_coords() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("model.bim");
    write_model(
        &path,
        &json!({
            "schema_version": "1.1.0",
            "meshes": [triangle_mesh(0)],
            "elements": [{
                "mesh_id": 0, "type": "IfcWall", "guid": "placed",
                "vector": {"x": 100.0, "y": 0.0, "z": 0.0}
            }]
        }),
    )?;

    let (_, obj, _, _) = run_export(&path, cli_settings())?;
    assert!(obj.contains("v 100 0 0"));

    let mut local = cli_settings();
    local.set(Setting::UseWorldCoords, false);
    let (_, obj, _, _) = run_export(&path, local)?;
    assert!(obj.contains("v 0 0 0"));
    Ok(())
}

#[test]
fn entity_label_prefers_name_then_guid() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("model.bim");
    write_model(
        &path,
        &json!({
            "schema_version": "1.1.0",
            "meshes": [quad_mesh(0), quad_mesh(1)],
            "elements": [
                {"mesh_id": 0, "type": "IfcWall", "guid": "named", "info": {"name": "South wall"}},
                {"mesh_id": 1, "type": "IfcWall", "guid": "anonymous"}
            ]
        }),
    )?;

    let (_, obj, _, _) = run_export(&path, cli_settings())?;
    assert!(obj.contains("g South wall"));
    assert!(obj.contains("g anonymous"));
    Ok(())
}

#[test]
fn progress_fill_is_non_decreasing() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("model.bim");
    let meshes: Vec<Value> = (0..8).map(quad_mesh).collect();
    let elements: Vec<Value> = (0..8)
        .map(|i| json!({"mesh_id": i, "type": "IfcWall", "guid": format!("w{i}")}))
        .collect();
    write_model(
        &path,
        &json!({"schema_version": "1.1.0", "meshes": meshes, "elements": elements}),
    )?;

    let (_, _, _, console) = run_export(&path, cli_settings())?;

    // Frames are separated by carriage returns; fill must never shrink
    let mut last_fill = 0usize;
    for frame in console.split('\r').filter(|f| f.starts_with('[')) {
        let fill = frame.matches('#').count();
        assert!(fill >= last_fill, "bar went backwards: {fill} < {last_fill}");
        last_fill = fill;
    }
    assert_eq!(last_fill, 50);
    Ok(())
}

#[test]
fn unusable_sources_fail_before_output() -> Result<()> {
    let dir = tempdir()?;

    // Zero extractable entities
    let empty = dir.path().join("empty.bim");
    write_model(
        &empty,
        &json!({"schema_version": "1.1.0", "meshes": [], "elements": []}),
    )?;
    assert!(BimSource::open(&empty, cli_settings()).is_err());

    // Unparseable input
    let garbage = dir.path().join("garbage.bim");
    let mut file = File::create(&garbage)?;
    file.write_all(b"this is not a building model")?;
    assert!(BimSource::open(&garbage, cli_settings()).is_err());

    // Missing file
    assert!(BimSource::open(&dir.path().join("absent.bim"), cli_settings()).is_err());
    Ok(())
}

#[test]
fn skipped_elements_surface_in_console_log() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("model.bim");
    write_model(
        &path,
        &json!({
            "schema_version": "1.1.0",
            "meshes": [quad_mesh(0)],
            "elements": [
                {"mesh_id": 0, "type": "IfcWall", "guid": "good"},
                {"mesh_id": 9, "type": "IfcWall", "guid": "dangling"}
            ]
        }),
    )?;

    let (stats, _, _, console) = run_export(&path, cli_settings())?;
    assert_eq!(stats.entities_written, 1);
    assert!(console.contains("Log:"));
    assert!(console.contains("mesh 9 not found"));
    Ok(())
}
