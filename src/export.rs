//! The exporter: drives a geometry source and streams OBJ + MTL output.
//!
//! Entities are serialized one at a time as they are pulled; the only
//! state retained across the loop is the material set and the progress
//! bar. Failures are terminal, nothing is retried.

use anyhow::Result;
use std::collections::BTreeSet;
use std::io::Write;
use std::time::{Duration, Instant};

use crate::extract::GeometrySource;
use crate::io::obj;
use crate::materials;
use crate::progress::ProgressBar;

/// Entity types with no visual mesh meaning: space volumes and opening
/// voids exist in the source schema but are excluded from export.
const VOID_TYPES: [&str; 2] = ["IfcSpace", "IfcOpeningElement"];

const PROGRESS_WIDTH: usize = 50;

/// Summary of one export run.
#[derive(Debug, Clone)]
pub struct ExportStats {
    pub entities_written: usize,
    pub entities_skipped: usize,
    pub materials: usize,
    pub elapsed: Duration,
}

/// Streams all entities of `source` into `obj_out` and the material table
/// into `mtl_out`.
///
/// `mtl_name` is the path written after `mtllib`. Progress, timing and
/// source diagnostics go to `console`. Void entity types are skipped; one
/// material is defined per distinct exported entity type.
pub fn export<S, O, M, C>(
    source: &mut S,
    obj_out: &mut O,
    mtl_out: &mut M,
    mtl_name: &str,
    console: &mut C,
) -> Result<ExportStats>
where
    S: GeometrySource,
    O: Write,
    M: Write,
    C: Write,
{
    obj::write_obj_header(obj_out, mtl_name)?;

    let mut material_set: BTreeSet<String> = BTreeSet::new();
    let mut bar = ProgressBar::new(PROGRESS_WIDTH);
    let mut written = 0usize;
    let mut skipped = 0usize;

    writeln!(console, "Creating geometry...")?;
    let start = Instant::now();

    while let Some(entity) = source.next() {
        if VOID_TYPES.contains(&entity.element_type.as_str()) {
            skipped += 1;
        } else {
            obj::write_entity(obj_out, entity.label(), &entity.element_type, &entity.mesh)?;
            material_set.insert(entity.element_type.clone());
            written += 1;
        }
        bar.update(console, source.progress())?;
    }

    let elapsed = start.elapsed();
    bar.finish(console, "Done creating geometry")?;

    obj::write_mtl_header(mtl_out)?;
    for tag in &material_set {
        write!(mtl_out, "{}", materials::material_block(tag))?;
    }

    // Diagnostics were buffered during the run so they do not interleave
    // with the progress bar.
    if !source.diagnostics().is_empty() {
        writeln!(console)?;
        writeln!(console, "Log:")?;
        for line in source.diagnostics() {
            writeln!(console, "{}", line)?;
        }
    }

    writeln!(console)?;
    writeln!(console, "Conversion took {} seconds", elapsed.as_secs())?;

    Ok(ExportStats {
        entities_written: written,
        entities_skipped: skipped,
        materials: material_set.len(),
        elapsed,
    })
}
