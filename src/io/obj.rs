//! Wavefront OBJ and MTL emission.
//!
//! Entity blocks use local indexing: each face index is rebased by
//! subtracting the entity's own vertex count, which yields the negative
//! "count back from the most recently defined vertex" indices of the OBJ
//! format. The same index addresses both the position and the normal of a
//! face corner, so meshes carry one normal per vertex position.

use crate::mesh::TriMesh;
use std::io::{self, Write};

/// Generator tag written into both file headers.
const GENERATOR: &str = concat!("bim2obj ", env!("CARGO_PKG_VERSION"));

/// Writes the OBJ header comment and the `mtllib` reference.
pub fn write_obj_header<W: Write>(w: &mut W, mtl_name: &str) -> io::Result<()> {
    writeln!(w, "# File generated by {}", GENERATOR)?;
    writeln!(w, "mtllib {}", mtl_name)?;
    Ok(())
}

/// Writes one `g`/`s`/`usemtl`/`v`/`vn`/`f` block for an entity mesh.
pub fn write_entity<W: Write>(
    w: &mut W,
    label: &str,
    element_type: &str,
    mesh: &TriMesh,
) -> io::Result<()> {
    writeln!(w, "g {}", label)?;
    writeln!(w, "s 1")?;
    writeln!(w, "usemtl {}", element_type)?;

    for v in mesh.vertices.chunks_exact(3) {
        writeln!(w, "v {} {} {}", v[0], v[1], v[2])?;
    }
    for n in mesh.normals.chunks_exact(3) {
        writeln!(w, "vn {} {} {}", n[0], n[1], n[2])?;
    }

    // The offset resets for every entity, it is not accumulated globally.
    let vcount = mesh.vertex_count() as i64;
    for tri in mesh.indices.chunks_exact(3) {
        let a = tri[0] as i64 - vcount;
        let b = tri[1] as i64 - vcount;
        let c = tri[2] as i64 - vcount;
        writeln!(w, "f {a}//{a} {b}//{b} {c}//{c}")?;
    }

    Ok(())
}

/// Writes the MTL header comment.
pub fn write_mtl_header<W: Write>(w: &mut W) -> io::Result<()> {
    writeln!(w, "# File generated by {}", GENERATOR)
}
