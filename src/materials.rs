//! Material definitions for exported entity types.
//!
//! One MTL block per distinct entity type. Colors approximate common
//! building materials; unknown types fall back to a neutral gray.

/// Diffuse color and opacity for an entity type.
fn palette(element_type: &str) -> ([f64; 3], f64) {
    match element_type {
        "IfcWall" | "IfcWallStandardCase" => ([0.75, 0.73, 0.68], 1.0),
        "IfcSlab" | "IfcFooting" => ([0.4, 0.4, 0.4], 1.0),
        "IfcRoof" => ([0.52, 0.25, 0.22], 1.0),
        "IfcWindow" => ([0.35, 0.55, 0.75], 0.35),
        "IfcDoor" => ([0.48, 0.34, 0.22], 1.0),
        "IfcColumn" | "IfcBeam" | "IfcMember" => ([0.55, 0.55, 0.58], 1.0),
        "IfcStair" | "IfcStairFlight" | "IfcRamp" | "IfcRampFlight" => ([0.6, 0.58, 0.55], 1.0),
        "IfcRailing" => ([0.4, 0.4, 0.45], 1.0),
        "IfcPlate" | "IfcCurtainWall" => ([0.5, 0.65, 0.75], 0.5),
        "IfcFurnishingElement" => ([0.6, 0.45, 0.3], 1.0),
        "IfcSite" => ([0.3, 0.5, 0.3], 1.0),
        _ => ([0.6, 0.6, 0.6], 1.0),
    }
}

/// Returns the serialized MTL block for an entity type.
///
/// The block starts with `newmtl <type>` and ends with a blank line.
pub fn material_block(element_type: &str) -> String {
    let ([r, g, b], d) = palette(element_type);
    let mut block = format!("newmtl {}\nKd {} {} {}\n", element_type, r, g, b);
    if d < 1.0 {
        block.push_str(&format!("d {}\n", d));
    }
    block.push('\n');
    block
}
