pub mod export;
pub mod extract;
mod guid;
pub mod io;
pub mod materials;
pub mod mesh;
pub mod progress;

// Prelude
pub use export::{ExportStats, export};
pub use extract::{BimSource, ExtractSettings, GeometryEntity, GeometrySource, Setting};
pub use guid::Guid;
pub use mesh::TriMesh;
