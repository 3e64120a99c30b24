//! Error types for signed distance field baking.

use thiserror::Error;

/// Result type alias for bake operations.
pub type BakeResult<T> = Result<T, BakeError>;

/// Errors that can occur while baking a signed distance field.
///
/// Only conditions that abort the bake are errors. Recoverable conditions
/// (degenerate features, extra submeshes) are reported as counts in
/// [`BakeReport`](crate::BakeReport) alongside a successful result.
#[derive(Debug, Error)]
pub enum BakeError {
    /// Input mesh has no triangles. Nothing can be baked, and no
    /// queryable structure is produced.
    #[error("mesh has no triangles")]
    EmptyMesh,

    /// A triangle references a vertex index outside the vertex array.
    /// The bake aborts without partial output.
    #[error("face {face} references vertex {index} but mesh has {vertex_count} vertices")]
    InvalidTriangle {
        /// Index of the offending face.
        face: usize,
        /// The out-of-bounds vertex index.
        index: u32,
        /// Number of vertices in the input mesh.
        vertex_count: usize,
    },
}
