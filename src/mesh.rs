//! Triangle mesh view and edge-key packing.
//!
//! The baker never owns its input: it borrows vertex positions and
//! triangle index triples for the duration of the build call. Faces are
//! `[u32; 3]` with counter-clockwise winding when viewed from outside,
//! so face normals point outward by the right-hand rule. Winding order
//! is significant and preserved throughout the bake.

use nalgebra::Point3;

use crate::error::{BakeError, BakeResult};

/// Pack an undirected edge into a single `u64` key.
///
/// The pair is canonicalized smaller-index-first, so both traversal
/// directions of a shared edge map to the same key.
///
/// # Example
///
/// ```
/// use mesh_sdf_bake::edge_key;
///
/// assert_eq!(edge_key(3, 7), edge_key(7, 3));
/// assert_ne!(edge_key(3, 7), edge_key(3, 8));
/// ```
#[inline]
#[must_use]
pub const fn edge_key(a: u32, b: u32) -> u64 {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    ((low as u64) << 32) | high as u64
}

/// Unpack an edge key into its `(low, high)` vertex indices.
///
/// # Example
///
/// ```
/// use mesh_sdf_bake::{edge_key, edge_key_vertices};
///
/// assert_eq!(edge_key_vertices(edge_key(7, 3)), (3, 7));
/// ```
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)] // low half masked explicitly
pub const fn edge_key_vertices(key: u64) -> (u32, u32) {
    ((key >> 32) as u32, (key & 0xFFFF_FFFF) as u32)
}

/// Check that every face index is within the vertex array.
///
/// # Errors
///
/// Returns [`BakeError::InvalidTriangle`] naming the first offending
/// face and index. The caller must not proceed with a partial bake.
pub fn validate_faces(vertex_count: usize, faces: &[[u32; 3]]) -> BakeResult<()> {
    for (face_idx, face) in faces.iter().enumerate() {
        for &index in face {
            if index as usize >= vertex_count {
                return Err(BakeError::InvalidTriangle {
                    face: face_idx,
                    index,
                    vertex_count,
                });
            }
        }
    }
    Ok(())
}

/// Fetch the three corner positions of a face.
///
/// # Panics
///
/// Panics if any face index is outside the vertex array. Run
/// [`validate_faces`] first when the input is untrusted.
#[inline]
#[must_use]
pub fn face_positions(
    positions: &[Point3<f64>],
    face: [u32; 3],
) -> (Point3<f64>, Point3<f64>, Point3<f64>) {
    (
        positions[face[0] as usize],
        positions[face[1] as usize],
        positions[face[2] as usize],
    )
}

/// Build a unit cube mesh from (0,0,0) to (1,1,1).
///
/// 8 vertices, 12 triangles, CCW winding viewed from outside so all
/// normals point outward. Useful as a known-good closed manifold mesh.
///
/// # Example
///
/// ```
/// use mesh_sdf_bake::unit_cube;
///
/// let (positions, faces) = unit_cube();
/// assert_eq!(positions.len(), 8);
/// assert_eq!(faces.len(), 12);
/// ```
#[must_use]
pub fn unit_cube() -> (Vec<Point3<f64>>, Vec<[u32; 3]>) {
    let positions = vec![
        Point3::new(0.0, 0.0, 0.0), // 0
        Point3::new(1.0, 0.0, 0.0), // 1
        Point3::new(1.0, 1.0, 0.0), // 2
        Point3::new(0.0, 1.0, 0.0), // 3
        Point3::new(0.0, 0.0, 1.0), // 4
        Point3::new(1.0, 0.0, 1.0), // 5
        Point3::new(1.0, 1.0, 1.0), // 6
        Point3::new(0.0, 1.0, 1.0), // 7
    ];

    let faces = vec![
        // Bottom (z=0), normal -Z
        [0, 2, 1],
        [0, 3, 2],
        // Top (z=1), normal +Z
        [4, 5, 6],
        [4, 6, 7],
        // Front (y=0), normal -Y
        [0, 1, 5],
        [0, 5, 4],
        // Back (y=1), normal +Y
        [3, 7, 6],
        [3, 6, 2],
        // Left (x=0), normal -X
        [0, 4, 7],
        [0, 7, 3],
        // Right (x=1), normal +X
        [1, 2, 6],
        [1, 6, 5],
    ];

    (positions, faces)
}
