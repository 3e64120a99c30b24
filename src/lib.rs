//! Signed distance field baking for triangle meshes.
//!
//! This crate precomputes everything needed to answer signed distance
//! queries against a triangle mesh at runtime without touching mesh
//! topology per query:
//!
//! - a flat, index-referencing [BVH](Bvh) over the triangles, giving
//!   O(log n) closest-point queries with branch-and-bound pruning
//! - per-vertex and per-edge **angle-weighted pseudonormals**, giving a
//!   provably correct inside/outside sign at every surface feature of a
//!   closed, consistently-wound manifold mesh, including at edges and
//!   vertices where a plain face-normal test is ambiguous
//!
//! Baking is a one-shot offline pass; the result ([`MeshSdf`]) is
//! immutable and queryable from any number of threads. The flat node
//! array and normal tables export as plain arrays
//! ([`MeshSdf::to_arrays`]) for a persisted asset.
//!
//! # Example
//!
//! ```
//! use mesh_sdf_bake::{unit_cube, BakeParams, MeshSdf};
//! use nalgebra::Point3;
//!
//! let (positions, faces) = unit_cube();
//! let sdf = MeshSdf::bake(&positions, &[&faces], &BakeParams::default()).unwrap();
//!
//! // Negative inside, positive outside
//! let center = sdf.signed_distance(&Point3::new(0.5, 0.5, 0.5)).unwrap();
//! assert!(center < 0.0);
//!
//! let outside = sdf.signed_distance(&Point3::new(5.0, 0.5, 0.5)).unwrap();
//! assert!((outside - 4.0).abs() < 1e-9);
//! ```
//!
//! # Failure model
//!
//! Only two conditions abort a bake: an empty triangle list and an
//! out-of-bounds vertex index. Everything else degrades gracefully and
//! is surfaced as counts in [`BakeReport`]; degenerate features answer
//! distance queries normally but report [`Sign::Undefined`] instead of
//! guessing a sign.
//!
//! # Coordinate conventions
//!
//! Faces wind counter-clockwise when viewed from outside, so normals
//! point outward by the right-hand rule. All coordinates are `f64`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

mod aabb;
mod bvh;
mod error;
mod mesh;
mod params;
mod pseudonormal;
mod query;
mod report;
mod sdf;

pub use aabb::Aabb;
pub use bvh::{Bvh, BvhNode};
pub use error::{BakeError, BakeResult};
pub use mesh::{edge_key, edge_key_vertices, face_positions, unit_cube, validate_faces};
pub use params::BakeParams;
pub use pseudonormal::{accumulate_pseudonormals, PseudonormalTables};
pub use query::{
    closest_point_on_triangle, query_closest, query_closest_counted, query_closest_linear,
    ClosestHit, Feature,
};
pub use report::BakeReport;
pub use sdf::{BakedArrays, MeshSdf, SdfSample, Sign};
