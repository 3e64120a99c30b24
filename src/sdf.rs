//! Baked signed distance field: bake entry point, sign resolution,
//! and the export bundle for the persistence layer.

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use tracing::{info, warn};

use crate::bvh::{Bvh, BvhNode};
use crate::error::{BakeError, BakeResult};
use crate::mesh::{face_positions, validate_faces};
use crate::params::BakeParams;
use crate::pseudonormal::{accumulate_pseudonormals, PseudonormalTables};
use crate::query::{query_closest, ClosestHit, Feature};
use crate::report::BakeReport;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Inside/outside classification of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// The point is outside the surface.
    Outside,
    /// The point is inside the surface.
    Inside,
    /// The nearest feature has a degenerate pseudonormal, so the sign
    /// cannot be determined. Never silently defaulted.
    Undefined,
}

/// A full signed distance sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SdfSample {
    /// Closest point on the mesh surface.
    pub closest_point: Point3<f64>,
    /// Unsigned distance to the surface.
    pub distance: f64,
    /// The feature realizing the closest point.
    pub feature: Feature,
    /// Inside/outside classification.
    pub sign: Sign,
}

impl SdfSample {
    /// The signed distance, negative inside, or `None` when the sign
    /// is undefined.
    #[must_use]
    pub fn signed_distance(&self) -> Option<f64> {
        match self.sign {
            Sign::Outside => Some(self.distance),
            Sign::Inside => Some(-self.distance),
            Sign::Undefined => None,
        }
    }
}

/// The logical arrays a persisted asset stores for a baked field.
///
/// Everything is plain counts, flat arrays, and integer indices; the
/// edge key array and edge normal array are parallel (index `i` in one
/// corresponds to index `i` in the other) and sorted by key so output
/// is deterministic regardless of accumulation order.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BakedArrays {
    /// Number of vertices in the baked mesh.
    pub vertex_count: usize,
    /// Number of triangles in the baked mesh.
    pub triangle_count: usize,
    /// Flat BVH node sequence.
    pub nodes: Vec<BvhNode>,
    /// Index of the root node within `nodes`.
    pub root: u32,
    /// Unit pseudonormal per vertex, parallel to the vertex array.
    pub vertex_normals: Vec<Vector3<f64>>,
    /// Packed edge keys, sorted ascending.
    pub edge_keys: Vec<u64>,
    /// Unit edge pseudonormals, parallel to `edge_keys`.
    pub edge_normals: Vec<Vector3<f64>>,
}

/// A baked, queryable signed distance field for a triangle mesh.
///
/// Baking runs once over a borrowed mesh; the result owns everything a
/// query needs and is immutable, so queries from any number of threads
/// need no synchronization.
///
/// # Example
///
/// ```
/// use mesh_sdf_bake::{unit_cube, BakeParams, MeshSdf, Sign};
/// use nalgebra::Point3;
///
/// let (positions, faces) = unit_cube();
/// let sdf = MeshSdf::bake(&positions, &[&faces], &BakeParams::default()).unwrap();
///
/// let inside = sdf.sample(&Point3::new(0.5, 0.5, 0.5));
/// assert_eq!(inside.sign, Sign::Inside);
///
/// let outside = sdf.signed_distance(&Point3::new(3.0, 0.5, 0.5)).unwrap();
/// assert!((outside - 2.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct MeshSdf {
    positions: Vec<Point3<f64>>,
    faces: Vec<[u32; 3]>,
    bvh: Bvh,
    face_normals: Vec<Vector3<f64>>,
    vertex_normals: Vec<Vector3<f64>>,
    edge_normals: HashMap<u64, Vector3<f64>>,
    feature_epsilon: f64,
    report: BakeReport,
}

impl MeshSdf {
    /// Bake a signed distance field from a mesh.
    ///
    /// Only the first submesh is baked; any further submeshes are
    /// skipped with a warning and counted in the report. Input is
    /// borrowed for this call only.
    ///
    /// # Errors
    ///
    /// - [`BakeError::EmptyMesh`] when there is no submesh or the
    ///   first submesh has no triangles.
    /// - [`BakeError::InvalidTriangle`] when a face of the baked
    ///   submesh references a vertex outside the vertex array. No
    ///   partial output is produced.
    pub fn bake(
        positions: &[Point3<f64>],
        submeshes: &[&[[u32; 3]]],
        params: &BakeParams,
    ) -> BakeResult<Self> {
        let faces = *submeshes.first().ok_or(BakeError::EmptyMesh)?;
        if faces.is_empty() {
            return Err(BakeError::EmptyMesh);
        }

        let submeshes_skipped = submeshes.len() - 1;
        if submeshes_skipped > 0 {
            warn!(
                skipped = submeshes_skipped,
                "mesh has multiple submeshes; only the first is baked"
            );
        }

        validate_faces(positions.len(), faces)?;

        info!(
            vertices = positions.len(),
            triangles = faces.len(),
            "baking mesh signed distance field"
        );

        let bvh = Bvh::build(positions, faces, params)?;
        let tables = accumulate_pseudonormals(positions, faces, params);
        let face_normals = unit_face_normals(positions, faces, params.degenerate_epsilon);

        let PseudonormalTables {
            vertex_normals,
            edge_normals,
            boundary_edge_count,
            degenerate_triangle_count,
            degenerate_vertex_count,
            degenerate_edge_count,
        } = tables;

        let report = BakeReport {
            vertex_count: positions.len(),
            triangle_count: faces.len(),
            edge_count: edge_normals.len(),
            boundary_edge_count,
            degenerate_triangle_count,
            degenerate_vertex_normal_count: degenerate_vertex_count,
            degenerate_edge_normal_count: degenerate_edge_count,
            submeshes_skipped,
        };

        if report.has_warnings() {
            warn!(
                degenerate_triangles = report.degenerate_triangle_count,
                degenerate_features = report.degenerate_feature_count(),
                "bake completed with warnings"
            );
        }

        Ok(Self {
            positions: positions.to_vec(),
            faces: faces.to_vec(),
            bvh,
            face_normals,
            vertex_normals,
            edge_normals,
            feature_epsilon: params.feature_epsilon,
            report,
        })
    }

    /// Query the full sample for a point: closest surface point,
    /// unsigned distance, realizing feature, and sign.
    ///
    /// Valid for any input point; queries never fail after a
    /// successful bake.
    #[must_use]
    pub fn sample(&self, point: &Point3<f64>) -> SdfSample {
        let hit = self.closest(point);
        let sign = self.resolve_sign(point, &hit);
        SdfSample {
            closest_point: hit.point,
            distance: hit.distance,
            feature: hit.feature,
            sign,
        }
    }

    /// Signed distance at a point, negative inside.
    ///
    /// `None` when the nearest feature's pseudonormal is degenerate
    /// and the sign is therefore undefined.
    #[must_use]
    pub fn signed_distance(&self, point: &Point3<f64>) -> Option<f64> {
        self.sample(point).signed_distance()
    }

    /// Unsigned distance to the surface at a point.
    #[must_use]
    pub fn distance(&self, point: &Point3<f64>) -> f64 {
        self.closest(point).distance
    }

    /// Closest point on the surface together with its feature.
    #[must_use]
    pub fn closest(&self, point: &Point3<f64>) -> ClosestHit {
        query_closest(
            &self.bvh,
            &self.positions,
            &self.faces,
            point,
            self.feature_epsilon,
        )
    }

    /// Statistics and warnings from the bake.
    #[must_use]
    pub const fn report(&self) -> &BakeReport {
        &self.report
    }

    /// The BVH built over the mesh.
    #[must_use]
    pub const fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Number of vertices in the baked mesh.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles in the baked mesh.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Export the logical arrays for the persistence layer.
    #[must_use]
    pub fn to_arrays(&self) -> BakedArrays {
        let mut keyed: Vec<(u64, Vector3<f64>)> = self
            .edge_normals
            .iter()
            .map(|(&key, &normal)| (key, normal))
            .collect();
        keyed.sort_unstable_by_key(|&(key, _)| key);

        let (edge_keys, edge_normals) = keyed.into_iter().unzip();

        BakedArrays {
            vertex_count: self.positions.len(),
            triangle_count: self.faces.len(),
            nodes: self.bvh.nodes().to_vec(),
            root: self.bvh.root(),
            vertex_normals: self.vertex_normals.clone(),
            edge_keys,
            edge_normals,
        }
    }

    /// Resolve the sign for a hit via its feature's pseudonormal.
    fn resolve_sign(&self, point: &Point3<f64>, hit: &ClosestHit) -> Sign {
        let pseudonormal = match hit.feature {
            Feature::Face(triangle) => self.face_normals[triangle as usize],
            Feature::Edge(key) => self
                .edge_normals
                .get(&key)
                .copied()
                .unwrap_or_else(Vector3::zeros),
            Feature::Vertex(vertex) => self.vertex_normals[vertex as usize],
        };

        if pseudonormal.norm_squared() <= f64::EPSILON {
            return Sign::Undefined;
        }

        if (point - hit.point).dot(&pseudonormal) >= 0.0 {
            Sign::Outside
        } else {
            Sign::Inside
        }
    }
}

/// Unit face normal per triangle; zero for degenerate triangles.
fn unit_face_normals(
    positions: &[Point3<f64>],
    faces: &[[u32; 3]],
    degenerate_epsilon: f64,
) -> Vec<Vector3<f64>> {
    faces
        .iter()
        .map(|&face| {
            let (v0, v1, v2) = face_positions(positions, face);
            let raw = (v1 - v0).cross(&(v2 - v0));
            if 0.5 * raw.norm() < degenerate_epsilon {
                Vector3::zeros()
            } else {
                raw.normalize()
            }
        })
        .collect()
}
