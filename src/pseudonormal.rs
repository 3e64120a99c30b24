//! Angle-weighted pseudonormal accumulation.
//!
//! For every vertex, sums the unit normals of incident faces weighted by
//! the face's interior angle at that vertex; for every undirected edge,
//! sums the unweighted unit normals of its adjacent faces. After
//! normalization these are the pseudonormals of Bærentzen & Aanæs, which
//! give a provably correct inside/outside sign at vertices and edges of
//! a closed, consistently-wound manifold mesh where a bare face-normal
//! test is ambiguous.
//!
//! Accumulation is a reduction over triangles that touch shared vertex
//! and edge slots. The parallel path never mutates shared tables:
//! rayon `fold` builds thread-local partial sums and `reduce` merges
//! them, so the result is deterministic up to floating-point summation
//! order. The serial path is bit-exact across runs.

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::debug;

use crate::mesh::{edge_key, face_positions};
use crate::params::BakeParams;

/// Finished pseudonormal tables plus accumulation statistics.
#[derive(Debug, Clone)]
pub struct PseudonormalTables {
    /// Unit pseudonormal per vertex, parallel to the vertex array.
    /// Zero vectors mark degenerate (isolated or fully-degenerate)
    /// vertices whose sign is undefined.
    pub vertex_normals: Vec<Vector3<f64>>,
    /// Unit pseudonormal per undirected edge, keyed by packed edge key.
    /// Zero vectors mark degenerate edges.
    pub edge_normals: HashMap<u64, Vector3<f64>>,
    /// Edges with exactly one adjacent triangle.
    pub boundary_edge_count: usize,
    /// Triangles skipped for having near-zero area.
    pub degenerate_triangle_count: usize,
    /// Vertices whose accumulated normal had zero length.
    pub degenerate_vertex_count: usize,
    /// Edges whose accumulated normal had zero length.
    pub degenerate_edge_count: usize,
}

/// Thread-local partial sums for the map/reduce accumulation.
struct Partial {
    vertex_sums: Vec<Vector3<f64>>,
    edge_sums: HashMap<u64, (Vector3<f64>, u32)>,
    degenerate_triangles: usize,
}

impl Partial {
    fn new(vertex_count: usize) -> Self {
        Self {
            vertex_sums: vec![Vector3::zeros(); vertex_count],
            edge_sums: HashMap::new(),
            degenerate_triangles: 0,
        }
    }

    fn add_face(&mut self, positions: &[Point3<f64>], face: [u32; 3], degenerate_epsilon: f64) {
        let (a, b, c) = face_positions(positions, face);
        let raw = (b - a).cross(&(c - a));
        let area = 0.5 * raw.norm();

        if area < degenerate_epsilon {
            self.degenerate_triangles += 1;
            return;
        }

        let normal = raw / (2.0 * area);

        let angles = [
            corner_angle(&a, &b, &c),
            corner_angle(&b, &c, &a),
            corner_angle(&c, &a, &b),
        ];
        for (corner, &vertex) in face.iter().enumerate() {
            self.vertex_sums[vertex as usize] += normal * angles[corner];
        }

        for (i, j) in [(0, 1), (1, 2), (2, 0)] {
            let entry = self
                .edge_sums
                .entry(edge_key(face[i], face[j]))
                .or_insert((Vector3::zeros(), 0));
            entry.0 += normal;
            entry.1 += 1;
        }
    }

    fn merge(mut self, other: Self) -> Self {
        for (sum, other_sum) in self.vertex_sums.iter_mut().zip(other.vertex_sums) {
            *sum += other_sum;
        }
        for (key, (other_sum, other_count)) in other.edge_sums {
            let entry = self.edge_sums.entry(key).or_insert((Vector3::zeros(), 0));
            entry.0 += other_sum;
            entry.1 += other_count;
        }
        self.degenerate_triangles += other.degenerate_triangles;
        self
    }
}

/// Interior angle at corner `a` of triangle `abc`, in radians.
fn corner_angle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let u = b - a;
    let v = c - a;
    let denom = u.norm() * v.norm();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    (u.dot(&v) / denom).clamp(-1.0, 1.0).acos()
}

/// Accumulate vertex and edge pseudonormals for a triangle set.
///
/// Degenerate (near-zero-area) triangles contribute to no sums but are
/// counted; features whose final sum has zero length are left as zero
/// vectors and counted rather than faulting on normalization.
#[must_use]
pub fn accumulate_pseudonormals(
    positions: &[Point3<f64>],
    faces: &[[u32; 3]],
    params: &BakeParams,
) -> PseudonormalTables {
    let vertex_count = positions.len();

    let partial = if params.parallel && faces.len() >= params.parallel_threshold {
        faces
            .par_iter()
            .fold(
                || Partial::new(vertex_count),
                |mut acc, &face| {
                    acc.add_face(positions, face, params.degenerate_epsilon);
                    acc
                },
            )
            .reduce(|| Partial::new(vertex_count), Partial::merge)
    } else {
        let mut acc = Partial::new(vertex_count);
        for &face in faces {
            acc.add_face(positions, face, params.degenerate_epsilon);
        }
        acc
    };

    let mut degenerate_vertex_count = 0;
    let vertex_normals: Vec<Vector3<f64>> = partial
        .vertex_sums
        .into_iter()
        .map(|sum| {
            sum.try_normalize(f64::EPSILON).unwrap_or_else(|| {
                degenerate_vertex_count += 1;
                Vector3::zeros()
            })
        })
        .collect();

    let mut degenerate_edge_count = 0;
    let mut boundary_edge_count = 0;
    let edge_normals: HashMap<u64, Vector3<f64>> = partial
        .edge_sums
        .into_iter()
        .map(|(key, (sum, face_count))| {
            if face_count == 1 {
                boundary_edge_count += 1;
            }
            let normal = sum.try_normalize(f64::EPSILON).unwrap_or_else(|| {
                degenerate_edge_count += 1;
                Vector3::zeros()
            });
            (key, normal)
        })
        .collect();

    debug!(
        vertices = vertex_count,
        edges = edge_normals.len(),
        boundary_edges = boundary_edge_count,
        degenerate_triangles = partial.degenerate_triangles,
        "accumulated pseudonormals"
    );

    PseudonormalTables {
        vertex_normals,
        edge_normals,
        boundary_edge_count,
        degenerate_triangle_count: partial.degenerate_triangles,
        degenerate_vertex_count,
        degenerate_edge_count,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mesh::unit_cube;
    use approx::assert_relative_eq;

    #[test]
    fn cube_vertex_normals_point_diagonally() {
        let (positions, faces) = unit_cube();
        let tables = accumulate_pseudonormals(&positions, &faces, &BakeParams::default());

        // Each cube corner touches three faces, each contributing a
        // total interior angle of pi/2 across its triangles, so the
        // pseudonormal is the normalized sum of the three axis normals
        let expected = Vector3::new(-1.0, -1.0, -1.0).normalize();
        let normal = tables.vertex_normals[0];
        assert_relative_eq!(normal.x, expected.x, epsilon = 1e-9);
        assert_relative_eq!(normal.y, expected.y, epsilon = 1e-9);
        assert_relative_eq!(normal.z, expected.z, epsilon = 1e-9);

        let expected = Vector3::new(1.0, 1.0, 1.0).normalize();
        let normal = tables.vertex_normals[6];
        assert_relative_eq!(normal.x, expected.x, epsilon = 1e-9);
        assert_relative_eq!(normal.y, expected.y, epsilon = 1e-9);
        assert_relative_eq!(normal.z, expected.z, epsilon = 1e-9);
    }

    #[test]
    fn cube_edge_tables_complete() {
        let (positions, faces) = unit_cube();
        let tables = accumulate_pseudonormals(&positions, &faces, &BakeParams::default());

        // 12 geometric edges + 6 face diagonals
        assert_eq!(tables.edge_normals.len(), 18);
        assert_eq!(tables.boundary_edge_count, 0);
        assert_eq!(tables.degenerate_triangle_count, 0);
        assert_eq!(tables.degenerate_vertex_count, 0);
        assert_eq!(tables.degenerate_edge_count, 0);

        // Every edge of every face must be present
        for face in &faces {
            for (i, j) in [(0, 1), (1, 2), (2, 0)] {
                assert!(tables
                    .edge_normals
                    .contains_key(&crate::mesh::edge_key(face[i], face[j])));
            }
        }
    }

    #[test]
    fn cube_sharp_edge_is_bisector() {
        let (positions, faces) = unit_cube();
        let tables = accumulate_pseudonormals(&positions, &faces, &BakeParams::default());

        // Edge (0,1) is shared by the bottom (-Z) and front (-Y) faces
        let normal = tables.edge_normals[&crate::mesh::edge_key(0, 1)];
        let expected = Vector3::new(0.0, -1.0, -1.0).normalize();
        assert_relative_eq!(normal.x, expected.x, epsilon = 1e-12);
        assert_relative_eq!(normal.y, expected.y, epsilon = 1e-12);
        assert_relative_eq!(normal.z, expected.z, epsilon = 1e-12);
    }

    #[test]
    fn isolated_triangle_boundary_edges() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2]];

        let tables = accumulate_pseudonormals(&positions, &faces, &BakeParams::default());

        assert_eq!(tables.edge_normals.len(), 3);
        assert_eq!(tables.boundary_edge_count, 3);

        // With a single contributor there is no averaging: the edge
        // pseudonormal is exactly the face normal (+Z here)
        for normal in tables.edge_normals.values() {
            assert_relative_eq!(normal.z, 1.0, epsilon = 1e-15);
            assert_relative_eq!(normal.x, 0.0, epsilon = 1e-15);
            assert_relative_eq!(normal.y, 0.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn degenerate_triangle_skipped() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0), // collinear
        ];
        let faces = vec![[0, 1, 2]];

        let tables = accumulate_pseudonormals(&positions, &faces, &BakeParams::default());

        assert_eq!(tables.degenerate_triangle_count, 1);
        // Nothing was accumulated, so all three vertices are degenerate
        assert_eq!(tables.degenerate_vertex_count, 3);
        assert!(tables.edge_normals.is_empty());
    }

    #[test]
    fn isolated_vertex_is_degenerate_not_a_fault() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(9.0, 9.0, 9.0), // referenced by no face
        ];
        let faces = vec![[0, 1, 2]];

        let tables = accumulate_pseudonormals(&positions, &faces, &BakeParams::default());

        assert_eq!(tables.degenerate_vertex_count, 1);
        assert_relative_eq!(tables.vertex_normals[3].norm(), 0.0);
    }

    #[test]
    fn parallel_matches_serial_within_epsilon() {
        let (positions, faces) = unit_cube();

        let serial = accumulate_pseudonormals(&positions, &faces, &BakeParams::serial());
        let parallel = accumulate_pseudonormals(
            &positions,
            &faces,
            &BakeParams {
                parallel: true,
                parallel_threshold: 1,
                ..BakeParams::default()
            },
        );

        for (a, b) in serial
            .vertex_normals
            .iter()
            .zip(parallel.vertex_normals.iter())
        {
            assert_relative_eq!((a - b).norm(), 0.0, epsilon = 1e-12);
        }
        for (key, a) in &serial.edge_normals {
            let b = parallel.edge_normals[key];
            assert_relative_eq!((a - b).norm(), 0.0, epsilon = 1e-12);
        }
    }
}
