//! Nearest-feature queries against the baked BVH.
//!
//! Finds the exact closest point on the mesh surface for a query point,
//! together with the feature realizing it: the face interior, one of
//! the triangle's edges, or one of its vertices. The feature identity
//! is what the sign resolver keys its pseudonormal lookup on.

use nalgebra::Point3;
use smallvec::SmallVec;

use crate::bvh::{Bvh, BvhNode};
use crate::mesh::{edge_key, face_positions};

/// The mesh feature realizing a closest point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Interior of a triangle, by triangle index.
    Face(u32),
    /// Interior of an edge, by packed edge key.
    Edge(u64),
    /// A vertex, by vertex index.
    Vertex(u32),
}

/// Result of a closest-point query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestHit {
    /// The closest point on the mesh surface.
    pub point: Point3<f64>,
    /// Euclidean distance from the query point to `point`.
    pub distance: f64,
    /// The feature realizing the closest point.
    pub feature: Feature,
}

/// Closest point on a triangle, classified by feature.
///
/// Implements the clamped-barycentric region walk from Ericson,
/// "Real-Time Collision Detection". The Voronoi region that the query
/// point projects into directly names the feature; a barycentric
/// tolerance additionally snaps near-boundary interior projections to
/// the adjacent edge or vertex so the sign stays stable there.
#[must_use]
#[allow(clippy::many_single_char_names, clippy::similar_names)]
pub fn closest_point_on_triangle(
    point: &Point3<f64>,
    v0: &Point3<f64>,
    v1: &Point3<f64>,
    v2: &Point3<f64>,
    face: [u32; 3],
    face_index: u32,
    feature_epsilon: f64,
) -> (Point3<f64>, Feature) {
    let ab = v1 - v0;
    let ac = v2 - v0;
    let ap = point - v0;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);

    // Vertex region outside A
    if d1 <= 0.0 && d2 <= 0.0 {
        return (*v0, Feature::Vertex(face[0]));
    }

    let bp = point - v1;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);

    // Vertex region outside B
    if d3 >= 0.0 && d4 <= d3 {
        return (*v1, Feature::Vertex(face[1]));
    }

    // Edge region AB. A zero-length edge makes the denominator zero;
    // clamp to the near endpoint instead of dividing 0/0 into NaN
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let denom = d1 - d3;
        let t = if denom > 0.0 { d1 / denom } else { 0.0 };
        return (
            v0 + ab * t,
            edge_or_vertex(t, face[0], face[1], feature_epsilon),
        );
    }

    let cp = point - v2;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);

    // Vertex region outside C
    if d6 >= 0.0 && d5 <= d6 {
        return (*v2, Feature::Vertex(face[2]));
    }

    // Edge region AC
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let denom = d2 - d6;
        let t = if denom > 0.0 { d2 / denom } else { 0.0 };
        return (
            v0 + ac * t,
            edge_or_vertex(t, face[0], face[2], feature_epsilon),
        );
    }

    // Edge region BC
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let denom = (d4 - d3) + (d5 - d6);
        let t = if denom > 0.0 { (d4 - d3) / denom } else { 0.0 };
        return (
            v1 + (v2 - v1) * t,
            edge_or_vertex(t, face[1], face[2], feature_epsilon),
        );
    }

    // Face interior: barycentric weights u on A, v on B, w on C
    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    let u = 1.0 - v - w;
    let closest = v0 + ab * v + ac * w;

    let eps = feature_epsilon;
    let feature = if v <= eps && w <= eps {
        Feature::Vertex(face[0])
    } else if u <= eps && w <= eps {
        Feature::Vertex(face[1])
    } else if u <= eps && v <= eps {
        Feature::Vertex(face[2])
    } else if w <= eps {
        Feature::Edge(edge_key(face[0], face[1]))
    } else if v <= eps {
        Feature::Edge(edge_key(face[0], face[2]))
    } else if u <= eps {
        Feature::Edge(edge_key(face[1], face[2]))
    } else {
        Feature::Face(face_index)
    };

    (closest, feature)
}

/// Classify a point at parameter `t` along edge `(a, b)`.
fn edge_or_vertex(t: f64, a: u32, b: u32, feature_epsilon: f64) -> Feature {
    if t <= feature_epsilon {
        Feature::Vertex(a)
    } else if t >= 1.0 - feature_epsilon {
        Feature::Vertex(b)
    } else {
        Feature::Edge(edge_key(a, b))
    }
}

/// Closest surface point via branch-and-bound BVH descent.
///
/// Internal nodes are visited nearer-child-first by the squared
/// lower-bound distance of their boxes, and a subtree is pruned
/// entirely once its box cannot beat the best distance found so far.
/// Ties keep the first-found feature, so results are deterministic
/// for a given tree.
///
/// # Panics
///
/// Panics if `faces` is empty. A successful bake guarantees at least
/// one triangle; use [`MeshSdf`](crate::MeshSdf) for the safe surface.
#[must_use]
pub fn query_closest(
    bvh: &Bvh,
    positions: &[Point3<f64>],
    faces: &[[u32; 3]],
    point: &Point3<f64>,
    feature_epsilon: f64,
) -> ClosestHit {
    query_closest_counted(bvh, positions, faces, point, feature_epsilon).0
}

/// [`query_closest`] plus the number of leaves actually evaluated.
///
/// The count is a pruning diagnostic; it never exceeds the triangle
/// count.
#[must_use]
pub fn query_closest_counted(
    bvh: &Bvh,
    positions: &[Point3<f64>],
    faces: &[[u32; 3]],
    point: &Point3<f64>,
    feature_epsilon: f64,
) -> (ClosestHit, usize) {
    // Seed the bound at infinity; the root is never pruned against it,
    // so the first leaf reached always becomes the initial candidate
    let mut best_sq = f64::INFINITY;
    let mut best = ClosestHit {
        point: *point,
        distance: 0.0, // finalized below
        feature: Feature::Face(0),
    };
    let mut leaves_visited = 0;

    let nodes = bvh.nodes();
    let mut stack: SmallVec<[u32; 64]> = SmallVec::new();
    stack.push(bvh.root());

    while let Some(index) = stack.pop() {
        let node = &nodes[index as usize];
        if node.aabb().distance_squared_to(point) >= best_sq {
            continue;
        }

        match *node {
            BvhNode::Leaf { triangle, .. } => {
                leaves_visited += 1;
                let face = faces[triangle as usize];
                let (v0, v1, v2) = face_positions(positions, face);
                let (candidate, feature) = closest_point_on_triangle(
                    point,
                    &v0,
                    &v1,
                    &v2,
                    face,
                    triangle,
                    feature_epsilon,
                );
                let dist_sq = (candidate - point).norm_squared();
                if dist_sq < best_sq {
                    best_sq = dist_sq;
                    best.point = candidate;
                    best.feature = feature;
                }
            }
            BvhNode::Internal { left, right, .. } => {
                let left_sq = nodes[left as usize].aabb().distance_squared_to(point);
                let right_sq = nodes[right as usize].aabb().distance_squared_to(point);
                // Push the farther child first so the nearer one is
                // popped and explored before it
                if left_sq <= right_sq {
                    stack.push(right);
                    stack.push(left);
                } else {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
    }

    best.distance = best_sq.sqrt();
    (best, leaves_visited)
}

/// Exhaustive linear-scan closest point over every triangle.
///
/// The reference the BVH path must agree with; also usable directly
/// for one-off queries where building a tree is not worth it.
#[must_use]
pub fn query_closest_linear(
    positions: &[Point3<f64>],
    faces: &[[u32; 3]],
    point: &Point3<f64>,
    feature_epsilon: f64,
) -> ClosestHit {
    let mut best_sq = f64::INFINITY;
    let mut best_point = *point;
    let mut best_feature = Feature::Face(0);

    #[allow(clippy::cast_possible_truncation)] // face indices are u32 by contract
    for (face_index, &face) in faces.iter().enumerate() {
        let (v0, v1, v2) = face_positions(positions, face);
        let (candidate, feature) = closest_point_on_triangle(
            point,
            &v0,
            &v1,
            &v2,
            face,
            face_index as u32,
            feature_epsilon,
        );
        let dist_sq = (candidate - point).norm_squared();
        if dist_sq < best_sq {
            best_sq = dist_sq;
            best_point = candidate;
            best_feature = feature;
        }
    }

    ClosestHit {
        point: best_point,
        distance: best_sq.sqrt(),
        feature: best_feature,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mesh::unit_cube;
    use crate::params::BakeParams;
    use approx::assert_relative_eq;

    const EPS: f64 = 1e-9;

    fn tri() -> (Point3<f64>, Point3<f64>, Point3<f64>) {
        (
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
        )
    }

    #[test]
    fn projection_inside_is_face() {
        let (v0, v1, v2) = tri();
        let point = Point3::new(2.0, 2.0, 5.0);

        let (closest, feature) =
            closest_point_on_triangle(&point, &v0, &v1, &v2, [0, 1, 2], 7, EPS);

        assert_eq!(feature, Feature::Face(7));
        assert_relative_eq!(closest.x, 2.0);
        assert_relative_eq!(closest.y, 2.0);
        assert_relative_eq!(closest.z, 0.0);
    }

    #[test]
    fn outside_corner_is_vertex() {
        let (v0, v1, v2) = tri();
        let point = Point3::new(-3.0, -3.0, 1.0);

        let (closest, feature) =
            closest_point_on_triangle(&point, &v0, &v1, &v2, [0, 1, 2], 0, EPS);

        assert_eq!(feature, Feature::Vertex(0));
        assert_relative_eq!(closest.x, 0.0);
        assert_relative_eq!(closest.y, 0.0);
    }

    #[test]
    fn outside_edge_is_edge() {
        let (v0, v1, v2) = tri();
        let point = Point3::new(5.0, -2.0, 0.0);

        let (closest, feature) =
            closest_point_on_triangle(&point, &v0, &v1, &v2, [0, 1, 2], 0, EPS);

        assert_eq!(feature, Feature::Edge(edge_key(0, 1)));
        assert_relative_eq!(closest.x, 5.0);
        assert_relative_eq!(closest.y, 0.0);
    }

    #[test]
    fn hypotenuse_region_is_edge() {
        let (v0, v1, v2) = tri();
        let point = Point3::new(8.0, 8.0, 0.0);

        let (_, feature) = closest_point_on_triangle(&point, &v0, &v1, &v2, [0, 1, 2], 0, EPS);

        assert_eq!(feature, Feature::Edge(edge_key(1, 2)));
    }

    #[test]
    fn edge_parameter_extremes_snap_to_vertices() {
        let (v0, v1, v2) = tri();

        // Directly below vertex 1, in the AB edge region boundary
        let point = Point3::new(10.0, -5.0, 0.0);
        let (_, feature) = closest_point_on_triangle(&point, &v0, &v1, &v2, [0, 1, 2], 0, EPS);
        assert_eq!(feature, Feature::Vertex(1));
    }

    #[test]
    fn query_point_at_vertex_is_vertex_at_zero_distance() {
        let (positions, faces) = unit_cube();
        let params = BakeParams::default();
        let bvh = Bvh::build(&positions, &faces, &params).unwrap();

        let hit = query_closest(&bvh, &positions, &faces, &positions[6], params.feature_epsilon);

        assert_eq!(hit.feature, Feature::Vertex(6));
        assert_relative_eq!(hit.distance, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn bvh_matches_linear_scan_on_cube() {
        let (positions, faces) = unit_cube();
        let params = BakeParams::default();
        let bvh = Bvh::build(&positions, &faces, &params).unwrap();

        let probes = [
            Point3::new(0.5, 0.5, 0.5),
            Point3::new(2.0, 0.5, 0.5),
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(0.5, 0.5, 10.0),
            Point3::new(1.0, 1.0, 1.0),
        ];

        for point in &probes {
            let tree = query_closest(&bvh, &positions, &faces, point, params.feature_epsilon);
            let linear = query_closest_linear(&positions, &faces, point, params.feature_epsilon);

            assert_relative_eq!(tree.distance, linear.distance, epsilon = 1e-12);
            assert_relative_eq!((tree.point - linear.point).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn pruning_never_exceeds_leaf_count() {
        let (positions, faces) = unit_cube();
        let params = BakeParams::default();
        let bvh = Bvh::build(&positions, &faces, &params).unwrap();

        let point = Point3::new(3.0, -2.0, 0.7);
        let (_, leaves_visited) =
            query_closest_counted(&bvh, &positions, &faces, &point, params.feature_epsilon);

        assert!(leaves_visited <= faces.len());
    }

    #[test]
    fn zero_length_edge_triangle_yields_finite_result() {
        // Vertices 0 and 1 coincide, so the degenerate triangle's AB
        // edge region hits a zero denominator; the result must clamp
        // to an endpoint, never divide into NaN
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ];

        let (closest, feature) = closest_point_on_triangle(
            &Point3::new(0.5, 1.0, 0.0),
            &positions[0],
            &positions[1],
            &positions[2],
            [0, 1, 2],
            0,
            EPS,
        );

        assert!(closest.x.is_finite() && closest.y.is_finite() && closest.z.is_finite());
        assert_eq!(feature, Feature::Vertex(0));
    }

    #[test]
    fn far_point_distance_is_euclidean_to_nearest_face() {
        let (positions, faces) = unit_cube();
        let params = BakeParams::default();
        let bvh = Bvh::build(&positions, &faces, &params).unwrap();

        // Straight out of the +X face
        let hit = query_closest(
            &bvh,
            &positions,
            &faces,
            &Point3::new(4.0, 0.3, 0.6),
            params.feature_epsilon,
        );
        assert_relative_eq!(hit.distance, 3.0, epsilon = 1e-12);
        assert!(matches!(hit.feature, Feature::Face(_)));
    }
}
