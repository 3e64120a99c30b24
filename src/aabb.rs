//! Axis-aligned bounding box for BVH nodes.

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box.
///
/// Used as the bounding volume of every BVH node. Unlike a general
/// spatial AABB, this one also answers the branch-and-bound question:
/// the squared lower-bound distance from a query point to the box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// Create an empty (inverted) bounding box.
    ///
    /// Expanding an empty box by any point or box yields that point/box.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Create the tight bounding box of a triangle.
    #[must_use]
    pub fn from_triangle(v0: &Point3<f64>, v1: &Point3<f64>, v2: &Point3<f64>) -> Self {
        Self {
            min: Point3::new(
                v0.x.min(v1.x).min(v2.x),
                v0.y.min(v1.y).min(v2.y),
                v0.z.min(v1.z).min(v2.z),
            ),
            max: Point3::new(
                v0.x.max(v1.x).max(v2.x),
                v0.y.max(v1.y).max(v2.y),
                v0.z.max(v1.z).max(v2.z),
            ),
        }
    }

    /// Expand this box to include another.
    pub fn expand(&mut self, other: &Self) {
        self.min.x = self.min.x.min(other.min.x);
        self.min.y = self.min.y.min(other.min.y);
        self.min.z = self.min.z.min(other.min.z);
        self.max.x = self.max.x.max(other.max.x);
        self.max.y = self.max.y.max(other.max.y);
        self.max.z = self.max.z.max(other.max.z);
    }

    /// Expand this box to include a point.
    pub fn expand_point(&mut self, point: &Point3<f64>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// The union of two boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut result = *self;
        result.expand(other);
        result
    }

    /// Check if a point lies inside this box (inclusive).
    #[must_use]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Squared distance from a point to the nearest point of this box.
    ///
    /// Zero when the point is inside. This is the lower bound used to
    /// prune BVH subtrees during closest-point queries: no triangle
    /// inside the box can be closer than this.
    #[must_use]
    pub fn distance_squared_to(&self, point: &Point3<f64>) -> f64 {
        let dx = (self.min.x - point.x).max(0.0).max(point.x - self.max.x);
        let dy = (self.min.y - point.y).max(0.0).max(point.y - self.max.y);
        let dz = (self.min.z - point.z).max(0.0).max(point.z - self.max.z);
        dz.mul_add(dz, dx.mul_add(dx, dy * dy))
    }

    /// Check if min <= max on all axes.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn from_triangle_is_tight() {
        let bbox = Aabb::from_triangle(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.5, 1.0, 0.5),
        );

        assert_relative_eq!(bbox.min.x, 0.0);
        assert_relative_eq!(bbox.max.x, 1.0);
        assert_relative_eq!(bbox.max.y, 1.0);
        assert_relative_eq!(bbox.max.z, 0.5);
    }

    #[test]
    fn empty_expands_to_point() {
        let mut bbox = Aabb::empty();
        assert!(!bbox.is_valid());

        bbox.expand_point(&Point3::new(1.0, 2.0, 3.0));
        assert!(bbox.is_valid());
        assert_relative_eq!(bbox.min.x, 1.0);
        assert_relative_eq!(bbox.max.z, 3.0);
    }

    #[test]
    fn union_covers_both() {
        let a = Aabb::from_triangle(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        );
        let b = Aabb::from_triangle(
            &Point3::new(2.0, 2.0, 2.0),
            &Point3::new(3.0, 2.0, 2.0),
            &Point3::new(2.0, 3.0, 2.0),
        );

        let u = a.union(&b);
        assert_relative_eq!(u.min.x, 0.0);
        assert_relative_eq!(u.max.x, 3.0);
        assert_relative_eq!(u.max.z, 2.0);
    }

    #[test]
    fn distance_zero_inside() {
        let bbox = Aabb {
            min: Point3::new(0.0, 0.0, 0.0),
            max: Point3::new(1.0, 1.0, 1.0),
        };
        assert_relative_eq!(bbox.distance_squared_to(&Point3::new(0.5, 0.5, 0.5)), 0.0);
        // On the boundary counts as inside
        assert_relative_eq!(bbox.distance_squared_to(&Point3::new(1.0, 0.5, 0.0)), 0.0);
    }

    #[test]
    fn distance_to_face_edge_corner() {
        let bbox = Aabb {
            min: Point3::new(0.0, 0.0, 0.0),
            max: Point3::new(1.0, 1.0, 1.0),
        };

        // Straight out of a face
        assert_relative_eq!(bbox.distance_squared_to(&Point3::new(2.0, 0.5, 0.5)), 1.0);
        // Diagonal off an edge
        assert_relative_eq!(bbox.distance_squared_to(&Point3::new(2.0, 2.0, 0.5)), 2.0);
        // Diagonal off a corner
        assert_relative_eq!(bbox.distance_squared_to(&Point3::new(2.0, 2.0, 2.0)), 3.0);
    }
}
