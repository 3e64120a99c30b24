//! Flat bounding volume hierarchy over mesh triangles.
//!
//! Nodes live in a single contiguous array and reference their children
//! by index, so the finished tree serializes as-is into a persisted
//! asset with no pointer fix-up. Children are always pushed before
//! their parent, which makes the root the last node in the array.

use nalgebra::Point3;
use rayon::prelude::*;
use tracing::debug;

use crate::aabb::Aabb;
use crate::error::{BakeError, BakeResult};
use crate::mesh::face_positions;
use crate::params::BakeParams;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single node of the flat BVH.
///
/// Leaves hold exactly one triangle index; internal nodes hold the
/// indices of their two children within the same node array.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BvhNode {
    /// Leaf node bounding a single triangle.
    Leaf {
        /// Tight bounding box of the triangle.
        aabb: Aabb,
        /// Index of the triangle in the face array.
        triangle: u32,
    },
    /// Internal node bounding both children.
    Internal {
        /// Union of the children's bounding boxes.
        aabb: Aabb,
        /// Index of the left child in the node array.
        left: u32,
        /// Index of the right child in the node array.
        right: u32,
    },
}

impl BvhNode {
    /// Bounding box of this node.
    #[inline]
    #[must_use]
    pub const fn aabb(&self) -> &Aabb {
        match self {
            Self::Leaf { aabb, .. } | Self::Internal { aabb, .. } => aabb,
        }
    }
}

/// Per-triangle data precomputed before partitioning.
struct Prim {
    aabb: Aabb,
    centroid: Point3<f64>,
    triangle: u32,
}

/// Flat bounding volume hierarchy over a triangle set.
///
/// Built once per bake; read-only afterward. One leaf per triangle.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    root: u32,
}

impl Bvh {
    /// Build a BVH over the given triangles.
    ///
    /// Recursive top-down partition: at each step the split axis is the
    /// axis of greatest centroid spread and triangles are partitioned
    /// against the mean centroid on that axis. When every centroid is
    /// identical on every axis (duplicate or degenerate geometry) the
    /// subset is split at its index midpoint instead, so termination is
    /// guaranteed and neither side is ever empty.
    ///
    /// # Errors
    ///
    /// Returns [`BakeError::EmptyMesh`] when `faces` is empty.
    #[allow(clippy::cast_possible_truncation)] // face indices are u32 by contract
    pub fn build(
        positions: &[Point3<f64>],
        faces: &[[u32; 3]],
        params: &BakeParams,
    ) -> BakeResult<Self> {
        if faces.is_empty() {
            return Err(BakeError::EmptyMesh);
        }

        let make_prim = |(i, &face): (usize, &[u32; 3])| {
            let (v0, v1, v2) = face_positions(positions, face);
            Prim {
                aabb: Aabb::from_triangle(&v0, &v1, &v2),
                centroid: Point3::from((v0.coords + v1.coords + v2.coords) / 3.0),
                triangle: i as u32,
            }
        };

        let prims: Vec<Prim> = if params.parallel && faces.len() >= params.parallel_threshold {
            faces.par_iter().enumerate().map(make_prim).collect()
        } else {
            faces.iter().enumerate().map(make_prim).collect()
        };

        let mut order: Vec<u32> = (0..prims.len() as u32).collect();
        // A binary tree with n leaves has exactly 2n - 1 nodes
        let mut nodes = Vec::with_capacity(2 * prims.len() - 1);
        let root = build_range(&prims, &mut order, &mut nodes);

        debug!(
            triangles = faces.len(),
            nodes = nodes.len(),
            "built BVH"
        );

        Ok(Self { nodes, root })
    }

    /// The flat node array.
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Index of the root node within [`nodes`](Self::nodes).
    #[inline]
    #[must_use]
    pub const fn root(&self) -> u32 {
        self.root
    }

    /// Number of leaf nodes, which equals the triangle count.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, BvhNode::Leaf { .. }))
            .count()
    }
}

/// Recursively build the subtree for `order`, returning its node index.
#[allow(clippy::cast_possible_truncation)] // node count bounded by 2 * u32 triangle count
fn build_range(prims: &[Prim], order: &mut [u32], nodes: &mut Vec<BvhNode>) -> u32 {
    if let [single] = order {
        let prim = &prims[*single as usize];
        nodes.push(BvhNode::Leaf {
            aabb: prim.aabb,
            triangle: prim.triangle,
        });
        return (nodes.len() - 1) as u32;
    }

    let mut aabb = Aabb::empty();
    let mut centroid_bounds = Aabb::empty();
    for &i in order.iter() {
        let prim = &prims[i as usize];
        aabb.expand(&prim.aabb);
        centroid_bounds.expand_point(&prim.centroid);
    }

    let extent = centroid_bounds.max - centroid_bounds.min;
    let axis = if extent.x >= extent.y && extent.x >= extent.z {
        0
    } else if extent.y >= extent.z {
        1
    } else {
        2
    };
    let mean = centroid_mean(prims, order, axis);

    // Partition in place: centroids below the mean go left
    let mut split = 0;
    for i in 0..order.len() {
        if prims[order[i] as usize].centroid[axis] < mean {
            order.swap(i, split);
            split += 1;
        }
    }

    // All centroids coincident on every axis: fall back to an index
    // split so both sides stay non-empty
    if split == 0 || split == order.len() {
        split = order.len() / 2;
    }

    let (left_order, right_order) = order.split_at_mut(split);
    let left = build_range(prims, left_order, nodes);
    let right = build_range(prims, right_order, nodes);

    nodes.push(BvhNode::Internal { aabb, left, right });
    (nodes.len() - 1) as u32
}

/// Mean centroid coordinate of a subset along one axis.
#[allow(clippy::cast_precision_loss)] // subset sizes are far below 2^52
fn centroid_mean(prims: &[Prim], order: &[u32], axis: usize) -> f64 {
    let sum: f64 = order
        .iter()
        .map(|&i| prims[i as usize].centroid[axis])
        .sum();
    sum / order.len() as f64
}
