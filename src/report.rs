//! Bake statistics and warning report.

/// Statistics and non-fatal warnings from a successful bake.
///
/// A clean, closed, consistently-wound manifold mesh produces a report
/// with zero warning counts. Counts are informational: the baked field
/// is still queryable, but signs at degenerate features resolve to
/// [`Sign::Undefined`](crate::Sign).
///
/// # Example
///
/// ```
/// use mesh_sdf_bake::{unit_cube, BakeParams, MeshSdf};
///
/// let (positions, faces) = unit_cube();
/// let sdf = MeshSdf::bake(&positions, &[&faces], &BakeParams::default()).unwrap();
///
/// let report = sdf.report();
/// assert!(report.is_clean());
/// assert_eq!(report.edge_count, 18); // cube: 12 face edges + 6 diagonals
/// ```
#[derive(Debug, Clone, Default)]
pub struct BakeReport {
    /// Number of vertices in the baked mesh.
    pub vertex_count: usize,
    /// Number of triangles in the baked mesh.
    pub triangle_count: usize,
    /// Number of distinct undirected edges.
    pub edge_count: usize,

    /// Edges with exactly one adjacent triangle (open mesh boundary).
    pub boundary_edge_count: usize,
    /// Triangles with near-zero area, excluded from normal accumulation.
    pub degenerate_triangle_count: usize,
    /// Vertices whose accumulated pseudonormal had zero length.
    pub degenerate_vertex_normal_count: usize,
    /// Edges whose accumulated pseudonormal had zero length.
    pub degenerate_edge_normal_count: usize,
    /// Submeshes beyond the first, which were not baked.
    pub submeshes_skipped: usize,
}

impl BakeReport {
    /// Check whether the bake produced no warnings at all.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !self.has_warnings()
    }

    /// Check whether any non-fatal condition was recorded.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.degenerate_triangle_count > 0
            || self.degenerate_vertex_normal_count > 0
            || self.degenerate_edge_normal_count > 0
            || self.submeshes_skipped > 0
    }

    /// Total number of features whose pseudonormal is degenerate.
    ///
    /// Signs queried at these features resolve to
    /// [`Sign::Undefined`](crate::Sign).
    #[must_use]
    pub fn degenerate_feature_count(&self) -> usize {
        self.degenerate_vertex_normal_count + self.degenerate_edge_normal_count
    }

    /// Check whether the mesh appears watertight (no boundary edges).
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.boundary_edge_count == 0
    }
}

impl std::fmt::Display for BakeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SDF Bake Report:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Triangles: {}", self.triangle_count)?;
        writeln!(f, "  Edges: {}", self.edge_count)?;
        writeln!(
            f,
            "  Watertight: {}",
            if self.is_watertight() { "Yes" } else { "No" }
        )?;

        if self.has_warnings() {
            writeln!(f, "  Warnings:")?;
            if self.submeshes_skipped > 0 {
                writeln!(f, "    Submeshes skipped: {}", self.submeshes_skipped)?;
            }
            if self.degenerate_triangle_count > 0 {
                writeln!(
                    f,
                    "    Degenerate triangles: {}",
                    self.degenerate_triangle_count
                )?;
            }
            if self.degenerate_vertex_normal_count > 0 {
                writeln!(
                    f,
                    "    Degenerate vertex normals: {}",
                    self.degenerate_vertex_normal_count
                )?;
            }
            if self.degenerate_edge_normal_count > 0 {
                writeln!(
                    f,
                    "    Degenerate edge normals: {}",
                    self.degenerate_edge_normal_count
                )?;
            }
        }

        Ok(())
    }
}
