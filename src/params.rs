//! Parameters for signed distance field baking.

/// Parameters controlling a bake.
///
/// # Example
///
/// ```
/// use mesh_sdf_bake::BakeParams;
///
/// // Defaults are suitable for meshes in the unit-to-meter scale range
/// let params = BakeParams::default();
/// assert!(params.parallel);
///
/// // Force single-threaded accumulation for bit-exact reproducibility
/// let serial = BakeParams::serial();
/// assert!(!serial.parallel);
/// ```
#[derive(Debug, Clone)]
pub struct BakeParams {
    /// Tolerance used when classifying a closest point as lying on an
    /// edge or at a vertex rather than in the face interior. Expressed
    /// as a barycentric tolerance, so it is scale-independent.
    pub feature_epsilon: f64,

    /// Triangles with area below this value are treated as degenerate:
    /// they stay valid BVH leaves but contribute nothing to the
    /// pseudonormal sums.
    pub degenerate_epsilon: f64,

    /// Whether to parallelize the build phase with rayon.
    pub parallel: bool,

    /// Minimum triangle count before parallel accumulation kicks in.
    /// Below this, the serial path is used even when `parallel` is set.
    pub parallel_threshold: usize,
}

impl Default for BakeParams {
    fn default() -> Self {
        Self {
            feature_epsilon: 1e-9,
            degenerate_epsilon: 1e-12,
            parallel: true,
            parallel_threshold: 4096,
        }
    }
}

impl BakeParams {
    /// Create params that force single-threaded accumulation.
    ///
    /// Parallel accumulation is deterministic only up to floating-point
    /// summation order; the serial path is bit-exact across runs.
    #[must_use]
    pub fn serial() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }
}
