use cubecl::prelude::*;

use crate::components::{MatmulDim, TilingScheme};

/// Warp tile computed by one plane within the threadblock tile.
///
/// Planes are numbered with `m` varying fastest, then `n`, then the reduction partition `k`.
#[derive(CubeType, Clone, Copy)]
pub struct PlanePartition {
    /// First row of the warp tile in the threadblock tile.
    pub row_offset: u32,
    /// First column of the warp tile in the threadblock tile.
    pub col_offset: u32,
    /// First reduction index of the warp tile in the threadblock tile.
    pub k_offset: u32,
    /// Reduction partition of the plane.
    pub k_index: u32,
}

#[cube]
impl PlanePartition {
    pub fn new(plane: u32, #[comptime] tiling: TilingScheme) -> PlanePartition {
        let (warps_m, warps_mn) = comptime!((
            tiling.warps(MatmulDim::M),
            tiling.warps(MatmulDim::M) * tiling.warps(MatmulDim::N)
        ));
        let index_mn = plane % warps_mn;
        let k_index = plane / warps_mn;

        PlanePartition {
            row_offset: (index_mn % warps_m) * tiling.warp.m,
            col_offset: (index_mn / warps_m) * tiling.warp.n,
            k_offset: k_index * tiling.warp.k,
            k_index,
        }
    }

    /// Whether the plane owns the final accumulator of its warp tile.
    pub fn is_reduction_root(&self) -> bool {
        self.k_index == 0
    }
}
