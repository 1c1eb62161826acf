use cubecl::prelude::*;

use super::PlanePartition;
use crate::components::{
    MatmulDim, TilingScheme,
    tile::{TileConfig, TileMatmulKind, tile_matmul},
};

/// Compile-time description of one multiply-accumulate stage.
///
/// Within its plane, lane `l` owns the warp tile rows `l`, `l + plane_dim`, `l + 2 * plane_dim`
/// and so on, each over the full width of the warp tile.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, new)]
pub struct StageConfig {
    pub tiling: TilingScheme,
    pub plane_dim: u32,
    pub tile_matmul: TileMatmulKind,
}

impl StageConfig {
    /// Warp tile rows owned by one unit, some of which may lie past the warp tile.
    pub fn rows_per_unit(&self) -> u32 {
        self.tiling.warp.m.div_ceil(self.plane_dim)
    }

    /// Elements of the accumulator of one unit.
    pub fn accumulator_size(&self) -> u32 {
        self.rows_per_unit() * self.tiling.warp.n
    }

    pub fn tile_config(&self) -> TileConfig {
        TileConfig {
            rows_per_unit: self.rows_per_unit(),
            warp_n: self.tiling.warp.n,
            instruction: self.tiling.instruction,
            rhs_stride: self.tiling.threadblock.n,
            kind: self.tile_matmul,
        }
    }
}

/// A zeroed accumulator for the rows of the warp tile owned by the unit.
#[cube]
pub fn init_accumulator<EA: Float>(#[comptime] config: StageConfig) -> Array<EA> {
    let size = comptime!(config.accumulator_size());
    let mut acc = Array::<EA>::new(size);

    for i in 0..size {
        acc[i] = EA::from_int(0);
    }

    acc
}

/// Accumulates the product of one reduction tile into `acc`, never resetting it.
///
/// Row `i` of the unit starts at `lhs_start + i * lhs_unit_stride` in `lhs`, at the first
/// reduction index of the threadblock tile. `rhs` holds the whole `threadblock.k ×
/// threadblock.n` reduction tile from `rhs_start`.
#[cube]
pub fn stage_matmul<ES: Float, EA: Float>(
    lhs: &Slice<ES>,
    lhs_start: u32,
    #[comptime] lhs_unit_stride: u32,
    rhs: &Slice<ES>,
    rhs_start: u32,
    partition: &PlanePartition,
    acc: &mut Array<EA>,
    #[comptime] config: StageConfig,
) {
    let (rows, warp_m, inst_k, k_steps, rhs_stride, plane_dim) = comptime!((
        config.rows_per_unit(),
        config.tiling.warp.m,
        config.tiling.instruction.k,
        config.tiling.instructions(MatmulDim::K),
        config.tiling.threadblock.n,
        config.plane_dim
    ));
    let tile_config = comptime!(config.tile_config());
    let mut fragment = Array::<ES>::new(comptime!(rows * inst_k));

    for step in 0..k_steps {
        let k = partition.k_offset + step * inst_k;

        for i in 0..rows {
            let is_owned = UNIT_POS_X + i * plane_dim < warp_m;
            let row_start = lhs_start + i * lhs_unit_stride + k;

            for k_ in 0..inst_k {
                let mut value = ES::from_int(0);
                if is_owned {
                    value = lhs[row_start + k_];
                }
                fragment[i * inst_k + k_] = value;
            }
        }

        tile_matmul::<ES, EA>(
            &fragment,
            rhs,
            rhs_start + k * rhs_stride + partition.col_offset,
            acc,
            tile_config,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::GemmShape;

    #[test]
    fn lanes_split_the_warp_rows() {
        let tiling = TilingScheme {
            threadblock: GemmShape::new(64, 32, 16),
            warp: GemmShape::new(48, 32, 16),
            instruction: GemmShape::new(16, 8, 16),
        };
        let config = StageConfig::new(tiling, 32, TileMatmulKind::Accelerated);

        assert_eq!(config.rows_per_unit(), 2);
        assert_eq!(config.accumulator_size(), 64);
        assert_eq!(config.tile_config().rhs_stride, 32);
    }
}
