use cubecl::prelude::*;

use super::{TileConfig, TileMatmul};

/// Tile matmul shaped like a matrix multiply-accumulate instruction.
///
/// Each output element of an `instruction.n` wide block first reduces its `instruction.k`
/// products, then adds the partial sum to the accumulator.
pub struct AcceleratedMatmul;

#[cube]
impl TileMatmul for AcceleratedMatmul {
    fn execute<ES: Float, EA: Float>(
        lhs: &Array<ES>,
        rhs: &Slice<ES>,
        rhs_start: u32,
        acc: &mut Array<EA>,
        #[comptime] config: TileConfig,
    ) {
        let (rows, cols, n, k, rhs_stride) = comptime!((
            config.rows_per_unit,
            config.warp_n,
            config.instruction.n,
            config.instruction.k,
            config.rhs_stride
        ));
        let num_blocks = comptime!(cols / n);

        for row in 0..rows {
            for block in 0..num_blocks {
                for n_ in 0..n {
                    let col = block * n + n_;
                    let mut partial = EA::from_int(0);

                    for k_ in 0..k {
                        partial += EA::cast_from(lhs[row * k + k_])
                            * EA::cast_from(rhs[rhs_start + k_ * rhs_stride + col]);
                    }

                    acc[row * cols + col] += partial;
                }
            }
        }
    }
}
