use cubecl::prelude::*;

use super::{TileConfig, TileMatmul};

/// Tile matmul made of scalar multiply-adds, accumulating one product at a time.
pub struct RegisterMatmul;

/// Unrolling every loop multiplies the kernel size by the warp tile size.
static UNROLL: bool = false;

#[cube]
impl TileMatmul for RegisterMatmul {
    fn execute<ES: Float, EA: Float>(
        lhs: &Array<ES>,
        rhs: &Slice<ES>,
        rhs_start: u32,
        acc: &mut Array<EA>,
        #[comptime] config: TileConfig,
    ) {
        let (rows, cols, k, rhs_stride) = comptime!((
            config.rows_per_unit,
            config.warp_n,
            config.instruction.k,
            config.rhs_stride
        ));

        #[unroll(UNROLL)]
        for row in 0..rows {
            #[unroll(UNROLL)]
            for k_ in 0..k {
                let lhs_elem = EA::cast_from(lhs[row * k + k_]);
                let rhs_row = rhs_start + k_ * rhs_stride;

                #[unroll(UNROLL)]
                for col in 0..cols {
                    acc[row * cols + col] += lhs_elem * EA::cast_from(rhs[rhs_row + col]);
                }
            }
        }
    }
}
