use cubecl::prelude::*;

use super::{EpilogueConfig, EpilogueScalars, GlobalView};
use crate::components::{
    CausalMask, linear_combination,
    stage::{PlanePartition, StageConfig},
};

/// Turns first stage accumulator elements of a warp tile into the operand of the second stage.
///
/// Applies, in order: the epilogue operation with the bias, the causal mask, then the
/// narrowing to the stage element type. Elements outside the problem become zero so they don't
/// contribute to the second stage.
#[derive(CubeType)]
pub struct IntermediateEpilogue<EA: Float> {
    /// The bias from the first element of the warp tile, bounded by the intermediate.
    bias: GlobalView,
    mask: CausalMask,
    alpha: EA,
    beta: EA,
    mask_fill: EA,
    #[cube(comptime)]
    config: EpilogueConfig,
}

#[cube]
impl<EA: Float> IntermediateEpilogue<EA> {
    /// `bias` starts at `(row, col)` of the intermediate, the first element of the warp tile.
    pub fn new(
        bias: GlobalView,
        row: u32,
        col: u32,
        scalars: &EpilogueScalars<EA>,
        #[comptime] causal: bool,
        #[comptime] config: EpilogueConfig,
    ) -> IntermediateEpilogue<EA> {
        IntermediateEpilogue::<EA> {
            bias,
            mask: CausalMask::new(row, col, causal),
            alpha: scalars.alpha0,
            beta: scalars.beta0,
            mask_fill: scalars.mask_fill0,
            config,
        }
    }

    /// Intermediate element `(row, col)` of the warp tile.
    pub fn transform<ES: Float, EO: Float>(
        &self,
        bias0: &Array<EO>,
        acc: EA,
        row: u32,
        col: u32,
    ) -> ES {
        let mut value = ES::from_int(0);

        if self.bias.is_in_bounds(row, col) {
            let mut combined = self.mask_fill;

            if self.mask.is_kept(row, col) {
                let mut bias = EA::from_int(0);
                if comptime!(self.config.bias0) {
                    bias = EA::cast_from(bias0[self.bias.index(row, col)]);
                }
                combined = linear_combination::<EA>(
                    acc,
                    bias,
                    self.alpha,
                    self.beta,
                    self.config.bias0,
                    self.config.activation0,
                );
            }

            value = ES::cast_from(combined);
        }

        value
    }
}

/// The intermediate rows owned by the unit, over the whole threadblock width.
///
/// Needs the warp tiles of the first stage to span the threadblock columns.
#[cube]
pub fn intermediate_to_registers<EA: Float, ES: Float, EO: Float>(
    acc: &Array<EA>,
    bias0: &Array<EO>,
    epilogue: &IntermediateEpilogue<EA>,
    #[comptime] config: StageConfig,
) -> Array<ES> {
    let (rows, warp_m, warp_n, plane_dim) = comptime!((
        config.rows_per_unit(),
        config.tiling.warp.m,
        config.tiling.warp.n,
        config.plane_dim
    ));
    let mut intermediate = Array::<ES>::new(comptime!(rows * warp_n));

    for i in 0..rows {
        let row = UNIT_POS_X + i * plane_dim;
        let is_owned = row < warp_m;

        for col in 0..warp_n {
            let mut value = ES::from_int(0);
            if is_owned {
                value = epilogue.transform::<ES, EO>(bias0, acc[i * warp_n + col], row, col);
            }
            intermediate[i * warp_n + col] = value;
        }
    }

    intermediate
}

/// Writes the warp tile of the plane into the `threadblock.m × threadblock.n` intermediate.
///
/// Only the planes owning a final accumulator write.
#[cube]
pub fn intermediate_to_shared<EA: Float, ES: Float, EO: Float>(
    acc: &Array<EA>,
    bias0: &Array<EO>,
    epilogue: &IntermediateEpilogue<EA>,
    partition: &PlanePartition,
    intermediate: &mut SharedMemory<ES>,
    #[comptime] config: StageConfig,
) {
    let (rows, warp_m, warp_n, tile_n, plane_dim) = comptime!((
        config.rows_per_unit(),
        config.tiling.warp.m,
        config.tiling.warp.n,
        config.tiling.threadblock.n,
        config.plane_dim
    ));

    if partition.is_reduction_root() {
        for i in 0..rows {
            let row = UNIT_POS_X + i * plane_dim;

            if row < warp_m {
                let start = (partition.row_offset + row) * tile_n + partition.col_offset;
                for col in 0..warp_n {
                    intermediate[start + col] =
                        epilogue.transform::<ES, EO>(bias0, acc[i * warp_n + col], row, col);
                }
            }
        }
    }
}
