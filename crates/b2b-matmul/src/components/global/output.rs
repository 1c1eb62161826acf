use cubecl::prelude::*;

use super::{EpilogueConfig, EpilogueScalars, GlobalView, SourceLocation};
use crate::components::{linear_combination, stage::StageConfig};

/// Writes the second stage accumulator of a unit to the output.
///
/// `out` and `source` start at the first element of the warp tile. Each source element is
/// read before its output element is written, so both may share a buffer. Elements outside
/// the problem are left untouched.
#[cube]
pub fn write_output<EA: Float, EO: Float>(
    acc: &Array<EA>,
    source1: &Array<EO>,
    out: &mut Array<EO>,
    out_view: &GlobalView,
    source_view: &GlobalView,
    scalars: &EpilogueScalars<EA>,
    #[comptime] config: StageConfig,
    #[comptime] epilogue: EpilogueConfig,
) {
    let (rows, warp_m, warp_n, plane_dim) = comptime!((
        config.rows_per_unit(),
        config.tiling.warp.m,
        config.tiling.warp.n,
        config.plane_dim
    ));
    let with_source = comptime!(epilogue.source1 != SourceLocation::Absent);

    for i in 0..rows {
        let row = UNIT_POS_X + i * plane_dim;

        if row < warp_m {
            for col in 0..warp_n {
                if out_view.is_in_bounds(row, col) {
                    let mut source = EA::from_int(0);
                    if comptime!(epilogue.source1 == SourceLocation::Buffer) {
                        source = EA::cast_from(source1[source_view.index(row, col)]);
                    }
                    if comptime!(epilogue.source1 == SourceLocation::Out) {
                        source = EA::cast_from(out[source_view.index(row, col)]);
                    }

                    let value = linear_combination::<EA>(
                        acc[i * warp_n + col],
                        source,
                        scalars.alpha1,
                        scalars.beta1,
                        with_source,
                        epilogue.activation1,
                    );
                    out[out_view.index(row, col)] = EO::cast_from(value);
                }
            }
        }
    }
}
