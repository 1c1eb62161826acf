use cubecl::prelude::*;

use crate::components::stage::{PlanePartition, StageConfig};

/// Sums the partial accumulators of the planes sharing a warp tile into the plane of the
/// first reduction partition.
///
/// Does nothing unless the reduction of the stage is split over planes. Otherwise every unit
/// must call this function, since it synchronizes the cube.
#[cube]
pub fn reduce_partitions<EA: Float>(
    acc: &mut Array<EA>,
    partition: &PlanePartition,
    #[comptime] config: StageConfig,
) {
    let partitions = comptime!(config.tiling.partitions_k());

    if comptime!(partitions > 1) {
        let (rows, warp_m, warp_n, tile_n, tile_size, plane_dim) = comptime!((
            config.rows_per_unit(),
            config.tiling.warp.m,
            config.tiling.warp.n,
            config.tiling.threadblock.n,
            config.tiling.threadblock.m * config.tiling.threadblock.n,
            config.plane_dim
        ));
        let mut partials = SharedMemory::<EA>::new(comptime!(partitions * tile_size));

        for i in 0..rows {
            let row = UNIT_POS_X + i * plane_dim;
            if row < warp_m {
                let start = partition.k_index * tile_size
                    + (partition.row_offset + row) * tile_n
                    + partition.col_offset;
                for col in 0..warp_n {
                    partials[start + col] = acc[i * warp_n + col];
                }
            }
        }

        sync_cube();

        if partition.is_reduction_root() {
            for i in 0..rows {
                let row = UNIT_POS_X + i * plane_dim;
                if row < warp_m {
                    let start = (partition.row_offset + row) * tile_n + partition.col_offset;
                    for col in 0..warp_n {
                        let mut sum = acc[i * warp_n + col];
                        for partition_k in 1..partitions {
                            sum += partials[partition_k * tile_size + start + col];
                        }
                        acc[i * warp_n + col] = sum;
                    }
                }
            }
        }
    }
}
