use cubecl::prelude::*;

use super::{
    B2bKernelConfig, EpilogueScalars, GlobalView, IntermediateEpilogue, ProblemSize,
    ReductionAxis, fill_ahead, fill_prologue, intermediate_to_registers, intermediate_to_shared,
    metadata_slot, reduce_partitions, tile_count, write_output,
};
use crate::components::{
    AccumulatorStaging, B2bIdent,
    stage::{PlanePartition, allocate_ring, init_accumulator, slot_start, stage_matmul},
};

/// Shared memory rings through which the operands are staged.
#[derive(CubeType)]
pub struct B2bRings<ES: Float> {
    pub lhs0: SharedMemory<ES>,
    pub rhs0: SharedMemory<ES>,
    pub rhs1: SharedMemory<ES>,
}

#[cube]
impl<ES: Float> B2bRings<ES> {
    pub fn new(#[comptime] config: B2bKernelConfig) -> B2bRings<ES> {
        B2bRings::<ES> {
            lhs0: allocate_ring::<ES>(comptime!(config.lhs0_ring())),
            rhs0: allocate_ring::<ES>(comptime!(config.rhs0_ring())),
            rhs1: allocate_ring::<ES>(comptime!(config.rhs1_ring())),
        }
    }
}

/// Computes the output tile `(row_tile, col_tile)` of problem `instance` with both stages
/// chained inside the cube.
///
/// While the tile of one ring slot is multiplied, the following slots are being filled. The
/// `B1` prologue is issued before the intermediate is produced, so its first tiles are in
/// flight during the intermediate epilogue. The intermediate never leaves the cube.
///
/// Every unit of the cube must call this function with the same tile.
#[cube]
#[allow(clippy::too_many_arguments)]
pub fn execute_tile<EI: Float, ES: Float, EA: Float, EO: Float>(
    lhs0: &Array<EI>,
    rhs0: &Array<EI>,
    rhs1: &Array<EI>,
    bias0: &Array<EO>,
    source1: &Array<EO>,
    out: &mut Array<EO>,
    metadata: &Array<u32>,
    rings: &mut B2bRings<ES>,
    scalars: &EpilogueScalars<EA>,
    instance: u32,
    row_tile: u32,
    col_tile: u32,
    #[comptime] config: B2bKernelConfig,
) {
    let (tiling0, tiling1, plane_dim) =
        comptime!((config.gemm0.tiling, config.gemm1.tiling, config.gemm0.plane_dim));
    let (tb0_m, tb0_n, tb0_k, tb1_n, tb1_k) = comptime!((
        tiling0.threadblock.m,
        tiling0.threadblock.n,
        tiling0.threadblock.k,
        tiling1.threadblock.n,
        tiling1.threadblock.k
    ));
    let (lhs0_geometry, rhs0_geometry, rhs1_geometry) =
        comptime!((config.lhs0_ring(), config.rhs0_ring(), config.rhs1_ring()));

    let problem = ProblemSize::read(metadata, instance);
    let row_origin = row_tile * tb0_m;
    let col_origin = col_tile * tb1_n;

    // First stage: A·B over the whole reduction, one row block of the intermediate.
    let partition0 = PlanePartition::new(UNIT_POS_Y, tiling0);
    let mut acc0 = init_accumulator::<EA>(config.gemm0);

    let lhs0_view = GlobalView::from_metadata(
        metadata,
        instance,
        comptime!(metadata_slot(B2bIdent::Lhs0)),
        problem.m,
        problem.k0,
    )
    .offset(row_origin, 0);
    let rhs0_view = GlobalView::from_metadata(
        metadata,
        instance,
        comptime!(metadata_slot(B2bIdent::Rhs0)),
        problem.k0,
        problem.n0,
    );
    let num_k_tiles0 = tile_count(problem.k0, tb0_k);

    fill_prologue::<EI, ES>(
        lhs0,
        &lhs0_view,
        &mut rings.lhs0,
        num_k_tiles0,
        lhs0_geometry,
        ReductionAxis::Col,
    );
    fill_prologue::<EI, ES>(
        rhs0,
        &rhs0_view,
        &mut rings.rhs0,
        num_k_tiles0,
        rhs0_geometry,
        ReductionAxis::Row,
    );
    sync_cube();

    let lhs0_row = (partition0.row_offset + UNIT_POS_X) * tb0_k;
    for k_tile in 0..num_k_tiles0 {
        stage_matmul::<ES, EA>(
            &rings.lhs0.to_slice(),
            slot_start(k_tile, lhs0_geometry) + lhs0_row,
            comptime!(plane_dim * tb0_k),
            &rings.rhs0.to_slice(),
            slot_start(k_tile, rhs0_geometry),
            &partition0,
            &mut acc0,
            config.gemm0,
        );

        fill_ahead::<EI, ES>(
            lhs0,
            &lhs0_view,
            &mut rings.lhs0,
            k_tile,
            num_k_tiles0,
            lhs0_geometry,
            ReductionAxis::Col,
        );
        fill_ahead::<EI, ES>(
            rhs0,
            &rhs0_view,
            &mut rings.rhs0,
            k_tile,
            num_k_tiles0,
            rhs0_geometry,
            ReductionAxis::Row,
        );
        sync_cube();
    }

    let rhs1_view = GlobalView::from_metadata(
        metadata,
        instance,
        comptime!(metadata_slot(B2bIdent::Rhs1)),
        problem.n0,
        problem.n1,
    )
    .offset(0, col_origin);
    let num_k_tiles1 = tile_count(problem.n0, tb1_k);

    fill_prologue::<EI, ES>(
        rhs1,
        &rhs1_view,
        &mut rings.rhs1,
        num_k_tiles1,
        rhs1_geometry,
        ReductionAxis::Row,
    );

    reduce_partitions::<EA>(&mut acc0, &partition0, config.gemm0);

    let intermediate_row = row_origin + partition0.row_offset;
    let bias_view = GlobalView::from_metadata(
        metadata,
        instance,
        comptime!(metadata_slot(B2bIdent::Bias0)),
        problem.m,
        problem.n0,
    )
    .offset(intermediate_row, partition0.col_offset);
    let epilogue0 = IntermediateEpilogue::<EA>::new(
        bias_view,
        intermediate_row,
        partition0.col_offset,
        scalars,
        config.causal_mask,
        config.epilogue,
    );

    // Second stage: the intermediate row block times B1.
    let partition1 = PlanePartition::new(UNIT_POS_Y, tiling1);
    let mut acc1 = init_accumulator::<EA>(config.gemm1);

    match comptime!(config.staging) {
        AccumulatorStaging::Registers => {
            let intermediate = intermediate_to_registers::<EA, ES, EO>(
                &acc0,
                bias0,
                &epilogue0,
                config.gemm0,
            );
            sync_cube();

            gemm1_mainloop::<EI, ES, EA>(
                &intermediate.to_slice(),
                0,
                tb0_n,
                rhs1,
                &rhs1_view,
                &mut rings.rhs1,
                num_k_tiles1,
                &partition1,
                &mut acc1,
                config,
            );
        }
        AccumulatorStaging::SharedMemory => {
            let mut intermediate = SharedMemory::<ES>::new(comptime!(tb0_m * tb0_n));
            intermediate_to_shared::<EA, ES, EO>(
                &acc0,
                bias0,
                &epilogue0,
                &partition0,
                &mut intermediate,
                config.gemm0,
            );
            sync_cube();

            gemm1_mainloop::<EI, ES, EA>(
                &intermediate.to_slice(),
                (partition1.row_offset + UNIT_POS_X) * tb0_n,
                comptime!(plane_dim * tb0_n),
                rhs1,
                &rhs1_view,
                &mut rings.rhs1,
                num_k_tiles1,
                &partition1,
                &mut acc1,
                config,
            );
        }
    }

    reduce_partitions::<EA>(&mut acc1, &partition1, config.gemm1);

    if partition1.is_reduction_root() {
        let row = row_origin + partition1.row_offset;
        let col = col_origin + partition1.col_offset;
        let out_view = GlobalView::from_metadata(
            metadata,
            instance,
            comptime!(metadata_slot(B2bIdent::Out)),
            problem.m,
            problem.n1,
        )
        .offset(row, col);
        let source_view = GlobalView::from_metadata(
            metadata,
            instance,
            comptime!(metadata_slot(B2bIdent::Source1)),
            problem.m,
            problem.n1,
        )
        .offset(row, col);

        write_output::<EA, EO>(
            &acc1,
            source1,
            out,
            &out_view,
            &source_view,
            scalars,
            config.gemm1,
            config.epilogue,
        );
    }
}

/// Reduction of the second stage over the intermediate columns.
///
/// Row `i` of the unit starts at `lhs_start + i * lhs_unit_stride` in `lhs`.
#[cube]
#[allow(clippy::too_many_arguments)]
fn gemm1_mainloop<EI: Float, ES: Float, EA: Float>(
    lhs: &Slice<ES>,
    lhs_start: u32,
    #[comptime] lhs_unit_stride: u32,
    rhs1: &Array<EI>,
    rhs1_view: &GlobalView,
    ring: &mut SharedMemory<ES>,
    num_k_tiles: u32,
    partition: &PlanePartition,
    acc: &mut Array<EA>,
    #[comptime] config: B2bKernelConfig,
) {
    let tb1_k = comptime!(config.gemm1.tiling.threadblock.k);
    let geometry = comptime!(config.rhs1_ring());

    for k_tile in 0..num_k_tiles {
        stage_matmul::<ES, EA>(
            lhs,
            lhs_start + k_tile * tb1_k,
            lhs_unit_stride,
            &ring.to_slice(),
            slot_start(k_tile, geometry),
            partition,
            acc,
            config.gemm1,
        );

        fill_ahead::<EI, ES>(
            rhs1,
            rhs1_view,
            ring,
            k_tile,
            num_k_tiles,
            geometry,
            ReductionAxis::Row,
        );
        sync_cube();
    }
}
