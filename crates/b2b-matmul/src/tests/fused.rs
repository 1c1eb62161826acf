use pretty_assertions::assert_eq;

use super::{launcher::B2bTestCase, test_utils::test_client};
use crate::components::{
    AccumulatorStaging, Activation, B2bEpilogue, B2bLayouts, B2bProblem, B2bSelection,
    B2bSelectionBuilder, B2bTilingScheme, CubeCountPlan, FullPrecision, LinearCombination,
    LinearCombinationActivation, MatrixLayout, OperatorClass, TilingScheme, batch::GlobalOrder,
};

type Epilogue = B2bEpilogue<LinearCombinationActivation, LinearCombination>;

const EPSILON: f32 = 1e-4;

fn tiling_scheme(
    (threadblock0, warp0): ((u32, u32, u32), (u32, u32, u32)),
    (threadblock1, warp1): ((u32, u32, u32), (u32, u32, u32)),
) -> B2bTilingScheme {
    let stage = |threadblock: (u32, u32, u32), warp: (u32, u32, u32)| {
        TilingScheme::builder()
            .with_threadblock(threadblock)
            .with_warp(warp)
            .with_instruction((1, 1, 1))
            .build()
            .unwrap()
    };

    B2bTilingScheme::new(stage(threadblock0, warp0), stage(threadblock1, warp1))
}

/// Row tiles of 32 and column tiles of 16 over two planes, the intermediate kept in
/// registers.
fn register_tiling() -> B2bTilingScheme {
    tiling_scheme(((32, 32, 8), (16, 32, 8)), ((32, 16, 8), (16, 16, 8)))
}

/// Four planes per stage, each computing a quarter of the intermediate.
fn shared_memory_tiling() -> B2bTilingScheme {
    tiling_scheme(((32, 32, 8), (16, 16, 8)), ((32, 16, 8), (16, 8, 8)))
}

/// Two planes per stage splitting the reduction of both stages.
fn split_reduction_tiling() -> B2bTilingScheme {
    tiling_scheme(((16, 16, 16), (16, 16, 8)), ((16, 16, 16), (16, 16, 8)))
}

fn simt(tiling: B2bTilingScheme) -> B2bSelectionBuilder {
    B2bSelection::builder(tiling, 32).operator_class(OperatorClass::Simt)
}

fn relu_epilogue() -> Epilogue {
    B2bEpilogue::new(
        LinearCombinationActivation::activation(Activation::Relu),
        LinearCombination::default(),
    )
}

#[test_log::test]
fn causal_mask_over_row_blocks() {
    let selection = simt(register_tiling()).causal_mask(true).build();

    B2bTestCase::new(
        selection,
        relu_epilogue(),
        vec![B2bProblem::new(64, 32, 40, 16)],
    )
    .run::<FullPrecision>(&test_client(), EPSILON);
}

#[test_log::test]
fn sigmoid_sees_unmasked_values() {
    let selection = simt(register_tiling()).causal_mask(true).build();
    let epilogue = B2bEpilogue::new(
        LinearCombinationActivation::activation(Activation::Sigmoid),
        LinearCombination::default(),
    );

    B2bTestCase::new(selection, epilogue, vec![B2bProblem::new(32, 32, 16, 16)])
        .run::<FullPrecision>(&test_client(), EPSILON);
}

#[test_log::test]
fn partial_tiles_are_never_read_nor_written_past_bounds() {
    let selection = simt(register_tiling()).causal_mask(true).build();

    B2bTestCase::new(
        selection,
        relu_epilogue(),
        vec![B2bProblem::new(50, 27, 21, 19)],
    )
    .with_padding(3)
    .run::<FullPrecision>(&test_client(), EPSILON);
}

#[test_log::test]
fn grouped_problems_of_unequal_sizes() {
    let selection = simt(register_tiling())
        .global_order(GlobalOrder::SwizzleRowMajor(2))
        .cube_count_plan(CubeCountPlan::Fixed(3))
        .build();

    B2bTestCase::new(
        selection,
        relu_epilogue(),
        vec![
            B2bProblem::new(64, 24, 20, 32),
            B2bProblem::new(20, 32, 8, 12),
            B2bProblem::new(0, 16, 8, 16),
            B2bProblem::new(70, 9, 35, 35),
        ],
    )
    .with_padding(3)
    .run::<FullPrecision>(&test_client(), EPSILON);
}

#[test_log::test]
fn pipeline_depth_doesnt_change_the_output() {
    let outputs: Vec<_> = [3, 4, 5]
        .into_iter()
        .map(|stages| {
            let selection = simt(register_tiling())
                .stages(stages)
                .causal_mask(true)
                .build();

            B2bTestCase::new(
                selection,
                relu_epilogue(),
                vec![B2bProblem::new(48, 28, 80, 32)],
            )
            .run::<FullPrecision>(&test_client(), EPSILON)
        })
        .collect();

    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[0], outputs[2]);
}

#[test_log::test]
fn intermediate_through_shared_memory() {
    let selection = simt(shared_memory_tiling())
        .accumulator_staging(AccumulatorStaging::SharedMemory)
        .causal_mask(true)
        .build();

    B2bTestCase::new(
        selection,
        relu_epilogue(),
        vec![B2bProblem::new(70, 30, 44, 40)],
    )
    .run::<FullPrecision>(&test_client(), EPSILON);
}

#[test_log::test]
fn reduction_split_over_planes() {
    let selection = simt(split_reduction_tiling())
        .accumulator_staging(AccumulatorStaging::SharedMemory)
        .causal_mask(true)
        .cube_count_plan(CubeCountPlan::Fixed(2))
        .build();

    B2bTestCase::new(
        selection,
        relu_epilogue(),
        vec![B2bProblem::new(40, 16, 40, 24)],
    )
    .run::<FullPrecision>(&test_client(), EPSILON);
}

#[test_log::test]
fn transposed_operands() {
    let layouts = B2bLayouts {
        lhs0: MatrixLayout::ColMajor,
        rhs0: MatrixLayout::RowMajor,
        rhs1: MatrixLayout::ColMajor,
        out: MatrixLayout::RowMajor,
    };
    let selection = simt(register_tiling())
        .layouts(layouts)
        .causal_mask(true)
        .build();

    B2bTestCase::new(
        selection,
        relu_epilogue(),
        vec![B2bProblem::new(50, 30, 20, 45)],
    )
    .with_padding(5)
    .run::<FullPrecision>(&test_client(), EPSILON);
}

#[test_log::test]
fn bias_and_source_are_combined() {
    let selection = simt(register_tiling()).build();
    let epilogue = B2bEpilogue::new(
        LinearCombinationActivation::new(1.0, 1.0, Activation::Gelu),
        LinearCombination::new(2.0, 0.5),
    );

    B2bTestCase::new(
        selection,
        epilogue,
        vec![B2bProblem::new(40, 32, 24, 40), B2bProblem::new(17, 5, 9, 3)],
    )
    .with_padding(2)
    .run::<FullPrecision>(&test_client(), EPSILON);
}

#[test_log::test]
fn source_may_alias_the_output() {
    let selection = simt(register_tiling()).build();
    let epilogue = B2bEpilogue::new(
        LinearCombinationActivation::activation(Activation::Silu),
        LinearCombination::new(1.0, 1.0),
    );

    B2bTestCase::new(selection, epilogue, vec![B2bProblem::new(35, 20, 16, 20)])
        .with_padding(2)
        .with_source_aliasing_out()
        .run::<FullPrecision>(&test_client(), EPSILON);
}

#[test_log::test]
fn empty_group_launches_nothing() {
    let selection = simt(register_tiling()).build();

    let outputs = B2bTestCase::new(
        selection,
        relu_epilogue(),
        vec![B2bProblem::new(0, 32, 16, 16), B2bProblem::new(16, 32, 16, 0)],
    )
    .run::<FullPrecision>(&test_client(), EPSILON);

    assert!(outputs.iter().all(|output| output.is_empty()));
}
