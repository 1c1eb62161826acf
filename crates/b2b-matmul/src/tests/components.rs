use cubecl::prelude::*;

use super::test_utils::{
    TestClient, TestRuntime, assert_equals_approx, create, read, sample, test_client,
};
use crate::components::{
    Activation, CausalMask, GemmShape, TilingScheme, activate, linear_combination,
    stage::PlanePartition,
    tile::{TileConfig, TileMatmulKind, tile_matmul},
};

#[cube(launch_unchecked)]
fn tile_matmul_kernel(
    lhs: &Array<f32>,
    rhs: &Array<f32>,
    acc: &mut Array<f32>,
    #[comptime] config: TileConfig,
) {
    let (lhs_size, acc_size) = comptime!((
        config.rows_per_unit * config.instruction.k,
        config.rows_per_unit * config.warp_n
    ));
    let mut fragment = Array::<f32>::new(lhs_size);
    let mut registers = Array::<f32>::new(acc_size);

    for i in 0..lhs_size {
        fragment[i] = lhs[i];
    }
    for i in 0..acc_size {
        registers[i] = acc[i];
    }

    tile_matmul::<f32, f32>(&fragment, &rhs.to_slice(), 0, &mut registers, config);

    for i in 0..acc_size {
        acc[i] = registers[i];
    }
}

#[cube(launch_unchecked)]
fn partition_kernel(out: &mut Array<u32>, #[comptime] tiling: TilingScheme, #[comptime] planes: u32) {
    for plane in 0..planes {
        let partition = PlanePartition::new(plane, tiling);
        let mut root = 0u32;
        if partition.is_reduction_root() {
            root = 1u32;
        }

        out[plane * 4] = partition.row_offset;
        out[plane * 4 + 1] = partition.col_offset;
        out[plane * 4 + 2] = partition.k_offset;
        out[plane * 4 + 3] = root;
    }
}

#[cube(launch_unchecked)]
fn activation_kernel(input: &Array<f32>, out: &mut Array<f32>, #[comptime] activation: Activation) {
    if ABSOLUTE_POS < input.len() {
        out[ABSOLUTE_POS] = activate::<f32>(input[ABSOLUTE_POS], activation);
    }
}

#[cube(launch_unchecked)]
fn linear_combination_kernel(
    accumulator: &Array<f32>,
    source: &Array<f32>,
    out: &mut Array<f32>,
    alpha: f32,
    beta: f32,
    #[comptime] with_source: bool,
) {
    if ABSOLUTE_POS < accumulator.len() {
        out[ABSOLUTE_POS] = linear_combination::<f32>(
            accumulator[ABSOLUTE_POS],
            source[ABSOLUTE_POS],
            alpha,
            beta,
            with_source,
            Activation::Identity,
        );
    }
}

#[cube(launch_unchecked)]
fn mask_kernel(
    out: &mut Array<u32>,
    row_offset: u32,
    col_offset: u32,
    #[comptime] size: u32,
    #[comptime] enabled: bool,
) {
    let mask = CausalMask::new(row_offset, col_offset, enabled);

    for i in 0..size {
        for j in 0..size {
            let mut kept = 0u32;
            if mask.is_kept(i, j) {
                kept = 1u32;
            }
            out[i * size + j] = kept;
        }
    }
}

fn single_unit() -> (CubeCount, CubeDim) {
    (CubeCount::Static(1, 1, 1), CubeDim::new_1d(1))
}

fn read_u32(client: &TestClient, handle: &cubecl::server::Handle) -> Vec<u32> {
    let bytes = client.read_one(handle.clone().binding());
    u32::from_bytes(&bytes).to_vec()
}

fn run_tile_matmul(
    client: &TestClient,
    lhs: &[f32],
    rhs: &[f32],
    acc: &[f32],
    config: TileConfig,
) -> Vec<f32> {
    let lhs_handle = create(client, lhs);
    let rhs_handle = create(client, rhs);
    let acc_handle = create(client, acc);
    let (cube_count, cube_dim) = single_unit();

    unsafe {
        tile_matmul_kernel::launch_unchecked::<TestRuntime>(
            client,
            cube_count,
            cube_dim,
            ArrayArg::from_raw_parts::<f32>(&lhs_handle, lhs.len(), 1),
            ArrayArg::from_raw_parts::<f32>(&rhs_handle, rhs.len(), 1),
            ArrayArg::from_raw_parts::<f32>(&acc_handle, acc.len(), 1),
            config,
        );
    }

    read(client, &acc_handle)
}

#[test]
fn tile_matmuls_accumulate_the_same_product() {
    let client = test_client();
    let (rows, warp_n, k, rhs_stride) = (3, 8, 4, 12);
    let config = |kind| TileConfig {
        rows_per_unit: rows,
        warp_n,
        instruction: GemmShape::new(16, 4, k),
        rhs_stride,
        kind,
    };

    let lhs = sample::<f32>((rows * k) as usize, 11);
    let rhs = sample::<f32>((k * rhs_stride) as usize, 12);
    let acc = sample::<f32>((rows * warp_n) as usize, 13);

    let mut expected = acc.clone();
    for r in 0..rows as usize {
        for c in 0..warp_n as usize {
            for k_ in 0..k as usize {
                expected[r * warp_n as usize + c] +=
                    lhs[r * k as usize + k_] * rhs[k_ * rhs_stride as usize + c];
            }
        }
    }

    for kind in [TileMatmulKind::Register, TileMatmulKind::Accelerated] {
        let actual = run_tile_matmul(&client, &lhs, &rhs, &acc, config(kind));

        if let Err(message) = assert_equals_approx(&actual, &expected, 1e-5) {
            panic!("{kind:?}: {message}");
        }
    }
}

#[test]
fn partitions_cover_the_threadblock() {
    let client = test_client();
    let tiling = TilingScheme {
        threadblock: GemmShape::new(64, 32, 32),
        warp: GemmShape::new(32, 16, 16),
        instruction: GemmShape::new(16, 8, 16),
    };
    let planes = 8;
    let out = client.create(u32::as_bytes(&[0; 32]));
    let (cube_count, cube_dim) = single_unit();

    unsafe {
        partition_kernel::launch_unchecked::<TestRuntime>(
            &client,
            cube_count,
            cube_dim,
            ArrayArg::from_raw_parts::<u32>(&out, 32, 1),
            tiling,
            planes,
        );
    }

    let expected = vec![
        0, 0, 0, 1, //
        32, 0, 0, 1, //
        0, 16, 0, 1, //
        32, 16, 0, 1, //
        0, 0, 16, 0, //
        32, 0, 16, 0, //
        0, 16, 16, 0, //
        32, 16, 16, 0,
    ];
    pretty_assertions::assert_eq!(read_u32(&client, &out), expected);
}

#[test]
fn activations_match_their_host_form() {
    let client = test_client();
    let input = (0..64).map(|i| (i as f32 - 32.0) / 8.0).collect::<Vec<_>>();
    let input_handle = create(&client, &input);

    for activation in [
        Activation::Identity,
        Activation::Relu,
        Activation::Sigmoid,
        Activation::Silu,
        Activation::Gelu,
        Activation::Tanh,
    ] {
        let out = create::<f32>(&client, &[0.0; 64]);

        unsafe {
            activation_kernel::launch_unchecked::<TestRuntime>(
                &client,
                CubeCount::Static(1, 1, 1),
                CubeDim::new_1d(64),
                ArrayArg::from_raw_parts::<f32>(&input_handle, input.len(), 1),
                ArrayArg::from_raw_parts::<f32>(&out, input.len(), 1),
                activation,
            );
        }

        let expected = input.iter().map(|&x| activation.apply(x)).collect::<Vec<_>>();
        if let Err(message) = assert_equals_approx(&read::<f32>(&client, &out), &expected, 1e-4) {
            panic!("{activation:?}: {message}");
        }
    }
}

#[test]
fn source_is_left_unread_without_beta() {
    let client = test_client();
    let accumulator = vec![1.0, -2.0, 3.0, 0.5];
    let source = vec![f32::NAN; 4];
    let accumulator_handle = create(&client, &accumulator);
    let source_handle = create(&client, &source);
    let out = create::<f32>(&client, &[0.0; 4]);

    unsafe {
        linear_combination_kernel::launch_unchecked::<TestRuntime>(
            &client,
            CubeCount::Static(1, 1, 1),
            CubeDim::new_1d(4),
            ArrayArg::from_raw_parts::<f32>(&accumulator_handle, 4, 1),
            ArrayArg::from_raw_parts::<f32>(&source_handle, 4, 1),
            ArrayArg::from_raw_parts::<f32>(&out, 4, 1),
            ScalarArg::new(2.0),
            ScalarArg::new(0.0),
            false,
        );
    }

    pretty_assertions::assert_eq!(read::<f32>(&client, &out), vec![2.0, -4.0, 6.0, 1.0]);
}

fn run_mask(client: &TestClient, row_offset: u32, col_offset: u32, enabled: bool) -> Vec<u32> {
    let out = client.create(u32::as_bytes(&[0; 16]));
    let (cube_count, cube_dim) = single_unit();

    unsafe {
        mask_kernel::launch_unchecked::<TestRuntime>(
            client,
            cube_count,
            cube_dim,
            ArrayArg::from_raw_parts::<u32>(&out, 16, 1),
            ScalarArg::new(row_offset),
            ScalarArg::new(col_offset),
            4,
            enabled,
        );
    }

    read_u32(client, &out)
}

#[test]
fn causal_mask_follows_global_coordinates() {
    let client = test_client();

    let diagonal_tile = vec![
        1, 0, 0, 0, //
        1, 1, 0, 0, //
        1, 1, 1, 0, //
        1, 1, 1, 1,
    ];
    pretty_assertions::assert_eq!(run_mask(&client, 8, 8, true), diagonal_tile);

    let below_diagonal = vec![1; 16];
    pretty_assertions::assert_eq!(run_mask(&client, 8, 4, true), below_diagonal);

    let above_diagonal = vec![0; 16];
    pretty_assertions::assert_eq!(run_mask(&client, 0, 4, true), above_diagonal);

    pretty_assertions::assert_eq!(run_mask(&client, 0, 4, false), vec![1; 16]);
}
