use cubecl::prelude::*;

use super::SCHEDULE_WORDS;
use crate::components::global::{B2bKernelConfig, B2bRings, EpilogueScalars, execute_tile};

/// Fused matmul over a group of problems.
///
/// `schedule` lists the tiles of the group; cube `c` computes tiles `c`, `c + num_cubes`,
/// `c + 2 * num_cubes` and so on. Operands absent from the epilogues are bound to placeholder
/// buffers that are never read.
#[cube(launch_unchecked)]
#[allow(clippy::too_many_arguments)]
pub(crate) fn b2b_gemm<EI: Float, ES: Float, EA: Float, EO: Float>(
    lhs0: &Array<EI>,
    rhs0: &Array<EI>,
    rhs1: &Array<EI>,
    bias0: &Array<EO>,
    source1: &Array<EO>,
    out: &mut Array<EO>,
    metadata: &Array<u32>,
    schedule: &Array<u32>,
    alpha0: f32,
    beta0: f32,
    mask_fill0: f32,
    alpha1: f32,
    beta1: f32,
    num_tiles: u32,
    num_cubes: u32,
    #[comptime] config: B2bKernelConfig,
) {
    if CUBE_POS >= num_cubes {
        terminate!();
    }

    let scalars = EpilogueScalars::<EA>::new(alpha0, beta0, mask_fill0, alpha1, beta1);
    let mut rings = B2bRings::<ES>::new(config);

    let mut linear = CUBE_POS;
    while linear < num_tiles {
        let start = linear * comptime!(SCHEDULE_WORDS);

        execute_tile::<EI, ES, EA, EO>(
            lhs0,
            rhs0,
            rhs1,
            bias0,
            source1,
            out,
            metadata,
            &mut rings,
            &scalars,
            schedule[start],
            schedule[start + 1],
            schedule[start + 2],
            config,
        );

        // The next tile refills the rings.
        sync_cube();
        linear += num_cubes;
    }
}
