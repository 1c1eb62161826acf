use cubecl::prelude::*;

use super::{AcceleratedMatmul, RegisterMatmul};
use crate::components::GemmShape;

/// Geometry of the tile matmuls of one unit.
///
/// A unit owns `rows_per_unit` rows of the warp tile of its plane, each spanning the `warp_n`
/// columns of the warp tile.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct TileConfig {
    pub rows_per_unit: u32,
    pub warp_n: u32,
    pub instruction: GemmShape,
    /// Distance between two rows of the right operand in stage memory.
    pub rhs_stride: u32,
    pub kind: TileMatmulKind,
}

/// Multiply-accumulate of one instruction step along the reduction dimension.
///
/// `lhs` holds `rows_per_unit × instruction.k` elements of the rows owned by the unit. The
/// right operand is read from stage memory: `instruction.k` rows of `warp_n` elements starting
/// at `rhs_start`. `acc` holds `rows_per_unit × warp_n` elements.
#[cube]
pub trait TileMatmul: 'static + Send + Sync {
    fn execute<ES: Float, EA: Float>(
        lhs: &Array<ES>,
        rhs: &Slice<ES>,
        rhs_start: u32,
        acc: &mut Array<EA>,
        #[comptime] config: TileConfig,
    );
}

/// The tile matmul selected by a variant.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum TileMatmulKind {
    /// Scalar fused multiply-adds.
    Register,
    /// Matrix multiply-accumulate instructions.
    Accelerated,
}

/// Runs the tile matmul of `config.kind`.
#[cube]
pub fn tile_matmul<ES: Float, EA: Float>(
    lhs: &Array<ES>,
    rhs: &Slice<ES>,
    rhs_start: u32,
    acc: &mut Array<EA>,
    #[comptime] config: TileConfig,
) {
    match comptime!(config.kind) {
        TileMatmulKind::Register => {
            RegisterMatmul::execute::<ES, EA>(lhs, rhs, rhs_start, acc, config)
        }
        TileMatmulKind::Accelerated => {
            AcceleratedMatmul::execute::<ES, EA>(lhs, rhs, rhs_start, acc, config)
        }
    }
}
