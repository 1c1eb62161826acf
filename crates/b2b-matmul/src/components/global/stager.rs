use cubecl::prelude::*;

use super::GlobalView;
use crate::components::stage::{StageRing, slot_start};

/// Dimension along which an operand is reduced.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ReductionAxis {
    /// Successive reduction tiles are side by side, like for a left operand.
    Col,
    /// Successive reduction tiles are stacked, like for a right operand.
    Row,
}

/// Copies reduction tile `k_tile` of an operand from global memory into its ring slot.
///
/// Every unit of the cube copies the elements congruent to its position, so every unit must
/// call this function for the tile to be complete. Elements outside the problem are written
/// as zero, so a partial tile contributes nothing to the products.
#[cube]
pub fn fill_slot<EI: Float, ES: Float>(
    global: &Array<EI>,
    view: &GlobalView,
    ring: &mut SharedMemory<ES>,
    k_tile: u32,
    #[comptime] geometry: StageRing,
    #[comptime] axis: ReductionAxis,
) {
    let (rows, cols, slot_size) =
        comptime!((geometry.rows, geometry.cols, geometry.slot_size()));
    let tile = match comptime!(axis) {
        ReductionAxis::Col => view.offset(0, k_tile * cols),
        ReductionAxis::Row => view.offset(k_tile * rows, 0),
    };
    let start = slot_start(k_tile, geometry);

    let mut elem = UNIT_POS;
    while elem < slot_size {
        let row = elem / cols;
        let col = elem % cols;

        let mut value = ES::from_int(0);
        if tile.is_in_bounds(row, col) {
            value = ES::cast_from(global[tile.index(row, col)]);
        }
        ring[start + elem] = value;

        elem += CUBE_DIM;
    }
}

/// Fills the first `stages - 1` slots of a ring, or fewer when the operand has fewer tiles.
#[cube]
pub fn fill_prologue<EI: Float, ES: Float>(
    global: &Array<EI>,
    view: &GlobalView,
    ring: &mut SharedMemory<ES>,
    num_k_tiles: u32,
    #[comptime] geometry: StageRing,
    #[comptime] axis: ReductionAxis,
) {
    for k_tile in 0..comptime!(geometry.stages - 1) {
        if k_tile < num_k_tiles {
            fill_slot::<EI, ES>(global, view, ring, k_tile, geometry, axis);
        }
    }
}

/// Refills the slot released by the previous iteration with the tile `stages - 1` ahead.
///
/// The slot of `k_tile` itself stays untouched, so this may run while other planes still
/// read it. The caller synchronizes the cube before the next iteration.
#[cube]
pub fn fill_ahead<EI: Float, ES: Float>(
    global: &Array<EI>,
    view: &GlobalView,
    ring: &mut SharedMemory<ES>,
    k_tile: u32,
    num_k_tiles: u32,
    #[comptime] geometry: StageRing,
    #[comptime] axis: ReductionAxis,
) {
    let next = k_tile + comptime!(geometry.stages - 1);
    if next < num_k_tiles {
        fill_slot::<EI, ES>(global, view, ring, next, geometry, axis);
    }
}

/// Number of `tile` sized reduction tiles covering `extent`, the last one possibly partial.
#[cube]
pub fn tile_count(extent: u32, #[comptime] tile: u32) -> u32 {
    let mut count = extent / tile;
    if extent % tile != 0 {
        count += 1;
    }
    count
}
