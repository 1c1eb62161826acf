use cubecl::prelude::*;

/// Causal mask over a tile of the intermediate.
///
/// Element `(i, j)` of a tile whose first element sits at `(row_offset, col_offset)` of the
/// intermediate is kept iff its global column doesn't exceed its global row.
#[derive(CubeType, Clone, Copy)]
pub struct CausalMask {
    row_offset: u32,
    col_offset: u32,
    #[cube(comptime)]
    enabled: bool,
}

#[cube]
impl CausalMask {
    pub fn new(row_offset: u32, col_offset: u32, #[comptime] enabled: bool) -> CausalMask {
        CausalMask {
            row_offset,
            col_offset,
            enabled,
        }
    }

    /// Whether local element `(i, j)` is kept.
    pub fn is_kept(&self, i: u32, j: u32) -> bool {
        let mut kept = true;
        if comptime!(self.enabled) {
            kept = j + self.col_offset <= i + self.row_offset;
        }
        kept
    }
}
