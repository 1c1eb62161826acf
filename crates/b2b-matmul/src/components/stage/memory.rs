use cubecl::prelude::*;

/// Ring of `stages` slots in shared memory, each holding one row-major `rows × cols` tile.
///
/// Reduction tile `t` of an operand lives in slot `t % stages`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, new)]
pub struct StageRing {
    pub rows: u32,
    pub cols: u32,
    pub stages: u32,
}

impl StageRing {
    /// Number of elements of one slot.
    pub fn slot_size(&self) -> u32 {
        self.rows * self.cols
    }

    /// Number of elements of the ring.
    pub fn size(&self) -> u32 {
        self.stages * self.slot_size()
    }
}

/// First element of the slot holding reduction tile `k_tile`.
#[cube]
pub fn slot_start(k_tile: u32, #[comptime] ring: StageRing) -> u32 {
    let (stages, slot_size) = comptime!((ring.stages, ring.slot_size()));
    (k_tile % stages) * slot_size
}

/// Allocates the shared memory of a ring.
#[cube]
pub fn allocate_ring<ES: Numeric>(#[comptime] ring: StageRing) -> SharedMemory<ES> {
    SharedMemory::<ES>::new(comptime!(ring.size()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_holds_every_stage() {
        let ring = StageRing::new(64, 32, 3);

        assert_eq!(ring.slot_size(), 64 * 32);
        assert_eq!(ring.size(), 3 * 64 * 32);
    }
}
