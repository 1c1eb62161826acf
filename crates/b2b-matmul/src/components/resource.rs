use super::{
    AccumulatorStaging, B2bElems, B2bTilingScheme, FormattedConfigError, MatmulSetupError,
    SharedMemoryExhausted, TilingScheme,
};

/// Bytes of shared memory needed by each logical use, for one cube.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedMemoryPlan {
    /// Ring of `A` tiles.
    pub lhs0: usize,
    /// Ring of `B` tiles.
    pub rhs0: usize,
    /// Ring of `B1` tiles.
    pub rhs1: usize,
    /// Intermediate row block, when staged through shared memory.
    pub intermediate: usize,
    /// Partial accumulators of the first stage, when its reduction is split over planes.
    pub reduction0: usize,
    /// Partial accumulators of the second stage, when its reduction is split over planes.
    pub reduction1: usize,
}

impl SharedMemoryPlan {
    /// Sizes every region of the plan.
    ///
    /// Fails instead of wrapping when a region doesn't fit in the address space.
    pub fn new(
        tiling: &B2bTilingScheme,
        stages: u32,
        staging: AccumulatorStaging,
        elems: &B2bElems,
    ) -> Result<Self, MatmulSetupError> {
        let stage_size = elems.stage.size();
        let accumulator_size = elems.accumulator.size();
        let tb0 = tiling.gemm0.threadblock;
        let tb1 = tiling.gemm1.threadblock;

        let ring = |elems: Option<u32>| region(elems, stages, stage_size);
        let reduction = |scheme: &TilingScheme| match scheme.partitions_k() {
            1 => Some(0),
            partitions => region(scheme.threadblock.mn(), partitions, accumulator_size),
        };

        let plan = (|| {
            Some(Self {
                lhs0: ring(tb0.mk())?,
                rhs0: ring(tb0.nk())?,
                rhs1: ring(tb1.nk())?,
                intermediate: match staging {
                    AccumulatorStaging::Registers => 0,
                    AccumulatorStaging::SharedMemory => region(tb0.mn(), 1, stage_size)?,
                },
                reduction0: reduction(&tiling.gemm0)?,
                reduction1: reduction(&tiling.gemm1)?,
            })
        })();

        plan.ok_or_else(|| {
            let tiling = *tiling;
            FormattedConfigError::new(move || {
                format!("Shared memory of {stages} stages of {tiling:?} overflows the address space.")
            })
            .into()
        })
    }

    /// Bytes of every non empty region, in layout order.
    pub fn regions(&self) -> Vec<(&'static str, usize)> {
        [
            ("lhs0", self.lhs0),
            ("rhs0", self.rhs0),
            ("rhs1", self.rhs1),
            ("intermediate", self.intermediate),
            ("reduction0", self.reduction0),
            ("reduction1", self.reduction1),
        ]
        .into_iter()
        .filter(|(_, size)| *size > 0)
        .collect()
    }

    /// Total bytes over every region, saturating at `usize::MAX`.
    pub fn total(&self) -> usize {
        self.regions()
            .iter()
            .fold(0usize, |total, (_, size)| total.saturating_add(*size))
    }

    /// Fails when the plan doesn't fit in `available` bytes.
    pub fn check(&self, available: usize) -> Result<(), MatmulSetupError> {
        let needed = self.total();

        match needed > available {
            true => Err(SharedMemoryExhausted {
                needed,
                available,
                regions: self.regions(),
            }
            .into()),
            false => Ok(()),
        }
    }
}

fn region(elems: Option<u32>, repeat: u32, elem_size: usize) -> Option<usize> {
    (elems? as usize)
        .checked_mul(repeat as usize)?
        .checked_mul(elem_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{GemmShape, HalfPrecision};

    fn tiling(warp0: GemmShape) -> B2bTilingScheme {
        B2bTilingScheme::new(
            TilingScheme {
                threadblock: GemmShape::new(64, 64, 32),
                warp: warp0,
                instruction: GemmShape::new(16, 8, 16),
            },
            TilingScheme {
                threadblock: GemmShape::new(64, 128, 32),
                warp: GemmShape::new(16, 128, 32),
                instruction: GemmShape::new(16, 8, 16),
            },
        )
    }

    #[test]
    fn rings_scale_with_stages() {
        let elems = B2bElems::from_precision::<HalfPrecision>();
        let tiling = tiling(GemmShape::new(16, 64, 32));
        let plan = SharedMemoryPlan::new(&tiling, 3, AccumulatorStaging::Registers, &elems).unwrap();

        assert_eq!(plan.lhs0, 3 * 64 * 32 * 2);
        assert_eq!(plan.rhs0, 3 * 32 * 64 * 2);
        assert_eq!(plan.rhs1, 3 * 32 * 128 * 2);
        assert_eq!(plan.intermediate, 0);
        assert_eq!(plan.total(), plan.lhs0 + plan.rhs0 + plan.rhs1);
    }

    #[test]
    fn shared_staging_and_split_k_add_regions() {
        let elems = B2bElems::from_precision::<HalfPrecision>();
        let tiling = tiling(GemmShape::new(32, 64, 16));
        let plan = SharedMemoryPlan::new(&tiling, 4, AccumulatorStaging::SharedMemory, &elems).unwrap();

        assert_eq!(plan.intermediate, 64 * 64 * 2);
        assert_eq!(plan.reduction0, 2 * 64 * 64 * 4);
        assert_eq!(plan.reduction1, 0);
        assert_eq!(plan.regions().len(), 5);
    }

    #[test]
    fn exhaustion_reports_needed_bytes() {
        let elems = B2bElems::from_precision::<HalfPrecision>();
        let tiling = tiling(GemmShape::new(16, 64, 32));
        let plan = SharedMemoryPlan::new(&tiling, 3, AccumulatorStaging::Registers, &elems).unwrap();

        match plan.check(1024) {
            Err(MatmulSetupError::ResourceExhausted(err)) => {
                assert_eq!(err.needed, plan.total());
                assert_eq!(err.available, 1024);
            }
            _ => panic!("Expected shared memory exhaustion"),
        }
        assert!(plan.check(plan.total()).is_ok());
    }

    #[test]
    fn overflowing_tile_is_an_error() {
        let elems = B2bElems::from_precision::<HalfPrecision>();
        let mut tiling = tiling(GemmShape::new(16, 64, 32));
        tiling.gemm0.threadblock = GemmShape::new(65536, 64, 65536);

        let result = SharedMemoryPlan::new(&tiling, 3, AccumulatorStaging::Registers, &elems);

        assert!(matches!(result, Err(MatmulSetupError::InvalidConfig(_))));
    }
}
