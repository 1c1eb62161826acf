use cubecl::prelude::*;

use crate::components::{
    AccumulatorStaging, Activation,
    stage::{StageConfig, StageRing},
};

/// Where the output epilogue reads its source from.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum SourceLocation {
    /// The source isn't read.
    Absent,
    /// The source has its own buffer.
    Buffer,
    /// The source lives in the output buffer, and each element is read before being written.
    Out,
}

/// Compile-time part of the two epilogues.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct EpilogueConfig {
    pub activation0: Activation,
    /// Whether the intermediate epilogue reads the bias.
    pub bias0: bool,
    pub activation1: Activation,
    pub source1: SourceLocation,
}

/// Compile-time configuration of the fused kernel.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct B2bKernelConfig {
    pub gemm0: StageConfig,
    pub gemm1: StageConfig,
    pub stages: u32,
    pub causal_mask: bool,
    pub staging: AccumulatorStaging,
    pub epilogue: EpilogueConfig,
}

impl B2bKernelConfig {
    /// Ring of `A` tiles, `threadblock.m × threadblock.k` each.
    pub fn lhs0_ring(&self) -> StageRing {
        let tb = self.gemm0.tiling.threadblock;
        StageRing::new(tb.m, tb.k, self.stages)
    }

    /// Ring of `B` tiles, `threadblock.k × threadblock.n` each.
    pub fn rhs0_ring(&self) -> StageRing {
        let tb = self.gemm0.tiling.threadblock;
        StageRing::new(tb.k, tb.n, self.stages)
    }

    /// Ring of `B1` tiles, `threadblock.k × threadblock.n` each.
    pub fn rhs1_ring(&self) -> StageRing {
        let tb = self.gemm1.tiling.threadblock;
        StageRing::new(tb.k, tb.n, self.stages)
    }
}

/// Runtime coefficients of the two epilogues, in the accumulator precision.
#[derive(CubeType, Clone, Copy)]
pub struct EpilogueScalars<EA: Float> {
    pub alpha0: EA,
    pub beta0: EA,
    pub mask_fill0: EA,
    pub alpha1: EA,
    pub beta1: EA,
}

#[cube]
impl<EA: Float> EpilogueScalars<EA> {
    pub fn new(
        alpha0: f32,
        beta0: f32,
        mask_fill0: f32,
        alpha1: f32,
        beta1: f32,
    ) -> EpilogueScalars<EA> {
        EpilogueScalars::<EA> {
            alpha0: EA::cast_from(alpha0),
            beta0: EA::cast_from(beta0),
            mask_fill0: EA::cast_from(mask_fill0),
            alpha1: EA::cast_from(alpha1),
            beta1: EA::cast_from(beta1),
        }
    }
}
