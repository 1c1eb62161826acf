use super::{
    ArchTier, B2bElems, B2bSelection, ElemType, FormattedConfigError, GemmShape,
    MatmulAvailabilityError, MatmulSetupError, MatrixLayout, OperatorClass,
    tile::TileMatmulKind,
};

/// Kernel implementation of the fused matmul.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum B2bVariant {
    /// Multistage pipeline with tensor-op tile matmuls.
    MultistageTensorOp,
    /// Multistage pipeline with scalar tile matmuls.
    MultistageSimt,
}

struct VariantEntry {
    arch: ArchTier,
    operator_class: OperatorClass,
    out_layout: MatrixLayout,
    variant: B2bVariant,
}

const VARIANTS: [VariantEntry; 2] = [
    VariantEntry {
        arch: ArchTier::Sm80,
        operator_class: OperatorClass::TensorOp,
        out_layout: MatrixLayout::RowMajor,
        variant: B2bVariant::MultistageTensorOp,
    },
    VariantEntry {
        arch: ArchTier::Sm80,
        operator_class: OperatorClass::Simt,
        out_layout: MatrixLayout::RowMajor,
        variant: B2bVariant::MultistageSimt,
    },
];

const TENSOR_OP_INSTRUCTIONS: [GemmShape; 2] =
    [GemmShape::new(16, 8, 8), GemmShape::new(16, 8, 16)];
const SIMT_INSTRUCTION: GemmShape = GemmShape::new(1, 1, 1);

impl B2bVariant {
    /// Looks up the variant implementing a capability combination.
    pub fn select(
        arch: ArchTier,
        operator_class: OperatorClass,
        out_layout: MatrixLayout,
    ) -> Result<Self, MatmulAvailabilityError> {
        if let Some(entry) = VARIANTS.iter().find(|entry| {
            entry.arch == arch
                && entry.operator_class == operator_class
                && entry.out_layout == out_layout
        }) {
            return Ok(entry.variant);
        }

        if !arch.supports_async_copy() {
            return Err(MatmulAvailabilityError::PipelineUnavailable { arch });
        }

        Err(MatmulAvailabilityError::VariantUnavailable {
            arch,
            operator_class,
            out_layout,
        })
    }

    pub fn tile_matmul(&self) -> TileMatmulKind {
        match self {
            B2bVariant::MultistageTensorOp => TileMatmulKind::Accelerated,
            B2bVariant::MultistageSimt => TileMatmulKind::Register,
        }
    }

    /// Checks the constraints specific to the variant.
    pub fn check(&self, selection: &B2bSelection, elems: &B2bElems) -> Result<(), MatmulSetupError> {
        let tiling = &selection.tiling_scheme;

        match self {
            B2bVariant::MultistageTensorOp => {
                if !matches!(elems.stage, ElemType::F16 | ElemType::BF16)
                    || elems.accumulator != ElemType::F32
                {
                    return Err(MatmulAvailabilityError::TypesUnavailable {
                        input: elems.stage,
                        accumulator: elems.accumulator,
                    }
                    .into());
                }

                for scheme in [&tiling.gemm0, &tiling.gemm1] {
                    if !TENSOR_OP_INSTRUCTIONS.contains(&scheme.instruction) {
                        return Err(MatmulAvailabilityError::InstructionUnavailable {
                            input: elems.stage,
                            size: scheme.instruction,
                        }
                        .into());
                    }
                }

                // The mask is applied on the accumulator fragments of the tensor-op layout,
                // which only covers warp tiles of 16 rows.
                let warp_m = tiling.gemm0.warp.m;
                if selection.causal_mask && warp_m != 16 {
                    return Err(FormattedConfigError::new(move || {
                        format!("Causal mask needs a gemm0 warp tile of 16 rows, got {warp_m}.")
                    })
                    .into());
                }
            }
            B2bVariant::MultistageSimt => {
                for scheme in [&tiling.gemm0, &tiling.gemm1] {
                    if scheme.instruction != SIMT_INSTRUCTION {
                        return Err(MatmulAvailabilityError::InstructionUnavailable {
                            input: elems.stage,
                            size: scheme.instruction,
                        }
                        .into());
                    }
                }
            }
        }

        Ok(())
    }
}
