use cubecl::prelude::CubeDim;

use super::{
    AccumulatorStaging, Alignment, B2bElems, B2bIdent, B2bLayouts, B2bSelection,
    B2bTilingScheme, B2bVariant, CubeCountPlan, DeviceCapabilities, FormattedConfigError,
    MatmulAvailabilityError, MatmulPrecision, MatmulSetupError, SharedMemoryPlan, StageIdent,
    batch::GlobalOrder,
    global::{B2bKernelConfig, EpilogueConfig},
    stage::StageConfig,
    tile::TileMatmulKind,
};

/// Fewest stages of the operand rings.
pub const MIN_STAGES: u32 = 3;
/// Widest global memory access, in bytes.
pub const MAX_ACCESS_BYTES: u32 = 16;
const PLANE_DIMS: [u32; 2] = [32, 64];

/// Validated configuration of a fused matmul, fixed for every launch of a kernel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct B2bConfig {
    pub tiling: B2bTilingScheme,
    pub stages: u32,
    pub causal_mask: bool,
    pub accumulator_staging: AccumulatorStaging,
    pub layouts: B2bLayouts,
    pub alignment: Alignment,
    pub plane_dim: u32,
    pub num_planes: u32,
    pub global_order: GlobalOrder,
    pub cube_count_plan: CubeCountPlan,
    pub variant: B2bVariant,
    pub tile_matmul: TileMatmulKind,
    pub shared_memory: SharedMemoryPlan,
    pub elems: B2bElems,
}

impl B2bConfig {
    /// Builds the configuration of a selection for the given precision and device.
    ///
    /// Fails with [MatmulSetupError::InvalidConfig] when the selection is inconsistent, with
    /// [MatmulSetupError::Unavailable] when no kernel variant supports it on the device and
    /// with [MatmulSetupError::ResourceExhausted] when a cube doesn't fit in shared memory.
    pub fn setup<MP: MatmulPrecision>(
        selection: &B2bSelection,
        device: &DeviceCapabilities,
    ) -> Result<Self, MatmulSetupError> {
        if selection.arch > device.arch {
            return Err(MatmulAvailabilityError::ArchUnsupported {
                required: selection.arch,
                available: device.arch,
            }
            .into());
        }

        let elems = B2bElems::from_precision::<MP>();
        let variant =
            B2bVariant::select(selection.arch, selection.operator_class, selection.layouts.out)?;

        validate_tiling(selection)?;

        let tiling = selection.tiling_scheme;
        let num_planes = tiling.gemm0.warp_count().ok_or_else(|| {
            FormattedConfigError::new(move || {
                format!("Plane count of {tiling:?} overflows 32 bits.")
            })
        })?;

        Self {
            tiling: selection.tiling_scheme,
            stages: selection.stages,
            causal_mask: selection.causal_mask,
            accumulator_staging: selection.accumulator_staging,
            layouts: selection.layouts,
            alignment: selection.alignment,
            plane_dim: selection.plane_dim,
            num_planes,
            global_order: selection.global_order,
            cube_count_plan: selection.cube_count_plan,
            variant,
            tile_matmul: variant.tile_matmul(),
            shared_memory: SharedMemoryPlan::new(
                &selection.tiling_scheme,
                selection.stages,
                selection.accumulator_staging,
                &elems,
            )?,
            elems,
        }
        .validate()?
        .check_availability(selection, device)
    }

    /// Units of a cube: one row per plane.
    pub fn cube_dim(&self) -> CubeDim {
        CubeDim::new_2d(self.plane_dim, self.num_planes)
    }

    pub fn stage_config(&self, stage: StageIdent) -> StageConfig {
        let tiling = match stage {
            StageIdent::Gemm0 => self.tiling.gemm0,
            StageIdent::Gemm1 => self.tiling.gemm1,
        };
        StageConfig::new(tiling, self.plane_dim, self.tile_matmul)
    }

    /// Compile-time configuration of the kernel, for the given epilogues.
    pub fn kernel_config(&self, epilogue: EpilogueConfig) -> B2bKernelConfig {
        B2bKernelConfig {
            gemm0: self.stage_config(StageIdent::Gemm0),
            gemm1: self.stage_config(StageIdent::Gemm1),
            stages: self.stages,
            causal_mask: self.causal_mask,
            staging: self.accumulator_staging,
            epilogue,
        }
    }

    fn validate(self) -> Result<Self, MatmulSetupError> {
        let stages = self.stages;
        if stages < MIN_STAGES {
            return Err(FormattedConfigError::new(move || {
                format!("Multistage pipeline needs at least {MIN_STAGES} stages, got {stages}.")
            })
            .into());
        }

        let tiling = self.tiling;
        let (tb0, tb1) = (tiling.gemm0.threadblock, tiling.gemm1.threadblock);
        if tb0.m != tb1.m {
            return Err(FormattedConfigError::new(move || {
                format!(
                    "Both stages must share their threadblock rows, got {} and {}.",
                    tb0.m, tb1.m
                )
            })
            .into());
        }

        if tb0.n % tb1.k != 0 {
            return Err(FormattedConfigError::new(move || {
                format!(
                    "Threadblock columns of gemm0 ({}) must be a multiple of the threadblock reduction of gemm1 ({}).",
                    tb0.n, tb1.k
                )
            })
            .into());
        }

        let (planes0, planes1) = (tiling.gemm0.warp_count(), tiling.gemm1.warp_count());
        if planes0 != planes1 {
            return Err(FormattedConfigError::new(move || {
                format!(
                    "Both stages must use the same number of planes, got {planes0:?} and {planes1:?}."
                )
            })
            .into());
        }

        if self.accumulator_staging == AccumulatorStaging::Registers {
            let (warp0, warp1) = (tiling.gemm0.warp, tiling.gemm1.warp);

            if warp0.n != tb0.n {
                return Err(FormattedConfigError::new(move || {
                    format!(
                        "Keeping the intermediate in registers needs gemm0 warp tiles spanning the threadblock columns, got {} and {}.",
                        warp0.n, tb0.n
                    )
                })
                .into());
            }

            if warp0.m != warp1.m {
                return Err(FormattedConfigError::new(move || {
                    format!(
                        "Keeping the intermediate in registers needs warp tiles of the same rows in both stages, got {} and {}.",
                        warp0.m, warp1.m
                    )
                })
                .into());
            }

            if tiling.gemm0.partitions_k() != 1 || tiling.gemm1.partitions_k() != 1 {
                return Err(FormattedConfigError::new(move || {
                    format!(
                        "Keeping the intermediate in registers forbids splitting the reduction over planes: {tiling:?}."
                    )
                })
                .into());
            }
        }

        let input_size = self.elems.input.size() as u32;
        for ident in [B2bIdent::Lhs0, B2bIdent::Rhs0, B2bIdent::Rhs1] {
            let alignment = self.alignment.get(ident);

            if !alignment.is_power_of_two() || alignment * input_size > MAX_ACCESS_BYTES {
                return Err(FormattedConfigError::new(move || {
                    format!(
                        "Alignment of {ident} must be a power of two of at most {MAX_ACCESS_BYTES} bytes, got {alignment} elements of {input_size} bytes."
                    )
                })
                .into());
            }
        }

        Ok(self)
    }

    fn check_availability(
        self,
        selection: &B2bSelection,
        device: &DeviceCapabilities,
    ) -> Result<Self, MatmulSetupError> {
        if !PLANE_DIMS.contains(&self.plane_dim) {
            return Err(MatmulAvailabilityError::PlaneDimUnsupported {
                plane_dim: self.plane_dim,
            }
            .into());
        }

        self.variant.check(selection, &self.elems)?;

        let units = self.plane_dim.checked_mul(self.num_planes);
        if units.is_none_or(|units| units > device.max_units_per_cube) {
            return Err(MatmulAvailabilityError::CubeDimTooBig(self.cube_dim()).into());
        }

        self.shared_memory.check(device.max_shared_memory_size)?;

        log::debug!(
            "Fused matmul {:?} on {}: {} planes, {} bytes of shared memory ({:?})",
            self.variant,
            device.arch,
            self.num_planes,
            self.shared_memory.total(),
            self.shared_memory.regions(),
        );

        Ok(self)
    }
}

/// Checks each stage's tiling on its own, before anything is derived from it.
fn validate_tiling(selection: &B2bSelection) -> Result<(), MatmulSetupError> {
    selection.tiling_scheme.gemm0.validate(StageIdent::Gemm0)?;
    selection.tiling_scheme.gemm1.validate(StageIdent::Gemm1)?;
    Ok(())
}
