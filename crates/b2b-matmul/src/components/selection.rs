use serde::{Deserialize, Serialize};

use super::{ArchTier, B2bIdent, B2bTilingScheme, MatrixLayout, batch::GlobalOrder};

/// Kind of multiply-accumulate hardware used by the tile matmul.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorClass {
    /// Scalar fused multiply-adds.
    Simt,
    /// Matrix multiply-accumulate instructions.
    TensorOp,
}

/// Where the intermediate `f1(A·B)` lives between the two stages.
#[derive(Default, Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccumulatorStaging {
    /// Each plane keeps its rows of the intermediate in registers. Requires the first stage
    /// warp tile to span the whole row block.
    #[default]
    Registers,
    /// The intermediate goes through shared memory, so any plane can read any row.
    SharedMemory,
}

/// Global memory layouts of the operands.
#[derive(Default, Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct B2bLayouts {
    pub lhs0: MatrixLayout,
    pub rhs0: MatrixLayout,
    pub rhs1: MatrixLayout,
    pub out: MatrixLayout,
}

impl B2bLayouts {
    pub fn get(&self, ident: B2bIdent) -> MatrixLayout {
        match ident {
            B2bIdent::Lhs0 => self.lhs0,
            B2bIdent::Rhs0 => self.rhs0,
            B2bIdent::Rhs1 => self.rhs1,
            B2bIdent::Bias0 | B2bIdent::Source1 | B2bIdent::Out => self.out,
        }
    }
}

/// Access granularity, in elements, of the staged operands in global memory.
///
/// Base offsets, leading dimensions and contiguous extents must be multiples of it.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    pub lhs0: u32,
    pub rhs0: u32,
    pub rhs1: u32,
}

impl Alignment {
    /// The same alignment for every operand.
    pub fn uniform(alignment: u32) -> Self {
        Self {
            lhs0: alignment,
            rhs0: alignment,
            rhs1: alignment,
        }
    }

    /// Alignment of a staged operand, one for the others.
    pub fn get(&self, ident: B2bIdent) -> u32 {
        match ident {
            B2bIdent::Lhs0 => self.lhs0,
            B2bIdent::Rhs0 => self.rhs0,
            B2bIdent::Rhs1 => self.rhs1,
            B2bIdent::Bias0 | B2bIdent::Source1 | B2bIdent::Out => 1,
        }
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Self::uniform(1)
    }
}

/// How many cubes are launched for a grouped problem.
#[derive(Default, Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum CubeCountPlan {
    /// One cube per output tile.
    #[default]
    FromProblem,
    /// A fixed number of persistent cubes iterating over the tiles.
    Fixed(u32),
    /// A number of persistent cubes per streaming multiprocessor.
    PerSm(u32),
}

/// Build-time choices of the fused matmul, resolved into a
/// [B2bConfig](super::B2bConfig) by [setup](super::B2bConfig::setup).
#[derive(Debug, Clone)]
pub struct B2bSelection {
    pub plane_dim: u32,
    pub tiling_scheme: B2bTilingScheme,
    pub arch: ArchTier,
    pub operator_class: OperatorClass,
    pub stages: u32,
    pub causal_mask: bool,
    pub accumulator_staging: AccumulatorStaging,
    pub layouts: B2bLayouts,
    pub alignment: Alignment,
    pub global_order: GlobalOrder,
    pub cube_count_plan: CubeCountPlan,
}

impl B2bSelection {
    pub fn builder(tiling_scheme: B2bTilingScheme, plane_dim: u32) -> B2bSelectionBuilder {
        B2bSelectionBuilder::new(tiling_scheme, plane_dim)
    }
}

pub struct B2bSelectionBuilder {
    plane_dim: u32,
    tiling_scheme: B2bTilingScheme,
    arch: ArchTier,
    operator_class: OperatorClass,
    stages: u32,
    causal_mask: bool,
    accumulator_staging: AccumulatorStaging,
    layouts: B2bLayouts,
    alignment: Alignment,
    global_order: GlobalOrder,
    cube_count_plan: CubeCountPlan,
}

impl B2bSelectionBuilder {
    fn new(tiling_scheme: B2bTilingScheme, plane_dim: u32) -> Self {
        Self {
            plane_dim,
            tiling_scheme,
            arch: ArchTier::Sm80,
            operator_class: OperatorClass::TensorOp,
            stages: 3,
            causal_mask: false,
            accumulator_staging: AccumulatorStaging::default(),
            layouts: B2bLayouts::default(),
            alignment: Alignment::default(),
            global_order: GlobalOrder::default(),
            cube_count_plan: CubeCountPlan::default(),
        }
    }

    pub fn arch(mut self, arch: ArchTier) -> Self {
        self.arch = arch;
        self
    }

    pub fn operator_class(mut self, operator_class: OperatorClass) -> Self {
        self.operator_class = operator_class;
        self
    }

    pub fn stages(mut self, stages: u32) -> Self {
        self.stages = stages;
        self
    }

    pub fn causal_mask(mut self, causal_mask: bool) -> Self {
        self.causal_mask = causal_mask;
        self
    }

    pub fn accumulator_staging(mut self, accumulator_staging: AccumulatorStaging) -> Self {
        self.accumulator_staging = accumulator_staging;
        self
    }

    pub fn layouts(mut self, layouts: B2bLayouts) -> Self {
        self.layouts = layouts;
        self
    }

    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn global_order(mut self, global_order: GlobalOrder) -> Self {
        self.global_order = global_order.simplify();
        self
    }

    pub fn cube_count_plan(mut self, cube_count_plan: CubeCountPlan) -> Self {
        self.cube_count_plan = cube_count_plan;
        self
    }

    pub fn build(self) -> B2bSelection {
        B2bSelection {
            plane_dim: self.plane_dim,
            tiling_scheme: self.tiling_scheme,
            arch: self.arch,
            operator_class: self.operator_class,
            stages: self.stages,
            causal_mask: self.causal_mask,
            accumulator_staging: self.accumulator_staging,
            layouts: self.layouts,
            alignment: self.alignment,
            global_order: self.global_order,
            cube_count_plan: self.cube_count_plan,
        }
    }
}
