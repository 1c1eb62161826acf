use cubecl::prelude::*;
use derive_more::Display;
use half::{bf16, f16};

/// Element types supported by the kernels.
#[derive(Clone, Copy, Debug, Display, Hash, PartialEq, Eq)]
pub enum ElemType {
    /// Half precision float.
    #[display("f16")]
    F16,
    /// Brain float.
    #[display("bf16")]
    BF16,
    /// Single precision float.
    #[display("f32")]
    F32,
}

impl ElemType {
    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            ElemType::F16 | ElemType::BF16 => 2,
            ElemType::F32 => 4,
        }
    }
}

/// A float element stored in global or shared memory.
///
/// Kernels accumulate in the accumulator element; the host side converts through `f32`.
pub trait MatmulElem: Float + CubeElement {
    /// The runtime description of the element.
    fn elem_type() -> ElemType;

    /// Rounds an `f32` to the element.
    fn narrow(value: f32) -> Self;

    /// Widens the element to `f32`.
    fn widen(self) -> f32;
}

impl MatmulElem for f32 {
    fn elem_type() -> ElemType {
        ElemType::F32
    }

    fn narrow(value: f32) -> Self {
        value
    }

    fn widen(self) -> f32 {
        self
    }
}

impl MatmulElem for f16 {
    fn elem_type() -> ElemType {
        ElemType::F16
    }

    fn narrow(value: f32) -> Self {
        f16::from_f32(value)
    }

    fn widen(self) -> f32 {
        f16::to_f32(self)
    }
}

impl MatmulElem for bf16 {
    fn elem_type() -> ElemType {
        ElemType::BF16
    }

    fn narrow(value: f32) -> Self {
        bf16::from_f32(value)
    }

    fn widen(self) -> f32 {
        bf16::to_f32(self)
    }
}

/// Element types used along the fused matmul.
pub trait MatmulPrecision: Send + Sync + Copy + 'static {
    /// Element type of the operands in global memory.
    type EI: MatmulElem;
    /// Element type of the operands in stage memory, and of the intermediate.
    type ES: MatmulElem;
    /// Element type of the accumulators.
    type EA: MatmulElem;
    /// Element type of the output, of the bias and of the source.
    type EO: MatmulElem;
}

impl<EI: MatmulElem, ES: MatmulElem, EA: MatmulElem, EO: MatmulElem> MatmulPrecision for (EI, ES, EA, EO) {
    type EI = EI;
    type ES = ES;
    type EA = EA;
    type EO = EO;
}

/// Half precision operands with single precision accumulation.
pub type HalfPrecision = (f16, f16, f32, f16);
/// Brain float operands with single precision accumulation.
pub type BFloat16Precision = (bf16, bf16, f32, bf16);
/// Single precision everywhere.
pub type FullPrecision = (f32, f32, f32, f32);

/// Runtime description of the element types of a [MatmulPrecision].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct B2bElems {
    /// Global input.
    pub input: ElemType,
    /// Stage and intermediate.
    pub stage: ElemType,
    /// Accumulator.
    pub accumulator: ElemType,
    /// Output.
    pub output: ElemType,
}

impl B2bElems {
    /// Element types of the given precision.
    pub fn from_precision<MP: MatmulPrecision>() -> Self {
        Self {
            input: MP::EI::elem_type(),
            stage: MP::ES::elem_type(),
            accumulator: MP::EA::elem_type(),
            output: MP::EO::elem_type(),
        }
    }
}
