use cubecl::prelude::CubeDim;
use std::fmt::{Debug, Display};

use super::{ArchTier, ElemType, GemmShape, MatrixLayout, OperatorClass};

/// Errors that can occur during the setup phase of a fused matmul, before anything is launched.
pub enum MatmulSetupError {
    /// A required hardware or runtime feature is not available.
    Unavailable(MatmulAvailabilityError),

    /// The provided configuration is invalid or rejected by a component.
    InvalidConfig(InvalidConfigError),

    /// The configuration needs more shared memory than one cube has.
    ResourceExhausted(SharedMemoryExhausted),
}

/// A specific feature required by the fused matmul is not available on the device.
pub enum MatmulAvailabilityError {
    /// No kernel variant exists for this combination.
    VariantUnavailable {
        arch: ArchTier,
        operator_class: OperatorClass,
        out_layout: MatrixLayout,
    },

    /// Multistage pipelining needs asynchronous copies, missing on this architecture.
    PipelineUnavailable { arch: ArchTier },

    /// The selection targets a newer architecture than the device implements.
    ArchUnsupported {
        required: ArchTier,
        available: ArchTier,
    },

    /// The element types are not supported by the variant.
    TypesUnavailable {
        input: ElemType,
        accumulator: ElemType,
    },

    /// The instruction shape is not supported for the given element type.
    InstructionUnavailable { input: ElemType, size: GemmShape },

    /// The requested cube dimensions are too large for the device.
    CubeDimTooBig(CubeDim),

    /// The requested plane dimension is not supported.
    PlaneDimUnsupported { plane_dim: u32 },
}

/// Shared memory requirements exceeding the capacity of a cube.
pub struct SharedMemoryExhausted {
    /// Bytes needed by the configuration.
    pub needed: usize,
    /// Bytes available to one cube.
    pub available: usize,
    /// Bytes needed by each region.
    pub regions: Vec<(&'static str, usize)>,
}

impl From<MatmulAvailabilityError> for MatmulSetupError {
    fn from(value: MatmulAvailabilityError) -> Self {
        Self::Unavailable(value)
    }
}

impl From<InvalidConfigError> for MatmulSetupError {
    fn from(value: InvalidConfigError) -> Self {
        Self::InvalidConfig(value)
    }
}

impl From<SharedMemoryExhausted> for MatmulSetupError {
    fn from(value: SharedMemoryExhausted) -> Self {
        Self::ResourceExhausted(value)
    }
}

impl Display for MatmulSetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Debug for MatmulSetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatmulSetupError::Unavailable(err) => {
                writeln!(
                    f,
                    "Unable to launch matmul because a required feature is unavailable: {err:?}"
                )
            }
            MatmulSetupError::InvalidConfig(err) => {
                writeln!(
                    f,
                    "Unable to launch matmul because the config is invalid: {:?}",
                    err.to_string()
                )
            }
            MatmulSetupError::ResourceExhausted(err) => {
                writeln!(
                    f,
                    "Unable to launch matmul because of insufficient resources: {err:?}"
                )
            }
        }
    }
}

impl std::error::Error for MatmulSetupError {}

impl Debug for MatmulAvailabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatmulAvailabilityError::VariantUnavailable {
                arch,
                operator_class,
                out_layout,
            } => writeln!(
                f,
                "No variant for {operator_class:?} on {arch} with {out_layout:?} output."
            ),
            MatmulAvailabilityError::PipelineUnavailable { arch } => writeln!(
                f,
                "Multistage pipeline needs asynchronous copies, unavailable on {arch}."
            ),
            MatmulAvailabilityError::ArchUnsupported {
                required,
                available,
            } => writeln!(
                f,
                "Selection built for {required} can't run on a {available} device."
            ),
            MatmulAvailabilityError::TypesUnavailable { input, accumulator } => writeln!(
                f,
                "Types input={input:?} and/or accumulator={accumulator:?} not supported.",
            ),
            MatmulAvailabilityError::InstructionUnavailable { input, size } => writeln!(
                f,
                "Instruction on inputs {:?} with shape m={:?}, n={:?}, k={:?} not supported.",
                input, size.m, size.n, size.k
            ),
            MatmulAvailabilityError::CubeDimTooBig(dim) => {
                writeln!(f, "Cube dim too big {dim:?}")
            }
            MatmulAvailabilityError::PlaneDimUnsupported { plane_dim } => {
                writeln!(
                    f,
                    "Plane dimension unsupported: {plane_dim}. Only 32 & 64 are supported."
                )
            }
        }
    }
}

impl Debug for SharedMemoryExhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "This algorithm needs {:?} shared memory bytes but hardware limit is {:?} (",
            self.needed, self.available
        )?;
        for (index, (name, size)) in self.regions.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {size}")?;
        }
        write!(f, ").")
    }
}

/// Error that arises from invalid configurations
pub type InvalidConfigError = Box<dyn Display + Send + Sync>;

/// Error that arises from invalid configurations, formatted only when displayed
pub struct FormattedConfigError {
    func: Box<dyn Fn() -> String + Send + Sync>,
}

impl FormattedConfigError {
    #[allow(clippy::new_ret_no_self)]
    pub fn new<F: Fn() -> String + Send + Sync + 'static>(func: F) -> InvalidConfigError {
        Box::new(Self {
            func: Box::new(func),
        })
    }
}

impl Display for FormattedConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let string = (self.func)();
        write!(f, "{string}")
    }
}
