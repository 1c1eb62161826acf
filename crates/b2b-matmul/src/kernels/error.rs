use std::fmt::{Debug, Display};

use crate::components::{B2bIdent, MatmulSetupError};

/// Errors of a fused matmul launch.
pub enum MatmulLaunchError {
    /// The selection can't be turned into a kernel for the device.
    Setup(MatmulSetupError),

    /// The operands don't describe a valid problem for the configuration.
    InvalidProblem(MatmulInvalidProblem),
}

/// An operand of one problem of a group is incompatible with the configuration.
pub enum MatmulInvalidProblem {
    /// The intermediate is wider than the first stage threadblock tile.
    IntermediateTooWide { instance: usize, n0: u32, max: u32 },

    /// The offset, leading dimension or contiguous extent of an operand isn't a multiple of
    /// its alignment.
    Misaligned {
        instance: usize,
        ident: B2bIdent,
        alignment: u32,
    },

    /// The leading dimension of an operand is smaller than its contiguous extent.
    InvalidLeadingDimension {
        instance: usize,
        ident: B2bIdent,
        ld: usize,
        extent: u32,
    },

    /// An operand reaches past the end of its buffer.
    OperandOutOfBounds {
        instance: usize,
        ident: B2bIdent,
        required: usize,
        len: usize,
    },

    /// An epilogue reads an operand that wasn't provided.
    MissingOperand { instance: usize, ident: B2bIdent },

    /// An operand is placed past the elements a kernel can index with 32 bits.
    IndexOverflow { instance: usize, ident: B2bIdent },

    /// The group has more problems or tiles than a kernel can index with 32 bits.
    GroupTooLarge { problems: usize },
}

impl From<MatmulSetupError> for MatmulLaunchError {
    fn from(value: MatmulSetupError) -> Self {
        Self::Setup(value)
    }
}

impl From<MatmulInvalidProblem> for MatmulLaunchError {
    fn from(value: MatmulInvalidProblem) -> Self {
        Self::InvalidProblem(value)
    }
}

impl Display for MatmulLaunchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Debug for MatmulLaunchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatmulLaunchError::Setup(err) => write!(f, "{err:?}"),
            MatmulLaunchError::InvalidProblem(err) => {
                writeln!(f, "Unable to launch matmul because the problem is invalid: {err:?}")
            }
        }
    }
}

impl std::error::Error for MatmulLaunchError {}

impl Debug for MatmulInvalidProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatmulInvalidProblem::IntermediateTooWide { instance, n0, max } => write!(
                f,
                "Problem {instance} has an intermediate of {n0} columns, at most {max} fit in a cube."
            ),
            MatmulInvalidProblem::Misaligned {
                instance,
                ident,
                alignment,
            } => write!(
                f,
                "Operand {ident} of problem {instance} isn't aligned on {alignment} elements."
            ),
            MatmulInvalidProblem::InvalidLeadingDimension {
                instance,
                ident,
                ld,
                extent,
            } => write!(
                f,
                "Operand {ident} of problem {instance} has a leading dimension of {ld}, smaller than its extent {extent}."
            ),
            MatmulInvalidProblem::OperandOutOfBounds {
                instance,
                ident,
                required,
                len,
            } => write!(
                f,
                "Operand {ident} of problem {instance} needs {required} elements, its buffer holds {len}."
            ),
            MatmulInvalidProblem::MissingOperand { instance, ident } => write!(
                f,
                "Problem {instance} needs operand {ident}, which wasn't provided."
            ),
            MatmulInvalidProblem::IndexOverflow { instance, ident } => write!(
                f,
                "Operand {ident} of problem {instance} reaches past the 32-bit index range."
            ),
            MatmulInvalidProblem::GroupTooLarge { problems } => write!(
                f,
                "A group of {problems} problems has too many tiles to index with 32 bits."
            ),
        }
    }
}
