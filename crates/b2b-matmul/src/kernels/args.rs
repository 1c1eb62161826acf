use cubecl::server::Handle;

use crate::components::B2bProblem;

/// A device buffer and the number of elements it holds.
#[derive(Clone, Debug, new)]
pub struct BufferArg {
    pub handle: Handle,
    pub len: usize,
}

/// Placement of a matrix operand in its buffer: the offset of its first element and its
/// leading dimension.
///
/// The layout of the matrix comes from the [selection](crate::components::B2bSelection).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, new)]
pub struct MatrixArg {
    pub offset: usize,
    pub ld: usize,
}

impl MatrixArg {
    /// A matrix starting at the first element of its buffer.
    pub fn packed(ld: usize) -> Self {
        Self::new(0, ld)
    }
}

/// Placement of an operand combined by an epilogue, with arbitrary strides.
///
/// A stride of zero broadcasts the operand along its dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, new)]
pub struct BroadcastArg {
    pub offset: usize,
    pub row_stride: usize,
    pub col_stride: usize,
}

impl BroadcastArg {
    /// One value per column, shared by every row.
    pub fn row_vector(offset: usize) -> Self {
        Self::new(offset, 0, 1)
    }

    /// A row-major matrix with leading dimension `ld`.
    pub fn row_major(offset: usize, ld: usize) -> Self {
        Self::new(offset, ld, 1)
    }
}

/// Operand placements of one problem of a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct B2bInstanceArgs {
    pub problem: B2bProblem,
    /// `A`, of shape `m × k0`.
    pub lhs0: MatrixArg,
    /// `B`, of shape `k0 × n0`.
    pub rhs0: MatrixArg,
    /// `B1`, of shape `n0 × n1`.
    pub rhs1: MatrixArg,
    /// Source of the first epilogue, of shape `m × n0`.
    pub bias0: Option<BroadcastArg>,
    /// Source of the second epilogue, of shape `m × n1`.
    pub source1: Option<BroadcastArg>,
    /// `D`, of shape `m × n1`.
    pub out: MatrixArg,
}

impl B2bInstanceArgs {
    pub fn new(
        problem: B2bProblem,
        lhs0: MatrixArg,
        rhs0: MatrixArg,
        rhs1: MatrixArg,
        out: MatrixArg,
    ) -> Self {
        Self {
            problem,
            lhs0,
            rhs0,
            rhs1,
            bias0: None,
            source1: None,
            out,
        }
    }

    pub fn with_bias0(mut self, bias0: BroadcastArg) -> Self {
        self.bias0 = Some(bias0);
        self
    }

    pub fn with_source1(mut self, source1: BroadcastArg) -> Self {
        self.source1 = Some(source1);
        self
    }
}

/// Buffer holding the sources of the output epilogue.
#[derive(Clone, Debug, Default)]
pub enum SourceBinding {
    /// No problem of the group reads a source.
    #[default]
    None,
    /// The sources have their own buffer.
    Buffer(BufferArg),
    /// The sources are read from the output buffer, before it is overwritten.
    Out,
}

/// Buffers of a group of problems, each operand kind in one buffer.
///
/// Problems of the group find their operands in these buffers through their
/// [placements](B2bInstanceArgs).
#[derive(Clone, Debug)]
pub struct B2bGroupArgs {
    pub lhs0: BufferArg,
    pub rhs0: BufferArg,
    pub rhs1: BufferArg,
    pub bias0: Option<BufferArg>,
    pub source1: SourceBinding,
    pub out: BufferArg,
    pub instances: Vec<B2bInstanceArgs>,
}

impl B2bGroupArgs {
    pub fn new(
        lhs0: BufferArg,
        rhs0: BufferArg,
        rhs1: BufferArg,
        out: BufferArg,
        instances: Vec<B2bInstanceArgs>,
    ) -> Self {
        Self {
            lhs0,
            rhs0,
            rhs1,
            bias0: None,
            source1: SourceBinding::None,
            out,
            instances,
        }
    }

    pub fn with_bias0(mut self, bias0: BufferArg) -> Self {
        self.bias0 = Some(bias0);
        self
    }

    pub fn with_source1(mut self, source1: SourceBinding) -> Self {
        self.source1 = source1;
        self
    }
}
