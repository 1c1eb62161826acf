use cubecl::prelude::*;

use crate::components::{B2bIdent, B2bProblem};

/// Words of metadata describing one problem of a group.
pub const METADATA_STRIDE: u32 = SIZE_WORDS + 6 * OPERAND_WORDS;
const SIZE_WORDS: u32 = 4;
const OPERAND_WORDS: u32 = 3;

/// Placement of an operand in its buffer, in elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, new)]
pub struct OperandPlacement {
    pub offset: u32,
    pub row_stride: u32,
    pub col_stride: u32,
}

/// Position of an operand's placement within the metadata of a problem.
pub fn metadata_slot(ident: B2bIdent) -> u32 {
    match ident {
        B2bIdent::Lhs0 => 0,
        B2bIdent::Rhs0 => 1,
        B2bIdent::Rhs1 => 2,
        B2bIdent::Bias0 => 3,
        B2bIdent::Source1 => 4,
        B2bIdent::Out => 5,
    }
}

/// Appends the metadata of one problem, whose operands are given in [metadata_slot] order.
pub fn push_metadata(
    metadata: &mut Vec<u32>,
    problem: &B2bProblem,
    operands: &[OperandPlacement; 6],
) {
    metadata.extend([problem.m, problem.n0, problem.k0, problem.n1]);
    for operand in operands {
        metadata.extend([operand.offset, operand.row_stride, operand.col_stride]);
    }
}

/// Sizes of one problem, read from the metadata.
#[derive(CubeType, Clone, Copy)]
pub struct ProblemSize {
    pub m: u32,
    pub n0: u32,
    pub k0: u32,
    pub n1: u32,
}

#[cube]
impl ProblemSize {
    pub fn read(metadata: &Array<u32>, instance: u32) -> ProblemSize {
        let start = instance * comptime!(METADATA_STRIDE);

        ProblemSize {
            m: metadata[start],
            n0: metadata[start + 1],
            k0: metadata[start + 2],
            n1: metadata[start + 3],
        }
    }
}

/// Bounded window over a matrix in global memory, starting at `(row_origin, col_origin)`.
///
/// Elements at or beyond `rows × cols` of the matrix are outside the problem: they are never
/// read nor written.
#[derive(CubeType, Clone, Copy)]
pub struct GlobalView {
    offset: u32,
    row_stride: u32,
    col_stride: u32,
    rows: u32,
    cols: u32,
    row_origin: u32,
    col_origin: u32,
}

#[cube]
impl GlobalView {
    /// The operand in metadata `slot` of problem `instance`, which has `rows × cols` elements.
    pub fn from_metadata(
        metadata: &Array<u32>,
        instance: u32,
        #[comptime] slot: u32,
        rows: u32,
        cols: u32,
    ) -> GlobalView {
        let start = instance * comptime!(METADATA_STRIDE)
            + comptime!(SIZE_WORDS + slot * OPERAND_WORDS);

        GlobalView {
            offset: metadata[start],
            row_stride: metadata[start + 1],
            col_stride: metadata[start + 2],
            rows,
            cols,
            row_origin: 0,
            col_origin: 0,
        }
    }

    /// The same matrix seen from `(row, col)` of the current window.
    pub fn offset(&self, row: u32, col: u32) -> GlobalView {
        GlobalView {
            offset: self.offset,
            row_stride: self.row_stride,
            col_stride: self.col_stride,
            rows: self.rows,
            cols: self.cols,
            row_origin: self.row_origin + row,
            col_origin: self.col_origin + col,
        }
    }

    /// Whether `(row, col)` of the window is inside the problem.
    pub fn is_in_bounds(&self, row: u32, col: u32) -> bool {
        self.row_origin + row < self.rows && self.col_origin + col < self.cols
    }

    /// Element index of `(row, col)` of the window in the buffer.
    pub fn index(&self, row: u32, col: u32) -> u32 {
        self.offset
            + (self.row_origin + row) * self.row_stride
            + (self.col_origin + col) * self.col_stride
    }
}
