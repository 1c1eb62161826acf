use serde::{Deserialize, Serialize};

use super::B2bIdent;

/// Layout of a matrix in global memory.
#[derive(Default, Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixLayout {
    /// Consecutive elements of a row are contiguous.
    #[default]
    RowMajor,
    /// Consecutive elements of a column are contiguous.
    ColMajor,
}

impl MatrixLayout {
    /// Element strides `(row, col)` of a matrix with leading dimension `ld`.
    pub fn strides(&self, ld: usize) -> (usize, usize) {
        match self {
            MatrixLayout::RowMajor => (ld, 1),
            MatrixLayout::ColMajor => (1, ld),
        }
    }

    /// Extent of the contiguous dimension of a `rows × cols` matrix.
    pub fn contiguous_extent(&self, rows: u32, cols: u32) -> u32 {
        match self {
            MatrixLayout::RowMajor => cols,
            MatrixLayout::ColMajor => rows,
        }
    }

    /// Extent of the strided dimension of a `rows × cols` matrix.
    pub fn strided_extent(&self, rows: u32, cols: u32) -> u32 {
        match self {
            MatrixLayout::RowMajor => rows,
            MatrixLayout::ColMajor => cols,
        }
    }
}

/// Sizes of one fused matmul `D[m×n1] = f2(f1(A[m×k0]·B[k0×n0])·B1[n0×n1])`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct B2bProblem {
    pub m: u32,
    pub n0: u32,
    pub k0: u32,
    pub n1: u32,
}

impl B2bProblem {
    /// Reduction dimension of the second stage.
    pub fn k1(&self) -> u32 {
        self.n0
    }

    /// Shape `(rows, cols)` of an operand.
    pub fn shape(&self, ident: B2bIdent) -> (u32, u32) {
        match ident {
            B2bIdent::Lhs0 => (self.m, self.k0),
            B2bIdent::Rhs0 => (self.k0, self.n0),
            B2bIdent::Bias0 => (self.m, self.n0),
            B2bIdent::Rhs1 => (self.k1(), self.n1),
            B2bIdent::Source1 | B2bIdent::Out => (self.m, self.n1),
        }
    }

    /// Number of output tiles `(rows, cols)` for the given tile size.
    pub fn num_tiles(&self, tile_m: u32, tile_n: u32) -> (u32, u32) {
        (self.m.div_ceil(tile_m), self.n1.div_ceil(tile_n))
    }
}

/// Ordered collection of independent problems solved by a single launch.
#[derive(Clone, Debug, Default, PartialEq, Eq, new)]
pub struct GroupedB2bProblem {
    pub instances: Vec<B2bProblem>,
}

impl GroupedB2bProblem {
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl FromIterator<B2bProblem> for GroupedB2bProblem {
    fn from_iter<T: IntoIterator<Item = B2bProblem>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
