use crate::components::{B2bEpilogue, B2bProblem, EpilogueOp, MatmulElem, MatmulPrecision};

/// A strided matrix on the host.
#[derive(Clone, Copy, Debug)]
pub(crate) struct HostMatrix<'a> {
    pub data: &'a [f32],
    pub offset: usize,
    pub row_stride: usize,
    pub col_stride: usize,
}

impl HostMatrix<'_> {
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[self.offset + row * self.row_stride + col * self.col_stride]
    }
}

pub(crate) struct ReferenceOperands<'a> {
    pub lhs0: HostMatrix<'a>,
    pub rhs0: HostMatrix<'a>,
    pub rhs1: HostMatrix<'a>,
    pub bias0: Option<HostMatrix<'a>>,
    pub source1: Option<HostMatrix<'a>>,
}

/// Naive fused matmul, returning the `m × n1` output in row-major order.
///
/// Products are summed in `f64`; the intermediate is rounded to the stage element type like
/// on the device.
pub(crate) fn reference_b2b<MP: MatmulPrecision, E0: EpilogueOp, E1: EpilogueOp>(
    problem: B2bProblem,
    operands: &ReferenceOperands<'_>,
    epilogue: &B2bEpilogue<E0, E1>,
    causal_mask: bool,
) -> Vec<f32> {
    let (m, n0, k0, n1) = (
        problem.m as usize,
        problem.n0 as usize,
        problem.k0 as usize,
        problem.n1 as usize,
    );

    let mut intermediate = vec![0.0; m * n0];
    for i in 0..m {
        for j in 0..n0 {
            if causal_mask && j > i {
                intermediate[i * n0 + j] = epilogue.op0.mask_fill();
                continue;
            }

            let acc: f64 = (0..k0)
                .map(|k| operands.lhs0.get(i, k) as f64 * operands.rhs0.get(k, j) as f64)
                .sum();
            let bias = operands.bias0.map_or(0.0, |bias| bias.get(i, j));
            let value = epilogue.op0.apply(acc as f32, bias);
            intermediate[i * n0 + j] = MP::ES::narrow(value).widen();
        }
    }

    let mut out = vec![0.0; m * n1];
    for i in 0..m {
        for j in 0..n1 {
            let acc: f64 = (0..n0)
                .map(|l| intermediate[i * n0 + l] as f64 * operands.rhs1.get(l, j) as f64)
                .sum();
            let source = operands.source1.map_or(0.0, |source| source.get(i, j));
            out[i * n1 + j] = epilogue.op1.apply(acc as f32, source);
        }
    }

    out
}
