use derive_more::Display;

/// Operand of the fused matmul.
#[derive(Clone, Copy, Debug, Display, Hash, PartialEq, Eq)]
pub enum B2bIdent {
    /// `A`, left operand of the first stage.
    #[display("lhs0")]
    Lhs0,
    /// `B`, right operand of the first stage.
    #[display("rhs0")]
    Rhs0,
    /// `B1`, right operand of the second stage.
    #[display("rhs1")]
    Rhs1,
    /// Optional bias added by the intermediate epilogue.
    #[display("bias0")]
    Bias0,
    /// Optional source added by the output epilogue.
    #[display("source1")]
    Source1,
    /// `D`, the output.
    #[display("out")]
    Out,
}

/// One of the two chained multiply-accumulate stages.
#[derive(Clone, Copy, Debug, Display, Hash, PartialEq, Eq)]
pub enum StageIdent {
    /// `A·B`.
    #[display("gemm0")]
    Gemm0,
    /// `f1(A·B)·B1`.
    #[display("gemm1")]
    Gemm1,
}
