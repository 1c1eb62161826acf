//! Fused back-to-back matrix multiplication.
//!
//! Computes `D = f2(f1(A·B)·B1)` for a batch of independent problems, keeping the intermediate
//! product on chip: each cube produces a block of rows of `f1(A·B)`, optionally applies a causal
//! mask, and immediately multiplies it with `B1`.

#[macro_use]
extern crate derive_new;

/// Components of the fused matmul, from the tile level up to the batch level.
pub mod components;
/// Launch entry points.
pub mod kernels;

#[cfg(test)]
mod tests;

pub use kernels::{launch, launch_ref};
