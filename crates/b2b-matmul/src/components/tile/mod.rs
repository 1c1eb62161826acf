//! Multiply-accumulate of one instruction step, executed by every unit of a plane.

mod accelerated;
mod base;
mod register;

pub use accelerated::*;
pub use base::*;
pub use register::*;
