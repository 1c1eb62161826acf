//! Shared memory stages and the multiply-accumulate of one stage by the planes of a cube.

mod matmul;
mod memory;
mod partition;

pub use matmul::*;
pub use memory::*;
pub use partition::*;
