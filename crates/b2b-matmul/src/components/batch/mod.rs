//! Distribution of the output tiles of a grouped problem over cubes.

mod global_order;
mod kernel;
mod scheduler;

pub use global_order::*;
pub use kernel::*;
pub use scheduler::*;
