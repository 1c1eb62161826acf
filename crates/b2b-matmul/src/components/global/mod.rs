//! Cube level pipeline: staging operands from global memory, chaining the two stages and
//! writing the output.

mod config;
mod intermediate;
mod multistage;
mod output;
mod reduction;
mod stager;
mod view;

pub use config::*;
pub use intermediate::*;
pub use multistage::*;
pub use output::*;
pub use reduction::*;
pub use stager::*;
pub use view::*;
