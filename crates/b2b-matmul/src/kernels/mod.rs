mod args;
mod error;
mod launch;

pub use args::*;
pub use error::*;
pub use launch::*;
