pub mod batch;
pub mod global;
pub mod stage;
pub mod tile;

mod config;
mod device;
mod epilogue;
mod error;
mod ident;
mod mask;
mod precision;
mod problem;
mod resource;
mod selection;
mod tiling_scheme;
mod variant;

pub use config::*;
pub use device::*;
pub use epilogue::*;
pub use error::*;
pub use ident::*;
pub use mask::*;
pub use precision::*;
pub use problem::*;
pub use resource::*;
pub use selection::*;
pub use tiling_scheme::*;
pub use variant::*;
