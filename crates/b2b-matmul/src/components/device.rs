use cubecl::prelude::*;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Compute capability tier a kernel variant is written for.
#[derive(Debug, Display, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArchTier {
    /// Volta.
    #[display("sm_70")]
    Sm70,
    /// Turing.
    #[display("sm_75")]
    Sm75,
    /// Ampere, the first tier with asynchronous global to shared memory copies.
    #[display("sm_80")]
    Sm80,
}

impl ArchTier {
    /// Whether global to shared memory copies can be issued asynchronously.
    pub fn supports_async_copy(&self) -> bool {
        *self >= ArchTier::Sm80
    }
}

/// What the fused matmul needs to know about the device it is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Highest architecture tier the device implements.
    pub arch: ArchTier,
    /// Maximum number of units in a cube.
    pub max_units_per_cube: u32,
    /// Maximum shared memory of one cube, in bytes.
    pub max_shared_memory_size: usize,
    /// Number of streaming multiprocessors, used to size persistent launches.
    pub num_streaming_multiprocessors: u32,
}

impl DeviceCapabilities {
    /// A Volta class device.
    pub fn sm70() -> Self {
        Self {
            arch: ArchTier::Sm70,
            max_units_per_cube: 1024,
            max_shared_memory_size: 96 * 1024,
            num_streaming_multiprocessors: 80,
        }
    }

    /// A Turing class device.
    pub fn sm75() -> Self {
        Self {
            arch: ArchTier::Sm75,
            max_shared_memory_size: 64 * 1024,
            num_streaming_multiprocessors: 68,
            ..Self::sm70()
        }
    }

    /// An Ampere class device.
    pub fn sm80() -> Self {
        Self {
            arch: ArchTier::Sm80,
            max_shared_memory_size: 163 * 1024,
            num_streaming_multiprocessors: 108,
            ..Self::sm70()
        }
    }

    /// Capabilities of the device behind a client.
    ///
    /// The multistage pipeline is expressed with plain loads, stores and cube barriers, which
    /// every runtime lowers, so a client always qualifies for the [ArchTier::Sm80] variants.
    pub fn from_client<R: Runtime>(client: &ComputeClient<R::Server>) -> Self {
        let hardware = &client.properties().hardware;

        Self {
            arch: ArchTier::Sm80,
            max_units_per_cube: hardware.max_units_per_cube,
            max_shared_memory_size: hardware.max_shared_memory_size,
            num_streaming_multiprocessors: hardware.num_streaming_multiprocessors.unwrap_or(1),
        }
    }

    /// Replaces the shared memory limit.
    pub fn with_max_shared_memory_size(mut self, bytes: usize) -> Self {
        self.max_shared_memory_size = bytes;
        self
    }
}
