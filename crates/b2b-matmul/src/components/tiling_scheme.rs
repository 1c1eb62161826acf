use serde::{Deserialize, Serialize};

use super::{FormattedConfigError, InvalidConfigError, StageIdent};

#[derive(Debug, Clone, Copy)]
pub enum MatmulDim {
    M,
    N,
    K,
}

macro_rules! define_3d_size_base {
    ($name:ident) => {
        #[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            pub m: u32,
            pub n: u32,
            pub k: u32,
        }

        impl $name {
            pub const fn new(m: u32, n: u32, k: u32) -> Self {
                $name { m, n, k }
            }

            pub fn get(&self, dim: MatmulDim) -> u32 {
                match dim {
                    MatmulDim::M => self.m,
                    MatmulDim::N => self.n,
                    MatmulDim::K => self.k,
                }
            }

            /// Elements of an `m × n` tile, `None` past `u32::MAX`.
            pub fn mn(&self) -> Option<u32> {
                self.m.checked_mul(self.n)
            }

            pub fn mk(&self) -> Option<u32> {
                self.m.checked_mul(self.k)
            }

            pub fn nk(&self) -> Option<u32> {
                self.n.checked_mul(self.k)
            }
        }

        impl From<(u32, u32, u32)> for $name {
            fn from(value: (u32, u32, u32)) -> Self {
                Self::new(value.0, value.1, value.2)
            }
        }
    };
}

// Shape m,n,k of a multiply-accumulate at some level of the hierarchy
define_3d_size_base!(GemmShape);

/// Tiling of one multiply-accumulate stage.
///
/// A cube computes a `threadblock` tile, each plane a `warp` tile of it, and each call to the
/// tile matmul an `instruction` tile.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilingScheme {
    pub threadblock: GemmShape,
    pub warp: GemmShape,
    pub instruction: GemmShape,
}

impl TilingScheme {
    pub fn builder() -> TilingSchemeBuilder {
        TilingSchemeBuilder::default()
    }

    /// Number of warp tiles along a dimension of the threadblock tile.
    pub fn warps(&self, dim: MatmulDim) -> u32 {
        self.threadblock.get(dim) / self.warp.get(dim)
    }

    /// Number of planes splitting the reduction dimension of one threadblock tile.
    pub fn partitions_k(&self) -> u32 {
        self.warps(MatmulDim::K)
    }

    /// Number of planes needed to cover the threadblock tile, `None` past `u32::MAX`.
    pub fn warp_count(&self) -> Option<u32> {
        self.warps(MatmulDim::M)
            .checked_mul(self.warps(MatmulDim::N))?
            .checked_mul(self.warps(MatmulDim::K))
    }

    /// Number of instruction tiles along a dimension of the warp tile.
    pub fn instructions(&self, dim: MatmulDim) -> u32 {
        self.warp.get(dim) / self.instruction.get(dim)
    }

    pub(crate) fn validate(&self, stage: StageIdent) -> Result<(), InvalidConfigError> {
        let scheme = *self;
        let dims = [MatmulDim::M, MatmulDim::N, MatmulDim::K];

        for dim in dims {
            if self.instruction.get(dim) == 0 {
                return Err(FormattedConfigError::new(move || {
                    format!("Instruction shape of {stage} is empty along {dim:?}: {scheme:?}.")
                }));
            }
        }

        for dim in dims {
            let warp = self.warp.get(dim);
            if warp == 0 || warp % self.instruction.get(dim) != 0 {
                return Err(FormattedConfigError::new(move || {
                    format!(
                        "Warp shape of {stage} must be a multiple of its instruction shape along {dim:?}, got {:?} and {:?}.",
                        scheme.warp, scheme.instruction
                    )
                }));
            }

            let threadblock = self.threadblock.get(dim);
            if threadblock == 0 || threadblock % warp != 0 {
                return Err(FormattedConfigError::new(move || {
                    format!(
                        "Threadblock shape of {stage} must be a multiple of its warp shape along {dim:?}, got {:?} and {:?}.",
                        scheme.threadblock, scheme.warp
                    )
                }));
            }
        }

        let threadblock = self.threadblock;
        if threadblock.mn().is_none() || threadblock.mk().is_none() || threadblock.nk().is_none() {
            return Err(FormattedConfigError::new(move || {
                format!("Threadblock shape of {stage} overflows 32-bit element counts: {threadblock:?}.")
            }));
        }

        if self.warp_count().is_none() {
            return Err(FormattedConfigError::new(move || {
                format!("Plane count of {stage} overflows 32 bits: {scheme:?}.")
            }));
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct TilingSchemeBuilder {
    threadblock: Option<GemmShape>,
    warp: Option<GemmShape>,
    instruction: Option<GemmShape>,
}

impl TilingSchemeBuilder {
    pub fn with_threadblock<S: Into<GemmShape>>(mut self, threadblock: S) -> Self {
        self.threadblock = Some(threadblock.into());
        self
    }

    pub fn with_warp<S: Into<GemmShape>>(mut self, warp: S) -> Self {
        self.warp = Some(warp.into());
        self
    }

    pub fn with_instruction<S: Into<GemmShape>>(mut self, instruction: S) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn build(self) -> Result<TilingScheme, &'static str> {
        Ok(TilingScheme {
            threadblock: self.threadblock.ok_or("Missing threadblock shape")?,
            warp: self.warp.ok_or("Missing warp shape")?,
            instruction: self.instruction.ok_or("Missing instruction shape")?,
        })
    }
}

/// Tiling of both stages of the fused matmul.
///
/// The threadblock tile of the first stage spans the whole intermediate row block, which the
/// second stage consumes along its reduction dimension.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct B2bTilingScheme {
    pub gemm0: TilingScheme,
    pub gemm1: TilingScheme,
}

impl B2bTilingScheme {
    /// Rows of output produced by one cube.
    pub fn tile_m(&self) -> u32 {
        self.gemm0.threadblock.m
    }

    /// Columns of output produced by one cube.
    pub fn tile_n(&self) -> u32 {
        self.gemm1.threadblock.n
    }

    /// Widest intermediate a cube can keep on chip.
    pub fn max_intermediate_width(&self) -> u32 {
        self.gemm0.threadblock.n
    }
}
