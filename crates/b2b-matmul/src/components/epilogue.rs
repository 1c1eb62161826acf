use cubecl::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Element-wise function applied after a linear combination.
#[derive(Default, Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    #[default]
    Identity,
    Relu,
    Sigmoid,
    Silu,
    /// Tanh approximation of the gaussian error linear unit.
    Gelu,
    Tanh,
}

impl Activation {
    pub fn apply(&self, x: f32) -> f32 {
        match self {
            Activation::Identity => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Silu => x / (1.0 + (-x).exp()),
            Activation::Gelu => {
                const SQRT_2_OVER_PI: f32 = 0.797_884_6;
                0.5 * x * (1.0 + (SQRT_2_OVER_PI * (x + 0.044_715 * x * x * x)).tanh())
            }
            Activation::Tanh => x.tanh(),
        }
    }
}

/// Applies `activation` to `x` inside a kernel.
#[cube]
pub fn activate<F: Float>(x: F, #[comptime] activation: Activation) -> F {
    match comptime!(activation) {
        Activation::Identity => x,
        Activation::Relu => F::max(x, F::new(0.0)),
        Activation::Sigmoid => F::new(1.0) / (F::new(1.0) + F::exp(-x)),
        Activation::Silu => x / (F::new(1.0) + F::exp(-x)),
        Activation::Gelu => {
            let inner = F::new(0.797_884_6) * (x + F::new(0.044_715) * x * x * x);
            F::new(0.5) * x * (F::new(1.0) + F::tanh(inner))
        }
        Activation::Tanh => F::tanh(x),
    }
}

/// `activation(alpha * accumulator + beta * source)` inside a kernel.
///
/// `source` is only read when `with_source` is set.
#[cube]
pub fn linear_combination<F: Float>(
    accumulator: F,
    source: F,
    alpha: F,
    beta: F,
    #[comptime] with_source: bool,
    #[comptime] activation: Activation,
) -> F {
    let mut value = alpha * accumulator;
    if comptime!(with_source) {
        value += beta * source;
    }
    activate::<F>(value, activation)
}

/// Element-wise operation combining an accumulator with an optional source element.
///
/// Every operation is a linear combination followed by an [Activation]; the kernels receive
/// its coefficients as launch scalars and the activation at compile time.
pub trait EpilogueOp: Copy + Send + Sync + Debug + 'static {
    /// Output for one element. `source` is zero when the source isn't read.
    fn apply(&self, accumulator: f32, source: f32) -> f32;

    /// Whether the source operand contributes to the output.
    fn is_source_needed(&self) -> bool;

    /// Scale of the accumulator.
    fn alpha(&self) -> f32;

    /// Scale of the source.
    fn beta(&self) -> f32;

    fn activation(&self) -> Activation {
        Activation::Identity
    }

    /// Value written in place of masked elements.
    ///
    /// Masked intermediate elements feed the sum of the second stage, so this is its identity.
    fn mask_fill(&self) -> f32 {
        0.0
    }
}

/// `activation(alpha * accumulator + beta * source)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, new)]
pub struct LinearCombinationActivation {
    pub alpha: f32,
    pub beta: f32,
    pub activation: Activation,
}

impl LinearCombinationActivation {
    pub fn activation(activation: Activation) -> Self {
        Self::new(1.0, 0.0, activation)
    }
}

impl Default for LinearCombinationActivation {
    fn default() -> Self {
        Self::activation(Activation::Identity)
    }
}

impl EpilogueOp for LinearCombinationActivation {
    fn apply(&self, accumulator: f32, source: f32) -> f32 {
        let value = match self.is_source_needed() {
            true => self.alpha * accumulator + self.beta * source,
            false => self.alpha * accumulator,
        };
        self.activation.apply(value)
    }

    fn is_source_needed(&self) -> bool {
        self.beta != 0.0
    }

    fn alpha(&self) -> f32 {
        self.alpha
    }

    fn beta(&self) -> f32 {
        self.beta
    }

    fn activation(&self) -> Activation {
        self.activation
    }
}

/// `alpha * accumulator + beta * source`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, new)]
pub struct LinearCombination {
    pub alpha: f32,
    pub beta: f32,
}

impl Default for LinearCombination {
    fn default() -> Self {
        Self::new(1.0, 0.0)
    }
}

impl EpilogueOp for LinearCombination {
    fn apply(&self, accumulator: f32, source: f32) -> f32 {
        match self.is_source_needed() {
            true => self.alpha * accumulator + self.beta * source,
            false => self.alpha * accumulator,
        }
    }

    fn is_source_needed(&self) -> bool {
        self.beta != 0.0
    }

    fn alpha(&self) -> f32 {
        self.alpha
    }

    fn beta(&self) -> f32 {
        self.beta
    }
}

/// Operations applied between the stages (`f1`) and before the output is written (`f2`).
#[derive(Default, Clone, Copy, Debug, PartialEq, new)]
pub struct B2bEpilogue<E0: EpilogueOp, E1: EpilogueOp> {
    pub op0: E0,
    pub op1: E1,
}
