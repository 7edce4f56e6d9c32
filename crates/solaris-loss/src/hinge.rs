//! Hinge and squared hinge loss on binary labels.
//!
//! Targets in `{0, 1}` are mapped to `{-1, 1}` before computing
//! `max(0, 1 - t * x)`.

use burn::{
    config::Config,
    module::Module,
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

/// Configuration for creating a [hinge loss](HingeLoss).
#[derive(Config, Debug)]
pub struct HingeLossConfig {
    /// Square the hinge. Default: false
    #[config(default = false)]
    pub squared: bool,
}

impl HingeLossConfig {
    pub const fn init(&self) -> HingeLoss {
        HingeLoss {
            squared: self.squared,
        }
    }
}

#[derive(Module, Clone, Debug)]
pub struct HingeLoss {
    pub squared: bool,
}

impl Default for HingeLoss {
    fn default() -> Self {
        HingeLossConfig::new().init()
    }
}

impl HingeLoss {
    pub fn forward<const D: usize, B: Backend>(
        &self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
        reduction: Reduction,
    ) -> Tensor<B, 1> {
        let loss = self.forward_no_reduction(predictions, targets);
        match reduction {
            Reduction::Mean | Reduction::Auto => loss.mean(),
            Reduction::Sum => loss.sum(),
        }
    }

    pub fn forward_no_reduction<const D: usize, B: Backend>(
        &self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> Tensor<B, D> {
        crate::assert_same_shape("HingeLoss", &predictions, &targets);

        let signs = targets.mul_scalar(2.0).sub_scalar(1.0);
        let hinge = (signs * predictions).neg().add_scalar(1.0).clamp_min(0.0);

        if self.squared {
            hinge.powf_scalar(2.0)
        } else {
            hinge
        }
    }
}
