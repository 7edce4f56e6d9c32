//! L1 distance between predicted and target masks.
//!
//! Registered as `mae` / `l1loss`. On a `[N, C, H, W]` batch the module
//! convention takes the mean over every pixel, while the functional
//! convention averages each sample of [`MaeLoss::forward_no_reduction`]
//! separately. `weight` scales the unreduced values, so both see it.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Module, ModuleDisplay},
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

/// Configuration for creating an [L1 loss](MaeLoss).
#[derive(Config, Debug)]
pub struct MaeLossConfig {
    /// Scale applied to every absolute difference. Default: 1.0
    #[config(default = 1.0)]
    pub weight: f64,
}

impl MaeLossConfig {
    /// Initialize [L1 loss](MaeLoss).
    pub fn init(&self) -> MaeLoss {
        assert!(
            self.weight > 0.0,
            "MaeLoss weight must be positive, got {}",
            self.weight
        );
        MaeLoss {
            weight: self.weight,
        }
    }
}

/// Weighted L1 loss, `weight * |prediction - target|`.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct MaeLoss {
    pub weight: f64,
}

impl Default for MaeLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleDisplay for MaeLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content.add("weight", &self.weight).optional()
    }
}

impl MaeLoss {
    /// Unit-weight L1 loss.
    pub fn new() -> Self {
        MaeLossConfig::new().init()
    }

    /// Reduce the weighted distances of a batch to `[1]`.
    pub fn forward<const D: usize, B: Backend>(
        &self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
        reduction: Reduction,
    ) -> Tensor<B, 1> {
        let distances = self.forward_no_reduction(predictions, targets);
        match reduction {
            Reduction::Mean | Reduction::Auto => distances.mean(),
            Reduction::Sum => distances.sum(),
        }
    }

    /// Weighted absolute difference at every position; same shape as the
    /// inputs.
    pub fn forward_no_reduction<const D: usize, B: Backend>(
        &self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> Tensor<B, D> {
        crate::assert_same_shape("MaeLoss", &predictions, &targets);
        predictions.sub(targets).abs().mul_scalar(self.weight)
    }
}
