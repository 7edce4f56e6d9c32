//! Binary focal loss.
//!
//! Focal loss down-weights well-classified pixels so training concentrates on
//! hard examples:
//! ```text
//! p_t     = p * y + (1 - p) * (1 - y)
//! alpha_t = alpha * y + (1 - alpha) * (1 - y)
//! FL      = -alpha_t * (1 - p_t)^gamma * log(p_t)
//! ```

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Module, ModuleDisplay},
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

/// Configuration for creating a [focal loss](FocalLoss).
#[derive(Config, Debug)]
pub struct FocalLossConfig {
    /// Focusing parameter. `0` reduces to alpha-weighted cross-entropy. Default: 2.0
    #[config(default = 2.0)]
    pub gamma: f64,
    /// Weight of the positive class, in `[0, 1]`. Default: 0.25
    #[config(default = 0.25)]
    pub alpha: f64,
    /// Apply a sigmoid to the predictions first. Default: false
    #[config(default = false)]
    pub logits: bool,
    /// Probabilities are clamped to `[eps, 1 - eps]` before the log. Default: 1e-7
    #[config(default = 1e-7)]
    pub eps: f64,
}

impl FocalLossConfig {
    /// Initialize [focal loss](FocalLoss).
    pub fn init(&self) -> FocalLoss {
        self.assertions();
        FocalLoss {
            gamma: self.gamma,
            alpha: self.alpha,
            logits: self.logits,
            eps: self.eps,
        }
    }

    fn assertions(&self) {
        assert!(
            self.gamma >= 0.0,
            "Gamma for FocalLoss must be non-negative, got {}",
            self.gamma
        );
        assert!(
            (0.0..=1.0).contains(&self.alpha),
            "Alpha for FocalLoss must lie in [0, 1], got {}",
            self.alpha
        );
    }
}

/// Binary focal loss.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct FocalLoss {
    pub gamma: f64,
    pub alpha: f64,
    pub logits: bool,
    pub eps: f64,
}

impl Default for FocalLoss {
    fn default() -> Self {
        FocalLossConfig::new().init()
    }
}

impl ModuleDisplay for FocalLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content
            .add("gamma", &self.gamma)
            .add("alpha", &self.alpha)
            .optional()
    }
}

impl FocalLoss {
    /// Compute the criterion on the input tensor with reduction.
    ///
    /// # Shapes
    ///
    /// - predictions: `[...dims]`
    /// - targets: `[...dims]`, binary labels
    /// - output: `[1]`
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

    /// Compute the element-wise criterion.
    pub fn forward_no_reduction<const D: usize, B: Backend>(
        &self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> Tensor<B, D> {
        crate::assert_same_shape("FocalLoss", &predictions, &targets);

        let probs = crate::probabilities(predictions, self.logits);
        let negatives = targets.clone().neg().add_scalar(1.0);

        let p_t = probs.clone() * targets.clone() + probs.neg().add_scalar(1.0) * negatives.clone();
        let p_t = p_t.clamp(self.eps, 1.0 - self.eps);
        let alpha_t = targets.mul_scalar(self.alpha) + negatives.mul_scalar(1.0 - self.alpha);

        let modulating = p_t.clone().neg().add_scalar(1.0).powf_scalar(self.gamma);

        (alpha_t * modulating * p_t.log()).neg()
    }
}
