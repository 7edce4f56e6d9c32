//! Soft Jaccard (intersection over union) loss.
//!
//! For each sample in the batch:
//! ```text
//! IoU  = (pred ∩ target) / (pred ∪ target + eps)
//! Loss = 1 - IoU
//! ```

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Module, ModuleDisplay},
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

/// Configuration for creating a [Jaccard loss](JaccardLoss).
#[derive(Config, Debug)]
pub struct JaccardLossConfig {
    /// Small epsilon value to avoid division by zero. Default: 1e-8
    #[config(default = 1e-8)]
    pub eps: f64,
    /// Apply a sigmoid to the predictions first. Default: false
    #[config(default = false)]
    pub logits: bool,
}

impl JaccardLossConfig {
    /// Initialize [Jaccard loss](JaccardLoss).
    pub fn init(&self) -> JaccardLoss {
        assert!(
            self.eps > 0.0,
            "Epsilon for JaccardLoss must be positive, got {}",
            self.eps
        );
        JaccardLoss {
            eps: self.eps,
            logits: self.logits,
        }
    }
}

/// Soft Jaccard loss for binary segmentation.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct JaccardLoss {
    /// Small epsilon value to avoid division by zero.
    pub eps: f64,
    /// Whether predictions are logits.
    pub logits: bool,
}

impl Default for JaccardLoss {
    fn default() -> Self {
        JaccardLossConfig::new().init()
    }
}

impl ModuleDisplay for JaccardLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content.add("eps", &self.eps).optional()
    }
}

impl JaccardLoss {
    /// Compute the criterion on the input tensor with reduction.
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, channels, height, width]`
    /// - targets: `[batch_size, channels, height, width]`
    /// - output: `[1]`
    pub fn forward<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
        reduction: Reduction,
    ) -> Tensor<B, 1> {
        let loss = self.forward_no_reduction(predictions, targets);
        match reduction {
            Reduction::Mean | Reduction::Auto => loss.mean(),
            Reduction::Sum => loss.sum(),
        }
    }

    /// Compute the criterion per sample.
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, channels, height, width]`
    /// - targets: `[batch_size, channels, height, width]`
    /// - output: `[batch_size]`
    pub fn forward_no_reduction<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
    ) -> Tensor<B, 1> {
        crate::assert_same_shape("JaccardLoss", &predictions, &targets);
        let [batch_size, ..] = predictions.dims();

        let pred_flat = crate::flatten_samples(crate::probabilities(predictions, self.logits));
        let target_flat = crate::flatten_samples(targets);

        // [B, 1]
        let intersection = (pred_flat.clone() * target_flat.clone()).sum_dim(1);
        let union = pred_flat.sum_dim(1) + target_flat.sum_dim(1) - intersection.clone();
        let iou = intersection / union.add_scalar(self.eps);

        iou.neg().add_scalar(1.0).reshape([batch_size])
    }
}
