//! Tversky loss.
//!
//! ```text
//! TI   = (TP + s) / (TP + alpha * FP + beta * FN + s)
//! Loss = 1 - TI
//! ```
//!
//! With `alpha = beta = 0.5` and no smoothing this is the Dice loss.

use burn::{
    config::Config,
    module::Module,
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

/// Configuration for creating a [Tversky loss](TverskyLoss).
#[derive(Config, Debug)]
pub struct TverskyLossConfig {
    /// Penalty on false positives. Default: 0.5
    #[config(default = 0.5)]
    pub alpha: f64,
    /// Penalty on false negatives. Default: 0.5
    #[config(default = 0.5)]
    pub beta: f64,
    /// Additive smoothing. Default: 1.0
    #[config(default = 1.0)]
    pub smooth: f64,
}

impl TverskyLossConfig {
    /// Initialize [Tversky loss](TverskyLoss).
    pub fn init(&self) -> TverskyLoss {
        assert!(
            self.alpha >= 0.0 && self.beta >= 0.0,
            "TverskyLoss penalties must be non-negative, got alpha={} beta={}",
            self.alpha,
            self.beta
        );
        TverskyLoss {
            alpha: self.alpha,
            beta: self.beta,
            smooth: self.smooth,
        }
    }
}

#[derive(Module, Clone, Debug)]
pub struct TverskyLoss {
    pub alpha: f64,
    pub beta: f64,
    pub smooth: f64,
}

impl Default for TverskyLoss {
    fn default() -> Self {
        TverskyLossConfig::new().init()
    }
}

impl TverskyLoss {
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

    /// Tversky loss for each sample, shape `[batch_size]`.
    pub fn forward_no_reduction<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
    ) -> Tensor<B, 1> {
        crate::assert_same_shape("TverskyLoss", &predictions, &targets);
        let [batch_size, ..] = predictions.dims();

        let pred_flat = crate::flatten_samples(predictions);
        let target_flat = crate::flatten_samples(targets);

        let true_pos = (pred_flat.clone() * target_flat.clone()).sum_dim(1);
        let false_pos = (pred_flat.clone() * target_flat.clone().neg().add_scalar(1.0)).sum_dim(1);
        let false_neg = (pred_flat.neg().add_scalar(1.0) * target_flat).sum_dim(1);

        let denominator = true_pos.clone()
            + false_pos.mul_scalar(self.alpha)
            + false_neg.mul_scalar(self.beta);
        let index = true_pos
            .add_scalar(self.smooth)
            .div(denominator.add_scalar(self.smooth));

        index.neg().add_scalar(1.0).reshape([batch_size])
    }
}
