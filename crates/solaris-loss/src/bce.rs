//! Binary cross-entropy on probabilities or logits.

use burn::{
    config::Config,
    module::Module,
    nn::loss::Reduction,
    tensor::{backend::Backend, ElementConversion, Tensor},
};

/// Configuration for creating a [binary cross-entropy loss](BinaryCrossEntropyLoss).
#[derive(Config, Debug)]
pub struct BinaryCrossEntropyLossConfig {
    /// Treat predictions as raw logits instead of probabilities. Default: false
    #[config(default = false)]
    pub logits: bool,
}

impl BinaryCrossEntropyLossConfig {
    /// Initialize [binary cross-entropy loss](BinaryCrossEntropyLoss).
    pub const fn init(&self) -> BinaryCrossEntropyLoss {
        BinaryCrossEntropyLoss {
            logits: self.logits,
        }
    }
}

/// Binary cross-entropy loss.
///
/// With probabilities the log terms are clamped at `-100`, matching
/// PyTorch's `F.binary_cross_entropy`. With logits the numerically stable
/// form `max(x, 0) - x * y + log(1 + exp(-|x|))` is used.
#[derive(Module, Clone, Debug)]
pub struct BinaryCrossEntropyLoss {
    pub logits: bool,
}

impl Default for BinaryCrossEntropyLoss {
    fn default() -> Self {
        BinaryCrossEntropyLossConfig::new().init()
    }
}

impl BinaryCrossEntropyLoss {
    /// Compute the criterion with reduction.
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
    ///
    /// # Shapes
    ///
    /// - predictions: `[...dims]`
    /// - targets: `[...dims]`, values in `[0, 1]`
    /// - output: `[...dims]`
    pub fn forward_no_reduction<const D: usize, B: Backend>(
        &self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> Tensor<B, D> {
        crate::assert_same_shape("BinaryCrossEntropyLoss", &predictions, &targets);

        if self.logits {
            let positive = predictions.clone().clamp_min(0.0);
            let softplus = predictions.clone().abs().neg().exp().add_scalar(1.0).log();
            return positive - predictions * targets + softplus;
        }

        let log_clamp_min = (-100.0_f32).elem::<B::FloatElem>();
        let log_input = predictions.clone().log().clamp_min(log_clamp_min);
        let log_one_minus_input = predictions.neg().add_scalar(1.0).log().clamp_min(log_clamp_min);
        let one_minus_targets = targets.clone().neg().add_scalar(1.0);

        (targets * log_input + one_minus_targets * log_one_minus_input).neg()
    }
}
