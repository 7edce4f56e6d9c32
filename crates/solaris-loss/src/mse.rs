//! Mean Squared Error (L2) loss.

use burn::{
    config::Config,
    module::Module,
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

/// Configuration for creating a [Mean Squared Error loss](MseLoss).
#[derive(Config, Debug)]
pub struct MseLossConfig {
    /// Weight factor for the loss. Default: 1.0
    #[config(default = 1.0)]
    pub weight: f64,
}

impl MseLossConfig {
    /// Initialize [Mean Squared Error loss](MseLoss).
    pub fn init(&self) -> MseLoss {
        assert!(
            self.weight > 0.0,
            "Weight for MseLoss must be positive, got {}",
            self.weight
        );
        MseLoss {
            weight: self.weight,
        }
    }
}

/// Mean Squared Error (L2) loss.
#[derive(Module, Clone, Debug)]
pub struct MseLoss {
    pub weight: f64,
}

impl Default for MseLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl MseLoss {
    /// Create a new MSE loss with default configuration.
    pub fn new() -> Self {
        MseLossConfig::new().init()
    }

    /// Calculate MSE loss.
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
        crate::assert_same_shape("MseLoss", &predictions, &targets);
        (predictions - targets)
            .powf_scalar(2.0)
            .mul_scalar(self.weight)
    }
}
