//! Smooth L1 (Huber-style) loss.
//!
//! ```text
//! l_n = 0.5 * d^2 / beta   if d < beta
//!       d - 0.5 * beta     otherwise,   where d = |x_n - y_n|
//! ```

use burn::{
    config::Config,
    module::Module,
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

/// Configuration for creating a [smooth L1 loss](SmoothL1Loss).
#[derive(Config, Debug)]
pub struct SmoothL1LossConfig {
    /// Threshold between the quadratic and linear regions. Default: 1.0
    #[config(default = 1.0)]
    pub beta: f64,
}

impl SmoothL1LossConfig {
    /// Initialize [smooth L1 loss](SmoothL1Loss).
    pub fn init(&self) -> SmoothL1Loss {
        assert!(
            self.beta > 0.0,
            "Beta for SmoothL1Loss must be positive, got {}",
            self.beta
        );
        SmoothL1Loss { beta: self.beta }
    }
}

/// Smooth L1 loss.
#[derive(Module, Clone, Debug)]
pub struct SmoothL1Loss {
    pub beta: f64,
}

impl Default for SmoothL1Loss {
    fn default() -> Self {
        SmoothL1LossConfig::new().init()
    }
}

impl SmoothL1Loss {
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
        crate::assert_same_shape("SmoothL1Loss", &predictions, &targets);

        let diff = (predictions - targets).abs();
        let quadratic = diff.clone().powf_scalar(2.0).mul_scalar(0.5 / self.beta);
        let linear = diff.clone().sub_scalar(0.5 * self.beta);

        linear.mask_where(diff.lower_elem(self.beta), quadratic)
    }
}
