//! Soft Dice loss.

use burn::{
    config::Config,
    module::Module,
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

/// Configuration for creating a [Dice loss](DiceLoss).
#[derive(Config, Debug)]
pub struct DiceLossConfig {
    /// Additive smoothing on numerator and denominator. Default: 1.0
    #[config(default = 1.0)]
    pub smooth: f64,
    /// Apply a sigmoid to the predictions first. Default: false
    #[config(default = false)]
    pub logits: bool,
}

impl DiceLossConfig {
    /// Initialize [Dice loss](DiceLoss).
    pub fn init(&self) -> DiceLoss {
        assert!(
            self.smooth >= 0.0,
            "Smoothing for DiceLoss must be non-negative, got {}",
            self.smooth
        );
        DiceLoss {
            smooth: self.smooth,
            logits: self.logits,
        }
    }
}

/// Soft Dice loss: `1 - (2 |P ∩ T| + s) / (|P| + |T| + s)` per sample.
#[derive(Module, Clone, Debug)]
pub struct DiceLoss {
    pub smooth: f64,
    pub logits: bool,
}

impl Default for DiceLoss {
    fn default() -> Self {
        DiceLossConfig::new().init()
    }
}

impl DiceLoss {
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

    /// Dice loss for each sample, shape `[batch_size]`.
    pub fn forward_no_reduction<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
    ) -> Tensor<B, 1> {
        crate::assert_same_shape("DiceLoss", &predictions, &targets);
        let [batch_size, ..] = predictions.dims();

        let pred_flat = crate::flatten_samples(crate::probabilities(predictions, self.logits));
        let target_flat = crate::flatten_samples(targets);

        let intersection = (pred_flat.clone() * target_flat.clone()).sum_dim(1);
        let cardinality = pred_flat.sum_dim(1) + target_flat.sum_dim(1);
        let dice = intersection
            .mul_scalar(2.0)
            .add_scalar(self.smooth)
            .div(cardinality.add_scalar(self.smooth));

        dice.neg().add_scalar(1.0).reshape([batch_size])
    }
}

#[cfg(test)]
mod tests {
    use burn::tensor::{cast::ToElement, TensorData};

    use super::*;
    use crate::tests::TestBackend;

    #[test]
    fn dice_loss_is_zero_for_identical_masks() {
        let device = Default::default();
        let mask = Tensor::<TestBackend, 4>::from_data(
            TensorData::from([[[[1.0, 0.0], [1.0, 1.0]]]]),
            &device,
        );

        let value = DiceLoss::default()
            .forward(mask.clone(), mask, Reduction::Mean)
            .into_scalar()
            .to_f64();

        assert!(value.abs() < 1e-6, "{value}");
    }

    #[test]
    fn dice_loss_without_smoothing_matches_closed_form() {
        let device = Default::default();
        let loss = DiceLossConfig::new().with_smooth(0.0).init();

        // intersection 1, |P| 2, |T| 2 -> dice 0.5
        let predictions = Tensor::<TestBackend, 4>::from_data(
            TensorData::from([[[[1.0, 1.0], [0.0, 0.0]]]]),
            &device,
        );
        let targets = Tensor::<TestBackend, 4>::from_data(
            TensorData::from([[[[1.0, 0.0], [1.0, 0.0]]]]),
            &device,
        );

        let value = loss
            .forward(predictions, targets, Reduction::Mean)
            .into_scalar()
            .to_f64();

        assert!((value - 0.5).abs() < 1e-6, "{value}");
    }

    #[test]
    fn dice_loss_keeps_one_value_per_sample() {
        let device = Default::default();
        let predictions = Tensor::<TestBackend, 4>::zeros([3, 2, 4, 4], &device);
        let targets = Tensor::<TestBackend, 4>::ones([3, 2, 4, 4], &device);

        let per_sample = DiceLoss::default().forward_no_reduction(predictions, targets);

        assert_eq!(per_sample.dims(), [3]);
    }
}
