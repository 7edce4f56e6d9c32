//! Loss functions for segmentation training with the Burn deep learning framework.
//!
//! These are the losses that `solaris-nets` exposes by name through its loss
//! registries. Each loss follows Burn's own loss conventions: a `Config` type
//! carrying the hyperparameters, an `init` method, a `forward` method that
//! reduces with [`Reduction`](burn::nn::loss::Reduction), and a
//! `forward_no_reduction` method that keeps either the element-wise or the
//! per-sample values.
//!
//! ## Element-wise losses
//! - **[`BinaryCrossEntropyLoss`]**: cross-entropy on probabilities or logits
//! - **[`FocalLoss`]**: cross-entropy down-weighted for well-classified pixels
//! - **[`MaeLoss`]** / **[`MseLoss`]**: L1 and L2 distance
//! - **[`SmoothL1Loss`]**: quadratic near zero, linear elsewhere
//! - **[`HingeLoss`]**: hinge and squared hinge on binary labels
//!
//! ## Region losses
//! - **[`DiceLoss`]**: soft Dice coefficient
//! - **[`JaccardLoss`]**: soft intersection over union
//! - **[`TverskyLoss`]**: Dice generalised with separate false positive and
//!   false negative penalties
//!
//! Region losses reduce each sample of a `[batch, channels, height, width]`
//! tensor to a single value, so their `forward_no_reduction` returns `[batch]`.
//!
//! ```rust
//! use burn::{nn::loss::Reduction, prelude::*};
//! use solaris_loss::{DiceLossConfig, FocalLossConfig};
//!
//! fn dice_plus_focal<B: Backend>(pred: Tensor<B, 4>, target: Tensor<B, 4>) -> Tensor<B, 1> {
//!     let dice = DiceLossConfig::new().init();
//!     let focal = FocalLossConfig::new().with_gamma(2.0).init();
//!     dice.forward(pred.clone(), target.clone(), Reduction::Mean)
//!         + focal.forward(pred, target, Reduction::Mean)
//! }
//! ```

mod bce;
mod dice;
mod focal;
mod hinge;
mod jaccard;
mod mae;
mod mse;
mod smooth_l1;
mod tversky;

pub use bce::{BinaryCrossEntropyLoss, BinaryCrossEntropyLossConfig};
pub use dice::{DiceLoss, DiceLossConfig};
pub use focal::{FocalLoss, FocalLossConfig};
pub use hinge::{HingeLoss, HingeLossConfig};
pub use jaccard::{JaccardLoss, JaccardLossConfig};
pub use mae::{MaeLoss, MaeLossConfig};
pub use mse::{MseLoss, MseLossConfig};
pub use smooth_l1::{SmoothL1Loss, SmoothL1LossConfig};
pub use tversky::{TverskyLoss, TverskyLossConfig};

use burn::tensor::{activation, backend::Backend, Tensor};

/// Turns raw scores into probabilities when `logits` is set.
pub(crate) fn probabilities<B: Backend, const D: usize>(
    predictions: Tensor<B, D>,
    logits: bool,
) -> Tensor<B, D> {
    if logits {
        activation::sigmoid(predictions)
    } else {
        predictions
    }
}

/// Flattens everything but the batch axis: `[N, ...] -> [N, M]`.
pub(crate) fn flatten_samples<B: Backend>(tensor: Tensor<B, 4>) -> Tensor<B, 2> {
    let [batch_size, ..] = tensor.dims();
    tensor.reshape([batch_size as i32, -1])
}

pub(crate) fn assert_same_shape<B: Backend, const D: usize>(
    name: &str,
    predictions: &Tensor<B, D>,
    targets: &Tensor<B, D>,
) {
    let pred_dims = predictions.dims();
    let target_dims = targets.dims();
    assert_eq!(
        pred_dims, target_dims,
        "{name}: shape of predictions ({pred_dims:?}) must match targets ({target_dims:?})"
    );
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    pub type TestBackend = NdArray;
}
