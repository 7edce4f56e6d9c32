//! Stateless losses called as `(y_true, y_pred)`.
//!
//! Functional losses reduce every sample of a `[batch, channels, height, width]`
//! batch to one value and return `[batch]`. A composite concatenates the
//! weighted per-sample outputs of its members and sums them into `[1]`.

use std::{fmt, sync::Arc};

use burn::tensor::{backend::Backend, Tensor};
use solaris_loss::{
    BinaryCrossEntropyLossConfig, DiceLoss, FocalLossConfig, HingeLossConfig, JaccardLoss,
    MaeLoss, MseLoss, SmoothL1Loss, TverskyLossConfig,
};

use crate::{
    error::{LossError, LossResult},
    provider::{LossProvider, WeightedLoss},
    registry::LossRegistry,
    spec::Hyperparameters,
    Framework,
};

type LossFn<B> = dyn Fn(Tensor<B, 4>, Tensor<B, 4>) -> Tensor<B, 1> + Send + Sync;

/// A stateless loss function.
pub struct FunctionalLoss<B: Backend> {
    name: String,
    func: Arc<LossFn<B>>,
}

impl<B: Backend> FunctionalLoss<B> {
    /// Wrap `func`, which is called as `func(y_true, y_pred)`.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Tensor<B, 4>, Tensor<B, 4>) -> Tensor<B, 1> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate the loss.
    ///
    /// # Shapes
    ///
    /// - y_true: `[batch_size, channels, height, width]`
    /// - y_pred: `[batch_size, channels, height, width]`
    /// - output: `[batch_size]` for a single loss, `[1]` for a composite
    pub fn call(&self, y_true: Tensor<B, 4>, y_pred: Tensor<B, 4>) -> Tensor<B, 1> {
        (self.func)(y_true, y_pred)
    }
}

impl<B: Backend> Clone for FunctionalLoss<B> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<B: Backend> fmt::Debug for FunctionalLoss<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionalLoss")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Builds a functional loss from hyperparameters.
pub type FunctionalFactory<B> =
    Arc<dyn Fn(Hyperparameters) -> LossResult<FunctionalLoss<B>> + Send + Sync>;

/// A functional registry entry.
pub enum FunctionalEntry<B: Backend> {
    /// Returned as-is. Hyperparameters given for it are ignored.
    Fixed(FunctionalLoss<B>),
    /// Constructed from the configured hyperparameters.
    Parametrized(FunctionalFactory<B>),
}

impl<B: Backend> FunctionalEntry<B> {
    /// A parametrized entry from a plain constructor function.
    pub fn parametrized<F>(factory: F) -> Self
    where
        F: Fn(Hyperparameters) -> LossResult<FunctionalLoss<B>> + Send + Sync + 'static,
    {
        Self::Parametrized(Arc::new(factory))
    }
}

impl<B: Backend> Clone for FunctionalEntry<B> {
    fn clone(&self) -> Self {
        match self {
            Self::Fixed(loss) => Self::Fixed(loss.clone()),
            Self::Parametrized(factory) => Self::Parametrized(Arc::clone(factory)),
        }
    }
}

/// Registry of functional losses.
pub type FunctionalRegistry<B> = LossRegistry<FunctionalEntry<B>>;

impl<B: Backend> LossRegistry<FunctionalEntry<B>> {
    /// The built-in functional losses.
    pub fn builtin() -> Self {
        let bce = BinaryCrossEntropyLossConfig::new().init();
        let bce = element_wise("bce", move |y_true, y_pred| {
            bce.forward_no_reduction(y_pred, y_true)
        });
        let bce_logits = BinaryCrossEntropyLossConfig::new().with_logits(true).init();
        let bce_logits = element_wise("bcewithlogits", move |y_true, y_pred| {
            bce_logits.forward_no_reduction(y_pred, y_true)
        });
        let mae = MaeLoss::new();
        let mae = element_wise("mae", move |y_true, y_pred| {
            mae.forward_no_reduction(y_pred, y_true)
        });
        let mse = MseLoss::new();
        let mse = element_wise("mse", move |y_true, y_pred| {
            mse.forward_no_reduction(y_pred, y_true)
        });
        let huber = SmoothL1Loss::default();
        let huber = element_wise("huber", move |y_true, y_pred| {
            huber.forward_no_reduction(y_pred, y_true)
        });
        let hinge = HingeLossConfig::new().init();
        let hinge = element_wise("hinge", move |y_true, y_pred| {
            hinge.forward_no_reduction(y_pred, y_true)
        });
        let squared_hinge = HingeLossConfig::new().with_squared(true).init();
        let squared_hinge = element_wise("squared_hinge", move |y_true, y_pred| {
            squared_hinge.forward_no_reduction(y_pred, y_true)
        });
        let dice = DiceLoss::default();
        let dice = FunctionalLoss::new("dice", move |y_true, y_pred| {
            dice.forward_no_reduction(y_pred, y_true)
        });
        let jaccard = JaccardLoss::default();
        let jaccard = FunctionalLoss::new("jaccard", move |y_true, y_pred| {
            jaccard.forward_no_reduction(y_pred, y_true)
        });

        Self::new()
            .with("bce", FunctionalEntry::Fixed(bce.clone()))
            .with("binary_crossentropy", FunctionalEntry::Fixed(bce))
            .with("bcewithlogits", FunctionalEntry::Fixed(bce_logits))
            .with("mae", FunctionalEntry::Fixed(mae.clone()))
            .with("mean_absolute_error", FunctionalEntry::Fixed(mae))
            .with("mse", FunctionalEntry::Fixed(mse.clone()))
            .with("mean_squared_error", FunctionalEntry::Fixed(mse))
            .with("huber", FunctionalEntry::Fixed(huber))
            .with("hinge", FunctionalEntry::Fixed(hinge))
            .with("squared_hinge", FunctionalEntry::Fixed(squared_hinge))
            .with("dice", FunctionalEntry::Fixed(dice))
            .with("jaccard", FunctionalEntry::Fixed(jaccard))
            .with("focal", FunctionalEntry::parametrized(focal::<B>))
            .with("tversky", FunctionalEntry::parametrized(tversky::<B>))
    }
}

/// Wrap an element-wise loss so it returns the mean over each sample.
fn element_wise<B, F>(name: &str, func: F) -> FunctionalLoss<B>
where
    B: Backend,
    F: Fn(Tensor<B, 4>, Tensor<B, 4>) -> Tensor<B, 4> + Send + Sync + 'static,
{
    FunctionalLoss::new(name, move |y_true, y_pred| {
        let loss = func(y_true, y_pred);
        let [batch_size, ..] = loss.dims();
        loss.reshape([batch_size as i32, -1])
            .mean_dim(1)
            .reshape([batch_size])
    })
}

fn focal<B: Backend>(mut params: Hyperparameters) -> LossResult<FunctionalLoss<B>> {
    let mut config = FocalLossConfig::new();
    if let Some(gamma) = params.take_f64_checked("gamma", |g| g >= 0.0, "a non-negative value")? {
        config = config.with_gamma(gamma);
    }
    if let Some(alpha) =
        params.take_f64_checked("alpha", |a| (0.0..=1.0).contains(&a), "a value in [0, 1]")?
    {
        config = config.with_alpha(alpha);
    }
    if let Some(logits) = params.take_bool("logits")? {
        config = config.with_logits(logits);
    }
    params.finish()?;

    let loss = config.init();
    Ok(element_wise("focal", move |y_true, y_pred| {
        loss.forward_no_reduction(y_pred, y_true)
    }))
}

fn tversky<B: Backend>(mut params: Hyperparameters) -> LossResult<FunctionalLoss<B>> {
    let mut config = TverskyLossConfig::new();
    if let Some(alpha) = params.take_f64_checked("alpha", |a| a >= 0.0, "a non-negative value")? {
        config = config.with_alpha(alpha);
    }
    if let Some(beta) = params.take_f64_checked("beta", |b| b >= 0.0, "a non-negative value")? {
        config = config.with_beta(beta);
    }
    if let Some(smooth) = params.take_f64_checked("smooth", |s| s >= 0.0, "a non-negative value")? {
        config = config.with_smooth(smooth);
    }
    params.finish()?;

    let loss = config.init();
    Ok(FunctionalLoss::new("tversky", move |y_true, y_pred| {
        loss.forward_no_reduction(y_pred, y_true)
    }))
}

/// Resolves losses to [`FunctionalLoss`] closures.
#[derive(Clone, Debug)]
pub struct FunctionalProvider<B: Backend> {
    registry: FunctionalRegistry<B>,
}

impl<B: Backend> FunctionalProvider<B> {
    pub fn new(registry: FunctionalRegistry<B>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FunctionalRegistry<B> {
        &self.registry
    }

    /// Mutable access for registering additional losses.
    pub fn registry_mut(&mut self) -> &mut FunctionalRegistry<B> {
        &mut self.registry
    }
}

impl<B: Backend> Default for FunctionalProvider<B> {
    fn default() -> Self {
        Self::new(FunctionalRegistry::builtin())
    }
}

impl<B: Backend> LossProvider for FunctionalProvider<B> {
    type Loss = FunctionalLoss<B>;

    fn framework(&self) -> Framework {
        Framework::Functional
    }

    fn resolve_single(
        &self,
        name: &str,
        params: Option<&Hyperparameters>,
    ) -> LossResult<FunctionalLoss<B>> {
        match self.registry.get(name) {
            Some(FunctionalEntry::Parametrized(factory)) => {
                let params = params
                    .cloned()
                    .unwrap_or_else(|| Hyperparameters::empty(name));
                factory(params)
            }
            Some(FunctionalEntry::Fixed(loss)) => {
                if let Some(params) = params.filter(|params| !params.is_empty()) {
                    tracing::warn!(
                        loss = name,
                        ignored = ?params.keys(),
                        "hyperparameters are not supported for this functional loss",
                    );
                }
                Ok(loss.clone())
            }
            None => Err(LossError::UnknownLoss {
                name: name.to_owned(),
                framework: Framework::Functional,
            }),
        }
    }

    fn composite(&self, components: Vec<WeightedLoss<FunctionalLoss<B>>>) -> FunctionalLoss<B> {
        FunctionalLoss::new("composite", move |y_true: Tensor<B, 4>, y_pred: Tensor<B, 4>| {
            let weighted = components
                .iter()
                .map(|component| {
                    component
                        .loss
                        .call(y_true.clone(), y_pred.clone())
                        .mul_scalar(component.weight)
                })
                .collect::<Vec<_>>();
            Tensor::cat(weighted, 0).sum()
        })
    }
}

#[cfg(test)]
mod tests {
    use burn::tensor::{ops::FloatElem, Distribution, TensorData, Tolerance};
    use serde_json::json;

    use super::*;
    use crate::{provider::resolve, tests::TestBackend};

    type FT = FloatElem<TestBackend>;

    fn sample_batch() -> (Tensor<TestBackend, 4>, Tensor<TestBackend, 4>) {
        let device = Default::default();
        let y_true =
            Tensor::<TestBackend, 4>::random([2, 1, 4, 4], Distribution::Bernoulli(0.5), &device);
        let y_pred = Tensor::<TestBackend, 4>::random(
            [2, 1, 4, 4],
            Distribution::Uniform(0.05, 0.95),
            &device,
        );
        (y_true, y_pred)
    }

    #[test]
    fn single_loss_behaves_like_registry_entry() {
        let provider = FunctionalProvider::<TestBackend>::default();
        let (y_true, y_pred) = sample_batch();

        let resolved = resolve(&provider, &json!({ "Dice": {} }), None).unwrap();
        let Some(FunctionalEntry::Fixed(stored)) = provider.registry().get("dice") else {
            panic!("dice should be a fixed functional entry");
        };

        let expected = stored.call(y_true.clone(), y_pred.clone());
        let actual = resolved.call(y_true, y_pred);

        assert_eq!(actual.dims(), [2]);
        actual
            .into_data()
            .assert_approx_eq::<FT>(&expected.into_data(), Tolerance::default());
    }

    #[test]
    fn element_wise_losses_return_one_value_per_sample() {
        let provider = FunctionalProvider::<TestBackend>::default();
        let device = Default::default();
        let y_true = Tensor::<TestBackend, 4>::zeros([2, 1, 2, 2], &device);
        let y_pred = Tensor::<TestBackend, 4>::from_floats(
            [[[[1.0, 1.0], [1.0, 1.0]]], [[[2.0, 0.0], [0.0, 0.0]]]],
            &device,
        );

        let mae = provider.resolve_single("mae", None).unwrap();
        let per_sample = mae.call(y_true, y_pred);

        per_sample
            .into_data()
            .assert_approx_eq::<FT>(&TensorData::from([1.0, 0.5]), Tolerance::default());
    }

    #[test]
    fn composite_with_default_weights_sums_members() {
        let provider = FunctionalProvider::<TestBackend>::default();
        let (y_true, y_pred) = sample_batch();

        let composite = resolve(&provider, &json!({ "bce": {}, "jaccard": {} }), None).unwrap();
        let bce = provider.resolve_single("bce", None).unwrap();
        let jaccard = provider.resolve_single("jaccard", None).unwrap();

        let expected = bce.call(y_true.clone(), y_pred.clone()).sum()
            + jaccard.call(y_true.clone(), y_pred.clone()).sum();
        let actual = composite.call(y_true, y_pred);

        assert_eq!(actual.dims(), [1]);
        actual
            .into_data()
            .assert_approx_eq::<FT>(&expected.into_data(), Tolerance::default());
    }

    #[test]
    fn composite_applies_explicit_weights() {
        let provider = FunctionalProvider::<TestBackend>::default();
        let (y_true, y_pred) = sample_batch();

        let composite = resolve(
            &provider,
            &json!({ "dice": {}, "focal": { "gamma": 2 } }),
            Some(&json!({ "dice": 0.5, "focal": 0.5 })),
        )
        .unwrap();

        let dice = provider.resolve_single("dice", None).unwrap();
        let focal = FocalLossConfig::new()
            .with_gamma(2.0)
            .init()
            .forward_no_reduction(y_pred.clone(), y_true.clone())
            .reshape([2_i32, -1])
            .mean_dim(1)
            .reshape([2]);

        let expected = dice.call(y_true.clone(), y_pred.clone()).sum().mul_scalar(0.5)
            + focal.sum().mul_scalar(0.5);
        let actual = composite.call(y_true, y_pred);

        actual
            .into_data()
            .assert_approx_eq::<FT>(&expected.into_data(), Tolerance::default());
    }

    #[test]
    fn focal_is_built_from_hyperparameters() {
        let provider = FunctionalProvider::<TestBackend>::default();
        let (y_true, y_pred) = sample_batch();

        let focused = resolve(&provider, &json!({ "focal": { "alpha": 0.5 } }), None).unwrap();
        let unfocused = resolve(
            &provider,
            &json!({ "FOCAL": { "gamma": 0, "alpha": 0.5 } }),
            None,
        )
        .unwrap();

        let focused = focused.call(y_true.clone(), y_pred.clone()).sum();
        let unfocused = unfocused.call(y_true, y_pred).sum();

        let gap: f32 = (unfocused - focused).into_scalar();
        assert!(gap > 0.0, "focusing should lower the loss, gap {gap}");
    }

    #[test]
    fn focal_rejects_unknown_hyperparameters() {
        let provider = FunctionalProvider::<TestBackend>::default();

        let err = resolve(&provider, &json!({ "focal": { "gama": 2 } }), None).unwrap_err();

        assert!(matches!(err, LossError::UnexpectedHyperparameters { .. }), "{err}");
    }

    #[test]
    fn tversky_rejects_negative_smoothing() {
        let provider = FunctionalProvider::<TestBackend>::default();

        let err = resolve(&provider, &json!({ "tversky": { "smooth": -1.0 } }), None).unwrap_err();

        assert!(
            matches!(err, LossError::InvalidHyperparameter { ref parameter, .. } if parameter == "smooth"),
            "{err}"
        );
        assert!(resolve(&provider, &json!({ "tversky": { "smooth": 0.0 } }), None).is_ok());
    }

    #[test]
    fn fixed_entries_ignore_hyperparameters() {
        let provider = FunctionalProvider::<TestBackend>::default();
        let (y_true, y_pred) = sample_batch();

        let with_params = resolve(&provider, &json!({ "mse": { "weight": 10 } }), None).unwrap();
        let without = provider.resolve_single("mse", None).unwrap();

        with_params
            .call(y_true.clone(), y_pred.clone())
            .into_data()
            .assert_approx_eq::<FT>(&without.call(y_true, y_pred).into_data(), Tolerance::default());
    }

    #[test]
    fn unknown_loss_is_a_lookup_error() {
        let provider = FunctionalProvider::<TestBackend>::default();

        let err = resolve(&provider, &json!({ "lovasz": {} }), None).unwrap_err();

        assert!(matches!(
            err,
            LossError::UnknownLoss { ref name, framework: Framework::Functional } if name == "lovasz"
        ));
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn registered_losses_become_resolvable() {
        let mut provider = FunctionalProvider::<TestBackend>::default();
        provider.registry_mut().register(
            "Zero",
            FunctionalEntry::Fixed(FunctionalLoss::new("zero", |y_true: Tensor<TestBackend, 4>, _| {
                let [batch_size, ..] = y_true.dims();
                Tensor::zeros([batch_size], &y_true.device())
            })),
        );
        let (y_true, y_pred) = sample_batch();

        let composite = resolve(&provider, &json!({ "zero": {}, "mae": {} }), None).unwrap();
        let mae = provider.resolve_single("mae", None).unwrap();

        let expected = mae.call(y_true.clone(), y_pred.clone()).sum();
        composite
            .call(y_true, y_pred)
            .into_data()
            .assert_approx_eq::<FT>(&expected.into_data(), Tolerance::default());
    }
}
