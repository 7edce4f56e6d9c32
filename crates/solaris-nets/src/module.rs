//! Loss objects called as `forward(outputs, targets)`.
//!
//! Module losses reduce a batch to its mean, shape `[1]`. A [`CompositeLoss`]
//! returns the weighted sum of its members and, through
//! [`ModuleLoss::forward_components`], the unweighted value of each member.

use std::{collections::BTreeMap, fmt, sync::Arc};

use burn::{
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};
use solaris_loss::{
    BinaryCrossEntropyLoss, BinaryCrossEntropyLossConfig, DiceLoss, DiceLossConfig, FocalLoss,
    FocalLossConfig, HingeLoss, HingeLossConfig, JaccardLoss, JaccardLossConfig, MaeLoss,
    MaeLossConfig, MseLoss, MseLossConfig, SmoothL1Loss, SmoothL1LossConfig, TverskyLoss,
    TverskyLossConfig,
};

use crate::{
    error::{LossError, LossResult},
    provider::{LossProvider, WeightedLoss},
    registry::LossRegistry,
    spec::Hyperparameters,
    Framework,
};

/// A loss object.
pub trait ModuleLoss<B: Backend>: Send + Sync + fmt::Debug {
    /// Compute the loss.
    ///
    /// # Shapes
    ///
    /// - outputs: `[batch_size, channels, height, width]`
    /// - targets: `[batch_size, channels, height, width]`
    /// - output: `[1]`
    fn forward(&self, outputs: Tensor<B, 4>, targets: Tensor<B, 4>) -> Tensor<B, 1>;

    /// Compute the loss together with the values it was built from.
    ///
    /// Plain losses report no components.
    fn forward_components(&self, outputs: Tensor<B, 4>, targets: Tensor<B, 4>) -> LossOutput<B> {
        LossOutput::new(self.forward(outputs, targets))
    }
}

/// The result of a loss evaluation.
#[derive(Debug, Clone)]
pub struct LossOutput<B: Backend> {
    /// The loss to optimise.
    pub loss: Tensor<B, 1>,
    /// Unweighted value of each composite member, keyed by configured name.
    pub values: BTreeMap<String, Tensor<B, 1>>,
}

impl<B: Backend> LossOutput<B> {
    pub fn new(loss: Tensor<B, 1>) -> Self {
        Self {
            loss,
            values: BTreeMap::new(),
        }
    }

    /// The unweighted value of the member configured as `name`.
    pub fn value(&self, name: &str) -> Option<&Tensor<B, 1>> {
        self.values.get(name)
    }
}

macro_rules! mean_reduced_module_loss {
    ($($loss:ty),* $(,)?) => {
        $(
            impl<B: Backend> ModuleLoss<B> for $loss {
                fn forward(&self, outputs: Tensor<B, 4>, targets: Tensor<B, 4>) -> Tensor<B, 1> {
                    <$loss>::forward(self, outputs, targets, Reduction::Mean)
                }
            }
        )*
    };
}

mean_reduced_module_loss!(
    BinaryCrossEntropyLoss,
    DiceLoss,
    FocalLoss,
    HingeLoss,
    JaccardLoss,
    MaeLoss,
    MseLoss,
    SmoothL1Loss,
    TverskyLoss,
);

/// Weighted sum of named module losses.
pub struct CompositeLoss<B: Backend> {
    components: Vec<WeightedLoss<Box<dyn ModuleLoss<B>>>>,
}

impl<B: Backend> CompositeLoss<B> {
    pub fn new(components: Vec<WeightedLoss<Box<dyn ModuleLoss<B>>>>) -> Self {
        Self { components }
    }

    /// Configured weight of each member.
    pub fn weights(&self) -> BTreeMap<&str, f64> {
        self.components
            .iter()
            .map(|component| (component.name.as_str(), component.weight))
            .collect()
    }
}

impl<B: Backend> fmt::Debug for CompositeLoss<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeLoss")
            .field("components", &self.components)
            .finish()
    }
}

impl<B: Backend> ModuleLoss<B> for CompositeLoss<B> {
    fn forward(&self, outputs: Tensor<B, 4>, targets: Tensor<B, 4>) -> Tensor<B, 1> {
        self.forward_components(outputs, targets).loss
    }

    fn forward_components(&self, outputs: Tensor<B, 4>, targets: Tensor<B, 4>) -> LossOutput<B> {
        let device = outputs.device();
        let mut total: Option<Tensor<B, 1>> = None;
        let mut values = BTreeMap::new();

        for component in &self.components {
            let value = component.loss.forward(outputs.clone(), targets.clone());
            let weighted = value.clone().mul_scalar(component.weight);
            total = Some(match total {
                Some(acc) => acc + weighted,
                None => weighted,
            });
            values.insert(component.name.clone(), value);
        }

        LossOutput {
            loss: total.unwrap_or_else(|| Tensor::zeros([1], &device)),
            values,
        }
    }
}

/// Builds a module loss from hyperparameters.
pub type ModuleConstructor<B> =
    Arc<dyn Fn(Hyperparameters) -> LossResult<Box<dyn ModuleLoss<B>>> + Send + Sync>;

/// Registry of module loss constructors.
pub type ModuleRegistry<B> = LossRegistry<ModuleConstructor<B>>;

/// Wrap a builder that consumes the hyperparameters it understands; anything
/// left over is rejected.
pub fn constructor<B, L, F>(build: F) -> ModuleConstructor<B>
where
    B: Backend,
    L: ModuleLoss<B> + 'static,
    F: Fn(&mut Hyperparameters) -> LossResult<L> + Send + Sync + 'static,
{
    Arc::new(move |mut params: Hyperparameters| {
        let loss = build(&mut params)?;
        params.finish()?;
        Ok(Box::new(loss) as Box<dyn ModuleLoss<B>>)
    })
}

fn positive(value: f64) -> bool {
    value > 0.0
}

fn non_negative(value: f64) -> bool {
    value >= 0.0
}

impl<B: Backend> LossRegistry<ModuleConstructor<B>> {
    /// The built-in module losses.
    pub fn builtin() -> Self {
        let bce = constructor::<B, _, _>(|_| Ok(BinaryCrossEntropyLossConfig::new().init()));
        let bce_logits = constructor::<B, _, _>(|_| {
            Ok(BinaryCrossEntropyLossConfig::new().with_logits(true).init())
        });
        let mae = constructor::<B, _, _>(|params| {
            let mut config = MaeLossConfig::new();
            if let Some(weight) = params.take_f64_checked("weight", positive, "a positive value")? {
                config = config.with_weight(weight);
            }
            Ok(config.init())
        });
        let mse = constructor::<B, _, _>(|params| {
            let mut config = MseLossConfig::new();
            if let Some(weight) = params.take_f64_checked("weight", positive, "a positive value")? {
                config = config.with_weight(weight);
            }
            Ok(config.init())
        });
        let smooth_l1 = constructor::<B, _, _>(|params| {
            let mut config = SmoothL1LossConfig::new();
            if let Some(beta) = params.take_f64_checked("beta", positive, "a positive value")? {
                config = config.with_beta(beta);
            }
            Ok(config.init())
        });
        let hinge = constructor::<B, _, _>(|_| Ok(HingeLossConfig::new().init()));
        let squared_hinge =
            constructor::<B, _, _>(|_| Ok(HingeLossConfig::new().with_squared(true).init()));

        Self::new()
            .with("bce", bce.clone())
            .with("bceloss", bce)
            .with("bcewithlogits", bce_logits.clone())
            .with("bcewithlogitsloss", bce_logits)
            .with("dice", constructor::<B, _, _>(dice))
            .with("jaccard", constructor::<B, _, _>(jaccard))
            .with("focal", constructor::<B, _, _>(focal))
            .with("tversky", constructor::<B, _, _>(tversky))
            .with("l1loss", mae.clone())
            .with("mae", mae)
            .with("mseloss", mse.clone())
            .with("mse", mse)
            .with("smoothl1loss", smooth_l1.clone())
            .with("smooth_l1", smooth_l1.clone())
            .with("huber", smooth_l1)
            .with("hinge", hinge)
            .with("squared_hinge", squared_hinge)
    }
}

fn dice(params: &mut Hyperparameters) -> LossResult<DiceLoss> {
    let mut config = DiceLossConfig::new();
    if let Some(smooth) = params.take_f64_checked("smooth", non_negative, "a non-negative value")? {
        config = config.with_smooth(smooth);
    }
    if let Some(logits) = params.take_bool("logits")? {
        config = config.with_logits(logits);
    }
    Ok(config.init())
}

fn jaccard(params: &mut Hyperparameters) -> LossResult<JaccardLoss> {
    let mut config = JaccardLossConfig::new();
    if let Some(eps) = params.take_f64_checked("eps", positive, "a positive value")? {
        config = config.with_eps(eps);
    }
    if let Some(logits) = params.take_bool("logits")? {
        config = config.with_logits(logits);
    }
    Ok(config.init())
}

fn focal(params: &mut Hyperparameters) -> LossResult<FocalLoss> {
    let mut config = FocalLossConfig::new();
    if let Some(gamma) = params.take_f64_checked("gamma", non_negative, "a non-negative value")? {
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
    Ok(config.init())
}

fn tversky(params: &mut Hyperparameters) -> LossResult<TverskyLoss> {
    let mut config = TverskyLossConfig::new();
    if let Some(alpha) = params.take_f64_checked("alpha", non_negative, "a non-negative value")? {
        config = config.with_alpha(alpha);
    }
    if let Some(beta) = params.take_f64_checked("beta", non_negative, "a non-negative value")? {
        config = config.with_beta(beta);
    }
    if let Some(smooth) = params.take_f64_checked("smooth", non_negative, "a non-negative value")? {
        config = config.with_smooth(smooth);
    }
    Ok(config.init())
}

/// Resolves losses to boxed [`ModuleLoss`] objects.
#[derive(Clone, Debug)]
pub struct ModuleProvider<B: Backend> {
    registry: ModuleRegistry<B>,
}

impl<B: Backend> ModuleProvider<B> {
    pub fn new(registry: ModuleRegistry<B>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModuleRegistry<B> {
        &self.registry
    }

    /// Mutable access for registering additional losses.
    pub fn registry_mut(&mut self) -> &mut ModuleRegistry<B> {
        &mut self.registry
    }
}

impl<B: Backend> Default for ModuleProvider<B> {
    fn default() -> Self {
        Self::new(ModuleRegistry::builtin())
    }
}

impl<B: Backend> LossProvider for ModuleProvider<B> {
    type Loss = Box<dyn ModuleLoss<B>>;

    fn framework(&self) -> Framework {
        Framework::Module
    }

    fn resolve_single(
        &self,
        name: &str,
        params: Option<&Hyperparameters>,
    ) -> LossResult<Box<dyn ModuleLoss<B>>> {
        let construct = self.registry.get(name).ok_or_else(|| LossError::UnknownLoss {
            name: name.to_owned(),
            framework: Framework::Module,
        })?;

        let params = params
            .cloned()
            .unwrap_or_else(|| Hyperparameters::empty(name));
        construct(params)
    }

    fn composite(
        &self,
        components: Vec<WeightedLoss<Box<dyn ModuleLoss<B>>>>,
    ) -> Box<dyn ModuleLoss<B>> {
        Box::new(CompositeLoss::new(components))
    }
}

#[cfg(test)]
mod tests {
    use burn::tensor::{ops::FloatElem, Distribution, Tolerance};
    use serde_json::json;

    use super::*;
    use crate::{provider::resolve, tests::TestBackend};

    type FT = FloatElem<TestBackend>;

    fn sample_batch() -> (Tensor<TestBackend, 4>, Tensor<TestBackend, 4>) {
        let device = Default::default();
        let outputs = Tensor::<TestBackend, 4>::random(
            [2, 1, 4, 4],
            Distribution::Uniform(0.05, 0.95),
            &device,
        );
        let targets =
            Tensor::<TestBackend, 4>::random([2, 1, 4, 4], Distribution::Bernoulli(0.5), &device);
        (outputs, targets)
    }

    fn assert_loss_eq(actual: Tensor<TestBackend, 1>, expected: Tensor<TestBackend, 1>) {
        actual
            .into_data()
            .assert_approx_eq::<FT>(&expected.into_data(), Tolerance::default());
    }

    #[test]
    fn single_loss_matches_direct_construction() {
        let provider = ModuleProvider::<TestBackend>::default();
        let (outputs, targets) = sample_batch();

        let resolved = resolve(&provider, &json!({ "L1Loss": null }), None).unwrap();
        let direct = MaeLoss::new().forward(outputs.clone(), targets.clone(), Reduction::Mean);

        let actual = resolved.forward(outputs, targets);

        assert_eq!(actual.dims(), [1]);
        assert_loss_eq(actual, direct);
    }

    #[test]
    fn hyperparameters_are_passed_to_the_constructor() {
        let provider = ModuleProvider::<TestBackend>::default();
        let (outputs, targets) = sample_batch();

        let plain = resolve(&provider, &json!({ "mse": {} }), None).unwrap();
        let doubled = resolve(&provider, &json!({ "mse": { "weight": 2 } }), None).unwrap();

        let plain = plain.forward(outputs.clone(), targets.clone());
        let doubled = doubled.forward(outputs, targets);

        assert_loss_eq(doubled, plain.mul_scalar(2.0));
    }

    #[test]
    fn composite_returns_weighted_sum_and_unweighted_values() {
        let provider = ModuleProvider::<TestBackend>::default();
        let (outputs, targets) = sample_batch();

        let composite = resolve(
            &provider,
            &json!({ "dice": {}, "focal": { "gamma": 2 } }),
            Some(&json!({ "dice": 0.5, "focal": 0.5 })),
        )
        .unwrap();

        let dice = DiceLoss::default().forward(outputs.clone(), targets.clone(), Reduction::Mean);
        let focal = FocalLossConfig::new().with_gamma(2.0).init().forward(
            outputs.clone(),
            targets.clone(),
            Reduction::Mean,
        );

        let output = composite.forward_components(outputs.clone(), targets.clone());

        assert_eq!(output.values.len(), 2);
        assert_loss_eq(
            output.loss.clone(),
            dice.clone().mul_scalar(0.5) + focal.clone().mul_scalar(0.5),
        );
        assert_loss_eq(output.value("dice").unwrap().clone(), dice);
        assert_loss_eq(output.value("focal").unwrap().clone(), focal);

        assert_loss_eq(composite.forward(outputs, targets), output.loss);
    }

    #[test]
    fn composite_with_default_weights_is_unweighted_sum() {
        let provider = ModuleProvider::<TestBackend>::default();
        let (outputs, targets) = sample_batch();

        let composite = resolve(
            &provider,
            &json!({ "bceloss": {}, "jaccard": {}, "smoothl1loss": { "beta": 0.5 } }),
            None,
        )
        .unwrap();

        let output = composite.forward_components(outputs, targets);
        let sum = Tensor::cat(output.values.values().cloned().collect(), 0).sum();

        assert_eq!(output.values.len(), 3);
        assert_loss_eq(output.loss, sum);
    }

    #[test]
    fn plain_losses_report_no_components() {
        let provider = ModuleProvider::<TestBackend>::default();
        let (outputs, targets) = sample_batch();

        let loss = provider.resolve_single("hinge", None).unwrap();
        let output = loss.forward_components(outputs, targets);

        assert!(output.values.is_empty());
    }

    #[test]
    fn constructor_rejects_bad_hyperparameters() {
        let provider = ModuleProvider::<TestBackend>::default();

        let err = resolve(&provider, &json!({ "focal": { "alpha": 2.0 } }), None).unwrap_err();
        assert!(matches!(err, LossError::InvalidHyperparameter { ref parameter, .. } if parameter == "alpha"));

        let err = resolve(&provider, &json!({ "hinge": { "margin": 2.0 } }), None).unwrap_err();
        assert!(matches!(err, LossError::UnexpectedHyperparameters { .. }));

        let err = resolve(&provider, &json!({ "dice": { "smooth": "one" } }), None).unwrap_err();
        assert!(matches!(err, LossError::InvalidHyperparameter { .. }));
    }

    #[test]
    fn composite_fails_fast_on_any_unknown_member() {
        let provider = ModuleProvider::<TestBackend>::default();

        let err = resolve(&provider, &json!({ "dice": {}, "NLLLoss": {} }), None).unwrap_err();

        assert!(matches!(
            err,
            LossError::UnknownLoss { ref name, framework: Framework::Module } if name == "NLLLoss"
        ));
    }

    #[test]
    fn mismatched_weights_are_rejected_before_construction() {
        let provider = ModuleProvider::<TestBackend>::default();

        let err = resolve(
            &provider,
            &json!({ "dice": {}, "focal": {} }),
            Some(&json!({ "dice": 1.0, "bce": 1.0 })),
        )
        .unwrap_err();

        assert!(matches!(err, LossError::WeightKeyMismatch { .. }));
    }

    #[test]
    fn registered_constructors_become_resolvable() {
        let mut provider = ModuleProvider::<TestBackend>::default();
        assert!(provider.resolve_single("l2", None).is_err());

        provider.registry_mut().register(
            "L2",
            constructor::<TestBackend, _, _>(|params| {
                let mut config = MseLossConfig::new();
                if let Some(weight) = params.take_f64("scale")? {
                    config = config.with_weight(weight);
                }
                Ok(config.init())
            }),
        );

        let (outputs, targets) = sample_batch();
        let loss = resolve(&provider, &json!({ "l2": { "scale": 3.0 } }), None).unwrap();
        let expected = MseLossConfig::new()
            .with_weight(3.0)
            .init()
            .forward(outputs.clone(), targets.clone(), Reduction::Mean);

        assert_loss_eq(loss.forward(outputs, targets), expected);
    }

    #[test]
    fn composite_reports_configured_weights() {
        let composite = CompositeLoss::<TestBackend>::new(vec![
            WeightedLoss {
                name: "dice".to_owned(),
                weight: 0.25,
                loss: Box::new(DiceLoss::default()),
            },
            WeightedLoss {
                name: "mae".to_owned(),
                weight: 4.0,
                loss: Box::new(MaeLoss::new()),
            },
        ]);

        let weights = composite.weights();
        assert_eq!(weights.get("dice"), Some(&0.25));
        assert_eq!(weights.get("mae"), Some(&4.0));
    }
}
