//! Resolution of loss descriptions through a framework-specific provider.

use serde_json::Value;

use crate::{
    error::LossResult,
    spec::{Hyperparameters, LossSpec, LossWeights},
    Framework,
};

/// One member of a composite loss.
#[derive(Debug, Clone)]
pub struct WeightedLoss<L> {
    /// The name the loss was configured under.
    pub name: String,
    pub weight: f64,
    pub loss: L,
}

/// A framework target: its registry of named losses and the way it combines
/// several of them into one.
pub trait LossProvider {
    /// What this provider resolves to.
    type Loss;

    /// The calling convention of [`Self::Loss`].
    fn framework(&self) -> Framework;

    /// Look up `name` (case-insensitively) and build it from `params`.
    ///
    /// # Errors
    ///
    /// Returns [`LossError::UnknownLoss`](crate::LossError::UnknownLoss) if nothing is registered under
    /// `name`, or a hyperparameter error if construction fails.
    fn resolve_single(&self, name: &str, params: Option<&Hyperparameters>)
        -> LossResult<Self::Loss>;

    /// Combine resolved losses into their weighted sum.
    fn composite(&self, components: Vec<WeightedLoss<Self::Loss>>) -> Self::Loss;
}

/// Resolve a loss description taken straight from a configuration document.
///
/// A single loss is returned as resolved by the provider; several losses are
/// combined into a weighted composite. `loss_weights` defaults to weight 1
/// for every loss. When only one loss is described it is neither read nor
/// validated.
///
/// # Errors
///
/// Returns [`LossError::InvalidSpec`](crate::LossError::InvalidSpec) if `loss` is not a non-empty mapping
/// or `loss_weights` is not a mapping of numbers,
/// [`LossError::WeightKeyMismatch`](crate::LossError::WeightKeyMismatch) if the weights name different losses, and
/// whatever [`LossProvider::resolve_single`] returns for each loss.
pub fn resolve<P: LossProvider>(
    provider: &P,
    loss: &Value,
    loss_weights: Option<&Value>,
) -> LossResult<P::Loss> {
    let spec = LossSpec::from_value(loss)?;
    if spec.single().is_some() {
        return resolve_spec(provider, &spec, None);
    }

    let weights = loss_weights.map(LossWeights::from_value).transpose()?;
    resolve_spec(provider, &spec, weights)
}

/// Resolve an already validated loss description.
///
/// # Errors
///
/// See [`resolve`].
pub fn resolve_spec<P: LossProvider>(
    provider: &P,
    spec: &LossSpec,
    weights: Option<LossWeights>,
) -> LossResult<P::Loss> {
    if let Some((name, params)) = spec.single() {
        tracing::debug!(framework = %provider.framework(), loss = name, "resolving single loss");
        return provider.resolve_single(name, params);
    }

    let weights = weights.unwrap_or_else(|| LossWeights::uniform(spec));

    tracing::debug!(
        framework = %provider.framework(),
        losses = ?spec.names(),
        "resolving composite loss",
    );

    let components = weights
        .pair_with(spec)?
        .into_iter()
        .map(|(name, params, weight)| {
            Ok(WeightedLoss {
                name: name.to_owned(),
                weight,
                loss: provider.resolve_single(name, params)?,
            })
        })
        .collect::<LossResult<Vec<_>>>()?;

    Ok(provider.composite(components))
}
