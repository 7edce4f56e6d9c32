//! Framework-dispatching entry points.

use burn::tensor::backend::Backend;
use serde_json::Value;

use crate::{
    error::LossResult,
    functional::{FunctionalLoss, FunctionalProvider},
    module::{ModuleLoss, ModuleProvider},
    provider::{resolve, LossProvider},
    spec::Hyperparameters,
    Framework,
};

/// A loss resolved for one of the supported calling conventions.
#[derive(Debug)]
pub enum ResolvedLoss<B: Backend> {
    /// Called as `(y_true, y_pred)`, one value per sample.
    Functional(FunctionalLoss<B>),
    /// Called as `forward(outputs, targets)`, batch mean.
    Module(Box<dyn ModuleLoss<B>>),
}

impl<B: Backend> ResolvedLoss<B> {
    pub const fn framework(&self) -> Framework {
        match self {
            Self::Functional(_) => Framework::Functional,
            Self::Module(_) => Framework::Module,
        }
    }

    pub const fn as_functional(&self) -> Option<&FunctionalLoss<B>> {
        match self {
            Self::Functional(loss) => Some(loss),
            Self::Module(_) => None,
        }
    }

    pub fn as_module(&self) -> Option<&dyn ModuleLoss<B>> {
        match self {
            Self::Functional(_) => None,
            Self::Module(loss) => Some(loss.as_ref()),
        }
    }

    pub fn into_functional(self) -> Option<FunctionalLoss<B>> {
        match self {
            Self::Functional(loss) => Some(loss),
            Self::Module(_) => None,
        }
    }

    pub fn into_module(self) -> Option<Box<dyn ModuleLoss<B>>> {
        match self {
            Self::Functional(_) => None,
            Self::Module(loss) => Some(loss),
        }
    }
}

/// Resolve `loss` (a mapping of loss name to hyperparameters) with the
/// built-in registry of `framework`.
///
/// # Errors
///
/// See [`resolve`](crate::provider::resolve).
pub fn get_loss<B: Backend>(
    framework: Framework,
    loss: &Value,
    loss_weights: Option<&Value>,
) -> LossResult<ResolvedLoss<B>> {
    match framework {
        Framework::Functional => resolve(&FunctionalProvider::<B>::default(), loss, loss_weights)
            .map(ResolvedLoss::Functional),
        Framework::Module => resolve(&ModuleProvider::<B>::default(), loss, loss_weights)
            .map(ResolvedLoss::Module),
    }
}

/// Resolve one named loss with the built-in registry of `framework`.
///
/// `params` may be `null`, an object of hyperparameters, or absent.
///
/// # Errors
///
/// Returns [`LossError::UnknownLoss`](crate::LossError::UnknownLoss) for an
/// unregistered name, [`LossError::InvalidSpec`](crate::LossError::InvalidSpec)
/// if `params` is neither `null` nor an object, and hyperparameter errors
/// raised while constructing the loss.
pub fn get_single_loss<B: Backend>(
    framework: Framework,
    name: &str,
    params: Option<&Value>,
) -> LossResult<ResolvedLoss<B>> {
    let params = match params {
        Some(value) => Hyperparameters::from_value(name, value)?,
        None => None,
    };

    match framework {
        Framework::Functional => FunctionalProvider::<B>::default()
            .resolve_single(name, params.as_ref())
            .map(ResolvedLoss::Functional),
        Framework::Module => ModuleProvider::<B>::default()
            .resolve_single(name, params.as_ref())
            .map(ResolvedLoss::Module),
    }
}
