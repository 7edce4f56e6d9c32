//! # Solaris Nets
//!
//! Resolves the loss section of a training configuration into a ready-to-call
//! loss for the selected calling convention.
//!
//! A loss description maps loss names to their hyperparameters:
//!
//! ```yaml
//! loss:
//!   dice:
//!   focal:
//!     gamma: 2
//! loss_weights:
//!   dice: 0.5
//!   focal: 0.5
//! ```
//!
//! One name resolves to that loss alone. Several names resolve to a weighted
//! composite whose value is the sum of `weight * loss` over its members.
//!
//! Two conventions are supported, chosen by [`Framework`]:
//!
//! - [`Framework::Functional`]: stateless [`FunctionalLoss`] closures called
//!   as `(y_true, y_pred)`.
//! - [`Framework::Module`]: [`ModuleLoss`] objects called as
//!   `forward(outputs, targets)`, whose composites also report the value of
//!   each member through [`ModuleLoss::forward_components`].
//!
//! Names are looked up case-insensitively in a [`LossRegistry`]. Custom
//! losses are registered on a provider's registry before resolution.

pub mod config;
pub mod error;
pub mod framework;
pub mod functional;
pub mod module;
pub mod provider;
pub mod registry;
pub mod resolved;
pub mod spec;

pub use config::LossConfig;
pub use error::{LossError, LossResult};
pub use framework::Framework;
pub use functional::{
    FunctionalEntry, FunctionalFactory, FunctionalLoss, FunctionalProvider, FunctionalRegistry,
};
pub use module::{
    constructor, CompositeLoss, LossOutput, ModuleConstructor, ModuleLoss, ModuleProvider,
    ModuleRegistry,
};
pub use provider::{resolve, resolve_spec, LossProvider, WeightedLoss};
pub use registry::LossRegistry;
pub use resolved::{get_loss, get_single_loss, ResolvedLoss};
pub use spec::{Hyperparameters, LossSpec, LossWeights};

#[cfg(test)]
mod tests {
    pub type TestBackend = burn::backend::NdArray;
}
