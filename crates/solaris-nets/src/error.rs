use std::path::PathBuf;

use thiserror::Error;

use crate::Framework;

/// The error type for loss resolution.
///
/// Every variant is raised while a loss is being resolved from configuration;
/// resolved losses do not fail at invocation time.
#[derive(Error, Debug)]
pub enum LossError {
    /// The loss description is not a non-empty mapping of names to
    /// hyperparameters, or the weights are not a mapping of names to numbers.
    #[error("The loss description is formatted improperly: {reason}")]
    InvalidSpec {
        /// Why the description was rejected.
        reason: String,
    },

    /// The weight mapping names a different set of losses than the loss mapping.
    #[error("The losses and weights must have the same name keys (losses: {losses:?}, weights: {weights:?})")]
    WeightKeyMismatch {
        /// Loss names, sorted.
        losses: Vec<String>,
        /// Weight names, sorted.
        weights: Vec<String>,
    },

    /// No loss with this name is registered for the framework.
    #[error("Unknown loss `{name}` for the {framework} framework")]
    UnknownLoss {
        /// The requested loss name, as written in the configuration.
        name: String,
        /// The framework whose registry was searched.
        framework: Framework,
    },

    /// The framework identifier is not recognised.
    #[error("Unsupported framework: {name}")]
    UnknownFramework {
        /// The identifier as written in the configuration.
        name: String,
    },

    /// A hyperparameter has the wrong type or an out-of-range value.
    #[error("Invalid hyperparameter `{parameter}` for loss `{loss}`: {reason}")]
    InvalidHyperparameter {
        /// The loss being constructed.
        loss: String,
        /// The offending hyperparameter.
        parameter: String,
        /// What was expected.
        reason: String,
    },

    /// Hyperparameters were supplied that the loss does not accept.
    #[error("Loss `{loss}` does not accept hyperparameters {parameters:?}")]
    UnexpectedHyperparameters {
        /// The loss being constructed.
        loss: String,
        /// The leftover hyperparameter names, sorted.
        parameters: Vec<String>,
    },

    /// A configuration file could not be read.
    #[error("Failed to read loss configuration: {path}")]
    ConfigRead {
        /// The file that failed to read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration document could not be parsed.
    #[error("Failed to parse loss configuration: {reason}")]
    ConfigParse {
        /// The parser's message.
        reason: String,
    },
}

/// A specialized `Result` type for loss resolution.
pub type LossResult<T> = Result<T, LossError>;

impl LossError {
    pub(crate) fn invalid_spec(reason: impl Into<String>) -> Self {
        Self::InvalidSpec {
            reason: reason.into(),
        }
    }

    /// Whether this error comes from a malformed configuration rather than a
    /// failed name lookup.
    pub const fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::UnknownLoss { .. })
    }
}
