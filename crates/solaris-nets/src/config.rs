//! Loss section of a training configuration.

use std::{fs, path::Path};

use burn::{config::Config, tensor::backend::Backend};
use serde_json::Value;

use crate::{
    error::{LossError, LossResult},
    resolved::{get_loss, ResolvedLoss},
    Framework,
};

/// Which losses to train with and how to weigh them.
///
/// ```yaml
/// framework: torch
/// loss:
///   dice:
///   focal:
///     gamma: 2
/// loss_weights:
///   dice: 0.5
///   focal: 0.5
/// ```
#[derive(Config, Debug)]
pub struct LossConfig {
    /// Calling convention of the resolved loss.
    pub framework: Framework,
    /// Loss name to hyperparameters (or `null`).
    pub loss: Value,
    /// Loss name to weight. Every loss weighs 1 when absent.
    #[config(default = "None")]
    pub loss_weights: Option<Value>,
}

impl LossConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`LossError::ConfigParse`] if the document is not a valid loss
    /// configuration.
    pub fn from_json_str(text: &str) -> LossResult<Self> {
        serde_json::from_str(text).map_err(|err| LossError::ConfigParse {
            reason: err.to_string(),
        })
    }

    /// Parses a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`LossError::ConfigParse`] if the document is not a valid loss
    /// configuration.
    pub fn from_yaml_str(text: &str) -> LossResult<Self> {
        serde_yaml::from_str(text).map_err(|err| LossError::ConfigParse {
            reason: err.to_string(),
        })
    }

    /// Reads a configuration file. `.yml` and `.yaml` files are parsed as
    /// YAML, everything else as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`LossError::ConfigRead`] if the file cannot be read and
    /// [`LossError::ConfigParse`] if it cannot be parsed.
    pub fn from_file(path: impl AsRef<Path>) -> LossResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LossError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"));

        tracing::debug!(path = %path.display(), yaml = is_yaml, "loading loss configuration");

        if is_yaml {
            Self::from_yaml_str(&text)
        } else {
            Self::from_json_str(&text)
        }
    }

    /// Resolves the configured loss with the built-in registries.
    ///
    /// # Errors
    ///
    /// See [`get_loss`].
    pub fn resolve<B: Backend>(&self) -> LossResult<ResolvedLoss<B>> {
        get_loss(self.framework, &self.loss, self.loss_weights.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::tests::TestBackend;

    #[test]
    fn yaml_config_with_weights() {
        let config = LossConfig::from_yaml_str(
            "framework: PyTorch\nloss:\n  dice:\n  focal:\n    gamma: 2\nloss_weights:\n  dice: 0.5\n  focal: 0.5\n",
        )
        .unwrap();

        assert_eq!(config.framework, Framework::Module);
        assert_eq!(config.loss, json!({ "dice": null, "focal": { "gamma": 2 } }));
        assert_eq!(
            config.loss_weights,
            Some(json!({ "dice": 0.5, "focal": 0.5 }))
        );
    }

    #[test]
    fn json_config_without_weights() {
        let config =
            LossConfig::from_json_str(r#"{ "framework": "keras", "loss": { "bce": null } }"#)
                .unwrap();

        assert_eq!(config.framework, Framework::Functional);
        assert!(config.loss_weights.is_none());

        let resolved = config.resolve::<TestBackend>().unwrap();
        assert_eq!(resolved.framework(), Framework::Functional);
    }

    #[test]
    fn unknown_framework_fails_to_parse() {
        let err =
            LossConfig::from_json_str(r#"{ "framework": "caffe", "loss": { "bce": null } }"#)
                .unwrap_err();

        assert!(matches!(err, LossError::ConfigParse { ref reason } if reason.contains("caffe")));
    }

    #[test]
    fn builder_matches_parsed_config() {
        let built = LossConfig::new(Framework::Module, json!({ "mse": null }))
            .with_loss_weights(Some(json!({ "mse": 2.0 })));
        let parsed = LossConfig::from_json_str(
            r#"{ "framework": "torch", "loss": { "mse": null }, "loss_weights": { "mse": 2.0 } }"#,
        )
        .unwrap();

        assert_eq!(built.framework, parsed.framework);
        assert_eq!(built.loss, parsed.loss);
        assert_eq!(built.loss_weights, parsed.loss_weights);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let path = std::env::temp_dir().join("solaris-nets-missing-loss-config.yml");

        let err = LossConfig::from_file(&path).unwrap_err();

        assert!(matches!(err, LossError::ConfigRead { path: ref p, .. } if p == &path));
    }

    #[test]
    fn file_format_follows_extension() {
        let dir = std::env::temp_dir();
        let yaml_path = dir.join(format!("solaris-nets-loss-{}.yaml", std::process::id()));
        let json_path = dir.join(format!("solaris-nets-loss-{}.json", std::process::id()));

        fs::write(&yaml_path, "framework: torch\nloss:\n  jaccard:\n    eps: 0.001\n").unwrap();
        fs::write(&json_path, r#"{"framework":"keras","loss":{"jaccard":null}}"#).unwrap();

        let yaml = LossConfig::from_file(&yaml_path);
        let json = LossConfig::from_file(&json_path);
        fs::remove_file(&yaml_path).ok();
        fs::remove_file(&json_path).ok();

        assert_eq!(yaml.unwrap().framework, Framework::Module);
        assert_eq!(json.unwrap().framework, Framework::Functional);
    }
}
