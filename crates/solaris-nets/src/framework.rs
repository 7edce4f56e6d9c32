//! Target calling conventions for resolved losses.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::LossError;

/// The calling convention a resolved loss must follow.
///
/// Identifiers are matched case-insensitively, so training configurations
/// written for Keras (`"keras"`) or PyTorch (`"torch"`, `"pytorch"`) select
/// the matching convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Framework {
    /// Stateless closures called as `(y_true, y_pred)`, returning one value per
    /// sample. Accepts `keras` and `functional`.
    #[serde(rename = "keras")]
    Functional,
    /// Loss objects called as `forward(outputs, targets)`, returning the batch
    /// mean. Accepts `torch`, `pytorch` and `module`.
    #[serde(rename = "torch")]
    Module,
}

impl Framework {
    /// Canonical identifier used in configuration files.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Functional => "keras",
            Self::Module => "torch",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = LossError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keras" | "functional" => Ok(Self::Functional),
            "torch" | "pytorch" | "module" => Ok(Self::Module),
            _ => Err(LossError::UnknownFramework { name: s.to_owned() }),
        }
    }
}

impl TryFrom<String> for Framework {
    type Error = LossError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
