//! Parsed loss and weight descriptions.
//!
//! Training configurations describe losses as a mapping from loss name to a
//! (possibly empty) mapping of hyperparameters, and optionally weights as a
//! mapping from the same names to numbers:
//!
//! ```yaml
//! loss:
//!   dice: {}
//!   focal:
//!     gamma: 2
//! loss_weights:
//!   dice: 0.5
//!   focal: 0.5
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::error::{LossError, LossResult};

/// Hyperparameters for a single loss.
///
/// Constructors consume the keys they understand with the `take_*` methods
/// and call [`finish`](Self::finish), which rejects anything left over.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hyperparameters {
    loss: String,
    values: Map<String, Value>,
}

impl Hyperparameters {
    /// Wrap the hyperparameter mapping for `loss`.
    pub fn new(loss: impl Into<String>, values: Map<String, Value>) -> Self {
        Self {
            loss: loss.into(),
            values,
        }
    }

    /// No hyperparameters: every constructor falls back to its defaults.
    pub fn empty(loss: impl Into<String>) -> Self {
        Self::new(loss, Map::new())
    }

    /// Parse a hyperparameter value; `null` means "none given".
    pub fn from_value(loss: &str, value: &Value) -> LossResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Object(values) => Ok(Some(Self::new(loss, values.clone()))),
            other => Err(LossError::invalid_spec(format!(
                "hyperparameters for loss `{loss}` must be a mapping, got {}",
                describe(other)
            ))),
        }
    }

    /// The loss these hyperparameters belong to.
    pub fn loss(&self) -> &str {
        &self.loss
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names of the hyperparameters not yet consumed.
    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// Remove a numeric hyperparameter. Integers are accepted.
    pub fn take_f64(&mut self, key: &str) -> LossResult<Option<f64>> {
        match self.values.remove(key) {
            None => Ok(None),
            Some(Value::Number(number)) => number
                .as_f64()
                .filter(|value| value.is_finite())
                .map(Some)
                .ok_or_else(|| self.invalid(key, "expected a finite number")),
            Some(other) => Err(self.invalid(
                key,
                &format!("expected a number, got {}", describe(&other)),
            )),
        }
    }

    /// Remove a numeric hyperparameter that must satisfy `check`.
    pub fn take_f64_checked(
        &mut self,
        key: &str,
        check: impl Fn(f64) -> bool,
        expectation: &str,
    ) -> LossResult<Option<f64>> {
        match self.take_f64(key)? {
            Some(value) if !check(value) => {
                Err(self.invalid(key, &format!("expected {expectation}, got {value}")))
            }
            value => Ok(value),
        }
    }

    /// Remove a boolean hyperparameter.
    pub fn take_bool(&mut self, key: &str) -> LossResult<Option<bool>> {
        match self.values.remove(key) {
            None => Ok(None),
            Some(Value::Bool(flag)) => Ok(Some(flag)),
            Some(other) => Err(self.invalid(
                key,
                &format!("expected a boolean, got {}", describe(&other)),
            )),
        }
    }

    /// Fail if any hyperparameter was not consumed.
    pub fn finish(self) -> LossResult<()> {
        if self.values.is_empty() {
            return Ok(());
        }
        Err(LossError::UnexpectedHyperparameters {
            parameters: self.keys(),
            loss: self.loss,
        })
    }

    fn invalid(&self, key: &str, reason: &str) -> LossError {
        LossError::InvalidHyperparameter {
            loss: self.loss.clone(),
            parameter: key.to_owned(),
            reason: reason.to_owned(),
        }
    }
}

/// A validated loss description: at least one named loss, each with optional
/// hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LossSpec {
    entries: BTreeMap<String, Option<Hyperparameters>>,
}

impl LossSpec {
    /// Validate a loss description taken from a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`LossError::InvalidSpec`] if the description is not a
    /// mapping, is empty, or holds hyperparameters that are not mappings.
    pub fn from_value(value: &Value) -> LossResult<Self> {
        let Value::Object(map) = value else {
            return Err(LossError::invalid_spec(format!(
                "expected a mapping of loss names to hyperparameters, got {}",
                describe(value)
            )));
        };

        let entries = map
            .iter()
            .map(|(name, params)| Ok((name.clone(), Hyperparameters::from_value(name, params)?)))
            .collect::<LossResult<BTreeMap<_, _>>>()?;

        Self::from_entries(entries)
    }

    /// Build a description from already-parsed entries.
    pub fn from_entries(entries: BTreeMap<String, Option<Hyperparameters>>) -> LossResult<Self> {
        if entries.is_empty() {
            return Err(LossError::invalid_spec("at least one loss must be given"));
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loss names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// The only entry, if exactly one loss is described.
    pub fn single(&self) -> Option<(&str, Option<&Hyperparameters>)> {
        if self.entries.len() != 1 {
            return None;
        }
        self.entries
            .iter()
            .next()
            .map(|(name, params)| (name.as_str(), params.as_ref()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Hyperparameters>)> {
        self.entries
            .iter()
            .map(|(name, params)| (name.as_str(), params.as_ref()))
    }
}

/// Per-loss weights of a composite.
#[derive(Debug, Clone, PartialEq)]
pub struct LossWeights {
    weights: BTreeMap<String, f64>,
}

impl LossWeights {
    /// Validate a weight description taken from a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`LossError::InvalidSpec`] unless the description maps names
    /// to finite numbers.
    pub fn from_value(value: &Value) -> LossResult<Self> {
        let Value::Object(map) = value else {
            return Err(LossError::invalid_spec(format!(
                "loss weights must be a mapping of loss names to numbers, got {}",
                describe(value)
            )));
        };

        let weights = map
            .iter()
            .map(|(name, weight)| {
                weight
                    .as_f64()
                    .filter(|weight| weight.is_finite())
                    .map(|weight| (name.clone(), weight))
                    .ok_or_else(|| {
                        LossError::invalid_spec(format!(
                            "weight for loss `{name}` must be a finite number, got {}",
                            describe(weight)
                        ))
                    })
            })
            .collect::<LossResult<BTreeMap<_, _>>>()?;

        Ok(Self { weights })
    }

    /// Weight 1 for every loss in `spec`.
    pub fn uniform(spec: &LossSpec) -> Self {
        Self {
            weights: spec.names().into_iter().map(|name| (name, 1.0)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.weights.get(name).copied()
    }

    /// Check that the weights name exactly the losses in `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`LossError::WeightKeyMismatch`] when the name sets differ.
    pub fn ensure_matches(&self, spec: &LossSpec) -> LossResult<()> {
        let losses: BTreeSet<&str> = spec.iter().map(|(name, _)| name).collect();
        let weights: BTreeSet<&str> = self.weights.keys().map(String::as_str).collect();

        if losses == weights {
            return Ok(());
        }
        Err(LossError::WeightKeyMismatch {
            losses: losses.into_iter().map(str::to_owned).collect(),
            weights: weights.into_iter().map(str::to_owned).collect(),
        })
    }
}

impl LossWeights {
    /// Pair every loss in `spec` with its weight.
    ///
    /// # Errors
    ///
    /// Returns [`LossError::WeightKeyMismatch`] when the name sets differ.
    pub fn pair_with<'a>(
        &self,
        spec: &'a LossSpec,
    ) -> LossResult<Vec<(&'a str, Option<&'a Hyperparameters>, f64)>> {
        self.ensure_matches(spec)?;
        Ok(spec
            .iter()
            .filter_map(|(name, params)| self.get(name).map(|weight| (name, params, weight)))
            .collect())
    }
}

impl FromIterator<(String, f64)> for LossWeights {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            weights: iter.into_iter().collect(),
        }
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
