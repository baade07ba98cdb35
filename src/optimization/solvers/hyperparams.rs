//! solvers::hyperparams — optimizer hyperparameters as an opaque map.
//!
//! The restorer forwards [`Hyperparams`] unmodified to
//! [`Optimizer::bind`](crate::optimization::restore_optimizer::traits::Optimizer::bind);
//! only the optimizer decides which keys it understands. Typed accessors
//! report malformed values as [`OptError::InvalidHyperparameter`], and
//! [`Hyperparams::ensure_known`] rejects keys an optimizer does not accept.
use std::collections::BTreeMap;

use crate::optimization::errors::{OptError, OptResult};

/// A single hyperparameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum HyperValue {
    Float(f64),
    Int(u64),
    Text(String),
}

impl std::fmt::Display for HyperValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HyperValue::Float(v) => write!(f, "{v}"),
            HyperValue::Int(v) => write!(f, "{v}"),
            HyperValue::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<f64> for HyperValue {
    fn from(value: f64) -> Self {
        HyperValue::Float(value)
    }
}

impl From<u64> for HyperValue {
    fn from(value: u64) -> Self {
        HyperValue::Int(value)
    }
}

impl From<usize> for HyperValue {
    fn from(value: usize) -> Self {
        HyperValue::Int(value as u64)
    }
}

impl From<&str> for HyperValue {
    fn from(value: &str) -> Self {
        HyperValue::Text(value.to_string())
    }
}

impl From<String> for HyperValue {
    fn from(value: String) -> Self {
        HyperValue::Text(value)
    }
}

/// Ordered `name -> value` map of optimizer hyperparameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hyperparams(BTreeMap<String, HyperValue>);

impl Hyperparams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; a repeated key keeps the last value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<HyperValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&HyperValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HyperValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Reject any key not listed in `allowed`.
    ///
    /// # Errors
    /// [`OptError::UnknownHyperparameter`] naming the first unknown key.
    pub fn ensure_known(&self, optimizer: &'static str, allowed: &[&str]) -> OptResult<()> {
        match self.0.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(name) => Err(OptError::UnknownHyperparameter { optimizer, name: name.clone() }),
            None => Ok(()),
        }
    }

    /// Numeric value of `name`; integers are widened to `f64`.
    pub fn get_f64(&self, name: &str) -> OptResult<Option<f64>> {
        match self.get(name) {
            None => Ok(None),
            Some(HyperValue::Float(v)) => Ok(Some(*v)),
            Some(HyperValue::Int(v)) => Ok(Some(*v as f64)),
            Some(other) => Err(invalid(name, other, "Expected a number.")),
        }
    }

    /// Non-negative integer value of `name`; integral floats are accepted.
    pub fn get_usize(&self, name: &str) -> OptResult<Option<usize>> {
        match self.get(name) {
            None => Ok(None),
            Some(HyperValue::Int(v)) => Ok(Some(*v as usize)),
            Some(HyperValue::Float(v)) if v.is_finite() && *v >= 0.0 && v.fract() == 0.0 => {
                Ok(Some(*v as usize))
            }
            Some(other) => Err(invalid(name, other, "Expected a non-negative integer.")),
        }
    }

    pub fn get_str(&self, name: &str) -> OptResult<Option<&str>> {
        match self.get(name) {
            None => Ok(None),
            Some(HyperValue::Text(v)) => Ok(Some(v.as_str())),
            Some(other) => Err(invalid(name, other, "Expected a string.")),
        }
    }
}

fn invalid(name: &str, value: &HyperValue, reason: &'static str) -> OptError {
    OptError::InvalidHyperparameter { name: name.to_string(), value: value.to_string(), reason }
}
