//! Tuning values and extra backend options.
//!
//! `OptionFilter` narrows a caller's option bag to a backend allow-list.
//! `OptionsBuilder` layers inferred defaults, caller options and tuning
//! overrides in a fixed order (lowest precedence first):
//!
//! 1. inferred defaults registered with [`OptionsBuilder::infer`];
//! 2. caller options that pass the allow-list;
//! 3. caller options named like a tuning key, which replace the tuning value
//!    and leave the pass-through bag.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Method;
use crate::error::TrainError;

/// Tuning values for one training call, keyed by parameter name.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct TuneValue(BTreeMap<String, f64>);

impl TuneValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn require(&self, method: Method, name: &str) -> Result<f64, TrainError> {
        self.get(name).ok_or_else(|| TrainError::MissingTuningValue {
            method,
            name: name.to_string(),
        })
    }

    /// Like [`TuneValue::require`] but the value must be a whole, non-negative number.
    pub fn require_count(&self, method: Method, name: &str) -> Result<usize, TrainError> {
        let value = self.require(method, name)?;
        as_count(value).ok_or_else(|| TrainError::InvalidTuningValue {
            name: name.to_string(),
            value,
            reason: "expected a non-negative whole number",
        })
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for TuneValue {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        TuneValue(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

fn as_count(value: f64) -> Option<usize> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        Some(value as usize)
    } else {
        None
    }
}

/// A single backend option value.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum OptionValue {
    Flag(bool),
    Number(f64),
    Text(String),
    Numbers(Vec<f64>),
    Texts(Vec<String>),
}

impl OptionValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        self.as_f64().and_then(as_count)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Flag(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Flag(v)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Number(v)
    }
}

impl From<usize> for OptionValue {
    fn from(v: usize) -> Self {
        OptionValue::Number(v as f64)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Text(v.to_string())
    }
}

impl From<Vec<f64>> for OptionValue {
    fn from(v: Vec<f64>) -> Self {
        OptionValue::Numbers(v)
    }
}

/// Backend-specific options, keyed by option name.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct ExtraOptions(BTreeMap<String, OptionValue>);

impl ExtraOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<V: Into<OptionValue>>(mut self, key: &str, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert<V: Into<OptionValue>>(&mut self, key: &str, value: V) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(OptionValue::as_f64)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(OptionValue::as_usize)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(OptionValue::as_bool)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(OptionValue::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Options holding one value per training row.
pub const PER_ROW_OPTIONS: &[&str] = &["weights", "offset"];

impl ExtraOptions {
    /// Projects per-row options onto the kept `rows` of an `n_rows` table.
    ///
    /// A per-row option must be a numeric vector of length `n_rows`; anything
    /// else fails with `InvalidOption`.
    pub fn select_rows(&self, n_rows: usize, rows: &[usize]) -> Result<ExtraOptions, TrainError> {
        let mut selected = self.clone();
        for &key in PER_ROW_OPTIONS {
            match selected.0.get_mut(key) {
                None => {}
                Some(OptionValue::Numbers(values)) if values.len() == n_rows => {
                    let kept = rows.iter().map(|&r| values[r]).collect();
                    *values = kept;
                }
                Some(OptionValue::Numbers(values)) => {
                    return Err(TrainError::InvalidOption {
                        key: key.to_string(),
                        reason: format!(
                            "expected one value per row ({}), got {}",
                            n_rows,
                            values.len()
                        ),
                    })
                }
                Some(other) => {
                    return Err(TrainError::InvalidOption {
                        key: key.to_string(),
                        reason: format!("expected a numeric vector with one value per row, got {:?}", other),
                    })
                }
            }
        }
        Ok(selected)
    }
}

impl<K: Into<String>> FromIterator<(K, OptionValue)> for ExtraOptions {
    fn from_iter<I: IntoIterator<Item = (K, OptionValue)>>(iter: I) -> Self {
        ExtraOptions(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Keeps only the option names a backend recognizes.
#[derive(Debug, Clone, Copy)]
pub struct OptionFilter {
    allowed: &'static [&'static str],
}

impl OptionFilter {
    pub const NONE: OptionFilter = OptionFilter { allowed: &[] };

    pub const fn new(allowed: &'static [&'static str]) -> Self {
        Self { allowed }
    }

    pub fn allows(&self, key: &str) -> bool {
        self.allowed.contains(&key)
    }

    /// Unknown keys are dropped without error.
    pub fn apply(&self, options: &ExtraOptions) -> ExtraOptions {
        let mut kept = ExtraOptions::new();
        for (key, value) in options.iter() {
            if self.allows(key) {
                kept.0.insert(key.to_string(), value.clone());
            } else {
                log::debug!("Dropping unrecognized backend option '{}'", key);
            }
        }
        kept
    }
}

/// Resolves the option bag handed to a backend. See the module docs for the
/// precedence order.
#[derive(Debug, Clone)]
pub struct OptionsBuilder {
    filter: OptionFilter,
    inferred: Vec<(&'static str, OptionValue)>,
    tuning_keys: &'static [&'static str],
}

impl OptionsBuilder {
    pub fn new(filter: OptionFilter) -> Self {
        Self {
            filter,
            inferred: Vec::new(),
            tuning_keys: &[],
        }
    }

    /// Registers a default that applies only when the caller did not set `key`.
    pub fn infer<V: Into<OptionValue>>(mut self, key: &'static str, value: V) -> Self {
        self.inferred.push((key, value.into()));
        self
    }

    /// Option names that, when supplied by the caller, override tuning values.
    pub fn tuning_overrides(mut self, keys: &'static [&'static str]) -> Self {
        self.tuning_keys = keys;
        self
    }

    pub fn build(
        self,
        caller: Option<&ExtraOptions>,
        tune: &mut TuneValue,
    ) -> Result<ExtraOptions, TrainError> {
        let mut resolved: ExtraOptions = self.inferred.into_iter().collect();

        if let Some(caller) = caller {
            for (key, value) in self.filter.apply(caller).0 {
                resolved.0.insert(key, value);
            }
        }

        for &key in self.tuning_keys {
            let Some(value) = resolved.remove(key) else {
                continue;
            };
            let number = value.as_f64().ok_or_else(|| TrainError::InvalidOption {
                key: key.to_string(),
                reason: format!("expected a number to override the tuning value, got {:?}", value),
            })?;
            if let Some(previous) = tune.get(key) {
                if previous != number {
                    log::debug!("Option '{}' overrides tuning value {} with {}", key, previous, number);
                }
            }
            tune.set(key, number);
        }

        Ok(resolved)
    }
}
