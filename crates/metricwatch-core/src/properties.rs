//! Dotted key/value configuration handed to components
//!
//! Every read marks the key as consumed so that a component can verify, at
//! the end of its `configure`, that the user did not set keys nobody reads
//! (usually a typo).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::Duration;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};

/// Key holding the component type name
pub const TYPE_KEY: &str = "type";

/// Ordered dotted-key configuration with consumption tracking
#[derive(Default)]
pub struct Properties {
    values: BTreeMap<String, String>,
    used: Mutex<BTreeSet<String>>,
}

impl Properties {
    /// Create an empty set of properties
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a nested JSON document into dotted keys
    ///
    /// Arrays are joined with a single space, which is the list syntax
    /// accepted by list-valued keys such as `statuses`.
    pub fn from_json(value: &JsonValue) -> Self {
        let mut props = Self::new();
        flatten_into(&mut props.values, None, value);
        props
    }

    /// Set a property, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`Properties::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no key is set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether a key is set, without consuming it
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterate over all keys in order, without consuming them
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Whether the `type` key is set, without consuming it
    pub fn is_type_defined(&self) -> bool {
        self.values.contains_key(TYPE_KEY)
    }

    /// Raw value of a key, marking it as consumed
    pub fn get_property(&self, key: &str) -> Option<&str> {
        let value = self.values.get(key)?;
        self.used.lock().insert(key.to_string());
        Some(value.as_str())
    }

    /// Value of a key that must be present
    pub fn get_string(&self, key: &str) -> Result<&str> {
        self.get_property(key)
            .ok_or_else(|| Error::configuration(format!("{key} must be specified")))
    }

    /// Value of a key or the provided default
    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_property(key).unwrap_or(default).to_string()
    }

    /// Float value of a key, `None` when unset
    pub fn get_float(&self, key: &str) -> Result<Option<f64>> {
        self.get_property(key)
            .map(|raw| {
                raw.trim().parse::<f64>().map_err(|_| {
                    Error::configuration(format!("{key} must be a number (found \"{raw}\")"))
                })
            })
            .transpose()
    }

    /// Float value of a key or the provided default
    pub fn get_float_or(&self, key: &str, default: f64) -> Result<f64> {
        Ok(self.get_float(key)?.unwrap_or(default))
    }

    /// Boolean value of a key or the provided default
    pub fn get_boolean(&self, key: &str, default: bool) -> Result<bool> {
        match self.get_property(key) {
            None => Ok(default),
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(Error::configuration(format!(
                    "{key} must be true or false (found \"{raw}\")"
                ))),
            },
        }
    }

    /// Duration value of a key or the provided default
    ///
    /// Accepts humantime syntax (`15m`, `1h 30m`) or a bare number of seconds.
    pub fn get_duration(&self, key: &str, default: Duration) -> Result<Duration> {
        match self.get_property(key) {
            None => Ok(default),
            Some(raw) => parse_duration(raw)
                .map_err(|e| Error::configuration(format!("{key}: {e}"))),
        }
    }

    /// Properties under `prefix.`, with the prefix removed from the keys
    ///
    /// The returned set tracks consumption on its own.
    pub fn sub_properties(&self, prefix: &str) -> Properties {
        let dotted = format!("{prefix}.");
        let values = self
            .values
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&dotted)
                    .map(|sub| (sub.to_string(), value.clone()))
            })
            .collect();

        Properties {
            values,
            used: Mutex::new(BTreeSet::new()),
        }
    }

    /// Distinct first segments of the keys under `prefix.`
    pub fn ids(&self, prefix: &str) -> BTreeSet<String> {
        let dotted = format!("{prefix}.");
        self.values
            .keys()
            .filter_map(|key| key.strip_prefix(&dotted))
            .filter_map(|sub| sub.split('.').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Mark every key under `prefix.` as consumed
    pub fn consume_prefix(&self, prefix: &str) {
        let dotted = format!("{prefix}.");
        let mut used = self.used.lock();
        for key in self.values.keys().filter(|k| k.starts_with(&dotted)) {
            used.insert(key.clone());
        }
    }

    /// Keys that were set but never read
    pub fn unused_keys(&self) -> Vec<String> {
        let used = self.used.lock();
        self.values
            .keys()
            .filter(|key| !used.contains(*key))
            .cloned()
            .collect()
    }

    /// Fail when some keys were set but never read
    pub fn confirm_all_properties_used(&self) -> Result<()> {
        let unused = self.unused_keys();
        if unused.is_empty() {
            Ok(())
        } else {
            Err(Error::configuration(format!(
                "some configuration parameters ({}) were not used",
                unused.join(", ")
            )))
        }
    }

    /// One warning per key that was set but never read
    pub fn warnings_if_not_all_properties_used(&self) -> Vec<String> {
        self.unused_keys()
            .into_iter()
            .map(|key| format!("parameter {key} was not used"))
            .collect()
    }
}

impl Clone for Properties {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            used: Mutex::new(self.used.lock().clone()),
        }
    }
}

impl PartialEq for Properties {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.values.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Self::new();
        for (key, value) in iter {
            props.set(key, value);
        }
        props
    }
}

/// Parse a duration written in humantime syntax or as a bare number of seconds
pub fn parse_duration(raw: &str) -> std::result::Result<Duration, String> {
    let raw = raw.trim();

    let std_duration = match raw.parse::<u64>() {
        Ok(seconds) => std::time::Duration::from_secs(seconds),
        Err(_) => humantime::parse_duration(raw)
            .map_err(|e| format!("invalid duration \"{raw}\" ({e})"))?,
    };

    Duration::from_std(std_duration).map_err(|_| format!("duration \"{raw}\" is out of range"))
}

/// Render a duration the way users write it in configuration
pub fn format_duration(duration: Duration) -> String {
    let magnitude = if duration < Duration::zero() {
        -duration
    } else {
        duration
    };
    let std_duration = magnitude.to_std().unwrap_or_default();
    humantime::format_duration(std_duration).to_string()
}

fn flatten_into(out: &mut BTreeMap<String, String>, prefix: Option<&str>, value: &JsonValue) {
    let join = |key: &str| match prefix {
        Some(p) => format!("{p}.{key}"),
        None => key.to_string(),
    };

    match value {
        JsonValue::Object(map) => {
            for (key, nested) in map {
                flatten_into(out, Some(&join(key)), nested);
            }
        }
        JsonValue::Null => {}
        other => {
            let Some(key) = prefix else { return };
            out.insert(key.to_string(), scalar_to_string(other));
        }
    }
}

fn scalar_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => items
            .iter()
            .map(scalar_to_string)
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}
