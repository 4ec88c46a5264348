//! Metric observation data models

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::template::strip_trailing_zeros;

/// Type of value accepted or produced by a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Numeric value
    Float,
    /// Boolean value
    Boolean,
    /// Free text value
    String,
    /// Any value
    Any,
}

impl ValueType {
    /// Whether a component accepting `self` can consume values of type `produced`
    pub fn accepts(self, produced: ValueType) -> bool {
        self == ValueType::Any || self == produced
    }
}

/// Value carried by a metric or produced by an aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ValueRepr", into = "ValueRepr")]
pub enum Value {
    /// Numeric value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// Free text value
    String(String),
    /// A computation could not produce a value
    Exception(String),
    /// Value produced by a previous aggregation
    Aggregated(Box<Value>),
}

impl Value {
    /// Numeric form of a raw float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean form of a raw boolean value
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Text form of a raw string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Inner value when this value comes from an aggregation
    pub fn as_aggregated(&self) -> Option<&Value> {
        match self {
            Value::Aggregated(inner) => Some(inner),
            _ => None,
        }
    }

    /// Numeric form, looking through one level of aggregation
    pub fn as_numeric(&self) -> Option<f64> {
        match self.as_aggregated() {
            Some(inner) => inner.as_float(),
            None => self.as_float(),
        }
    }

    /// Whether this value signals a failed computation
    pub fn is_exception(&self) -> bool {
        match self {
            Value::Exception(_) => true,
            Value::Aggregated(inner) => inner.is_exception(),
            _ => false,
        }
    }

    /// Type of this value, aggregated values report their inner type
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Float(_) => ValueType::Float,
            Value::Boolean(_) => ValueType::Boolean,
            Value::String(_) => ValueType::String,
            Value::Exception(_) => ValueType::Any,
            Value::Aggregated(inner) => inner.value_type(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => f.write_str(&strip_trailing_zeros(&v.to_string())),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
            Value::Exception(msg) => write!(f, "exception ({msg})"),
            Value::Aggregated(inner) => inner.fmt(f),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

/// Wire form of [`Value`]: plain JSON scalars, objects for the rest
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ValueRepr {
    Float(f64),
    Boolean(bool),
    String(String),
    Exception { exception: String },
    Aggregated { aggregated: Box<Value> },
}

impl From<ValueRepr> for Value {
    fn from(repr: ValueRepr) -> Self {
        match repr {
            ValueRepr::Float(v) => Value::Float(v),
            ValueRepr::Boolean(v) => Value::Boolean(v),
            ValueRepr::String(v) => Value::String(v),
            ValueRepr::Exception { exception } => Value::Exception(exception),
            ValueRepr::Aggregated { aggregated } => Value::Aggregated(aggregated),
        }
    }
}

impl From<Value> for ValueRepr {
    fn from(value: Value) -> Self {
        match value {
            Value::Float(v) => ValueRepr::Float(v),
            Value::Boolean(v) => ValueRepr::Boolean(v),
            Value::String(v) => ValueRepr::String(v),
            Value::Exception(exception) => ValueRepr::Exception { exception },
            Value::Aggregated(aggregated) => ValueRepr::Aggregated { aggregated },
        }
    }
}

/// A value with the instant it was observed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedValue {
    /// When the value was observed
    pub timestamp: DateTime<Utc>,
    /// The observed value
    pub value: Value,
}

impl DatedValue {
    /// Create a new dated value
    pub fn new(timestamp: DateTime<Utc>, value: impl Into<Value>) -> Self {
        Self {
            timestamp,
            value: value.into(),
        }
    }
}

/// A single metric observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// When the metric was observed
    pub timestamp: DateTime<Utc>,

    /// Observed value
    pub value: Value,

    /// Identifying attributes (host, cluster, metric name...)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Metric {
    /// Create a metric without attributes
    pub fn new(timestamp: DateTime<Utc>, value: impl Into<Value>) -> Self {
        Self {
            timestamp,
            value: value.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Dated form of the observed value
    pub fn dated_value(&self) -> DatedValue {
        DatedValue {
            timestamp: self.timestamp,
            value: self.value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_from_json_line() {
        let line = r#"{"timestamp":"2024-01-01T10:00:00Z","value":12.5,"attributes":{"host":"db01"}}"#;
        let metric: Metric = serde_json::from_str(line).unwrap();

        assert_eq!(metric.value, Value::Float(12.5));
        assert_eq!(metric.attributes.get("host").map(String::as_str), Some("db01"));
    }

    #[test]
    fn test_value_wire_forms() {
        let values = vec![
            Value::Float(1.5),
            Value::Boolean(true),
            Value::from("up"),
            Value::Exception("no values".to_string()),
            Value::Aggregated(Box::new(Value::Float(3.0))),
        ];

        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(
            json,
            r#"[1.5,true,"up",{"exception":"no values"},{"aggregated":3.0}]"#
        );

        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn test_numeric_looks_through_aggregation() {
        let aggregated = Value::Aggregated(Box::new(Value::Float(4.0)));
        assert_eq!(aggregated.as_float(), None);
        assert_eq!(aggregated.as_numeric(), Some(4.0));
        assert_eq!(aggregated.value_type(), ValueType::Float);
        assert_eq!(Value::from("x").as_numeric(), None);
    }

    #[test]
    fn test_value_type_compatibility() {
        assert!(ValueType::Any.accepts(ValueType::Float));
        assert!(ValueType::Float.accepts(ValueType::Float));
        assert!(!ValueType::Float.accepts(ValueType::Any));
        assert!(!ValueType::Float.accepts(ValueType::Boolean));
    }

    #[test]
    fn test_display_strips_trailing_zeros() {
        assert_eq!(Value::Float(12.0).to_string(), "12");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
    }
}
