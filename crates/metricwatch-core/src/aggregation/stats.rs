//! Counting and order statistics over the window

use chrono::{DateTime, Utc};

use crate::components::Component;
use crate::error::Result;
use crate::models::{DatedValue, Value, ValueType};
use crate::properties::Properties;

use super::{numeric_values, Aggregation};

/// Implements [`Component`] for option-less aggregations
macro_rules! without_options {
    ($($name:ident),+) => {
        $(
            impl Component for $name {
                fn configure(&mut self, properties: &Properties) -> Result<()> {
                    properties.confirm_all_properties_used()
                }
            }
        )+
    };
}

without_options!(CountAggregation, AvgAggregation, MaxAggregation, MinAggregation, LastAggregation);

/// `count`: number of values in the window
#[derive(Debug, Clone, Copy, Default)]
pub struct CountAggregation;

impl Aggregation for CountAggregation {
    fn input_type(&self) -> ValueType {
        ValueType::Any
    }

    fn return_type(&self) -> ValueType {
        ValueType::Float
    }

    fn aggregate(&self, values: &[DatedValue], _time: DateTime<Utc>) -> Value {
        Value::Float(values.len() as f64)
    }

    fn boxed_clone(&self) -> Box<dyn Aggregation> {
        Box::new(*self)
    }
}

/// `avg`: arithmetic mean
#[derive(Debug, Clone, Copy, Default)]
pub struct AvgAggregation;

impl Aggregation for AvgAggregation {
    fn input_type(&self) -> ValueType {
        ValueType::Float
    }

    fn return_type(&self) -> ValueType {
        ValueType::Float
    }

    fn aggregate(&self, values: &[DatedValue], _time: DateTime<Utc>) -> Value {
        reduce(values, |numbers| numbers.iter().sum::<f64>() / numbers.len() as f64)
    }

    fn boxed_clone(&self) -> Box<dyn Aggregation> {
        Box::new(*self)
    }
}

/// `max`: greatest value
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxAggregation;

impl Aggregation for MaxAggregation {
    fn input_type(&self) -> ValueType {
        ValueType::Float
    }

    fn return_type(&self) -> ValueType {
        ValueType::Float
    }

    fn aggregate(&self, values: &[DatedValue], _time: DateTime<Utc>) -> Value {
        reduce(values, |numbers| numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max))
    }

    fn boxed_clone(&self) -> Box<dyn Aggregation> {
        Box::new(*self)
    }
}

/// `min`: smallest value
#[derive(Debug, Clone, Copy, Default)]
pub struct MinAggregation;

impl Aggregation for MinAggregation {
    fn input_type(&self) -> ValueType {
        ValueType::Float
    }

    fn return_type(&self) -> ValueType {
        ValueType::Float
    }

    fn aggregate(&self, values: &[DatedValue], _time: DateTime<Utc>) -> Value {
        reduce(values, |numbers| numbers.iter().copied().fold(f64::INFINITY, f64::min))
    }

    fn boxed_clone(&self) -> Box<dyn Aggregation> {
        Box::new(*self)
    }
}

/// `last`: most recent value, whatever its type
#[derive(Debug, Clone, Copy, Default)]
pub struct LastAggregation;

impl Aggregation for LastAggregation {
    fn input_type(&self) -> ValueType {
        ValueType::Any
    }

    fn return_type(&self) -> ValueType {
        ValueType::Any
    }

    fn aggregate(&self, values: &[DatedValue], _time: DateTime<Utc>) -> Value {
        values
            .iter()
            .max_by_key(|dv| dv.timestamp)
            .map(|dv| dv.value.clone())
            .unwrap_or_else(|| Value::Exception("no values".to_string()))
    }

    fn boxed_clone(&self) -> Box<dyn Aggregation> {
        Box::new(*self)
    }
}

fn reduce<F>(values: &[DatedValue], f: F) -> Value
where
    F: FnOnce(&[f64]) -> f64,
{
    if values.is_empty() {
        return Value::Exception("no values".to_string());
    }

    match numeric_values(values) {
        Ok(numbers) => Value::Float(f(&numbers)),
        Err(exception) => exception,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn window() -> Vec<DatedValue> {
        let t0 = Utc::now();
        vec![
            DatedValue::new(t0, 4.0),
            DatedValue::new(t0 + Duration::seconds(2), 1.0),
            DatedValue::new(t0 + Duration::seconds(1), 7.0),
        ]
    }

    #[test]
    fn test_statistics() {
        let now = Utc::now();
        let values = window();

        assert_eq!(CountAggregation.aggregate(&values, now), Value::Float(3.0));
        assert_eq!(AvgAggregation.aggregate(&values, now), Value::Float(4.0));
        assert_eq!(MaxAggregation.aggregate(&values, now), Value::Float(7.0));
        assert_eq!(MinAggregation.aggregate(&values, now), Value::Float(1.0));
        assert_eq!(LastAggregation.aggregate(&values, now), Value::Float(1.0));
    }

    #[test]
    fn test_empty_window() {
        let now = Utc::now();

        assert_eq!(CountAggregation.aggregate(&[], now), Value::Float(0.0));
        assert!(AvgAggregation.aggregate(&[], now).is_exception());
        assert!(MaxAggregation.aggregate(&[], now).is_exception());
        assert!(MinAggregation.aggregate(&[], now).is_exception());
        assert!(LastAggregation.aggregate(&[], now).is_exception());
    }

    #[test]
    fn test_count_and_last_take_any_value() {
        let now = Utc::now();
        let values = vec![
            DatedValue::new(now, "down"),
            DatedValue::new(now + Duration::seconds(1), "up"),
        ];

        assert_eq!(CountAggregation.aggregate(&values, now), Value::Float(2.0));
        assert_eq!(LastAggregation.aggregate(&values, now), Value::from("up"));
        assert!(AvgAggregation.aggregate(&values, now).is_exception());
    }
}
