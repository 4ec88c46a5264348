//! Sum of the values in the window

use chrono::{DateTime, Utc};

use crate::components::Component;
use crate::error::Result;
use crate::models::{DatedValue, Value, ValueType};
use crate::properties::Properties;

use super::{numeric_values, Aggregation};

/// `sum` aggregation
///
/// An empty window yields an exception value rather than zero so that "no
/// data" is never mistaken for data summing to zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumAggregation;

impl Component for SumAggregation {
    fn configure(&mut self, properties: &Properties) -> Result<()> {
        properties.confirm_all_properties_used()
    }
}

impl Aggregation for SumAggregation {
    fn input_type(&self) -> ValueType {
        ValueType::Float
    }

    fn return_type(&self) -> ValueType {
        ValueType::Float
    }

    fn aggregate(&self, values: &[DatedValue], _time: DateTime<Utc>) -> Value {
        if values.is_empty() {
            return Value::Exception("no values".to_string());
        }

        match numeric_values(values) {
            Ok(numbers) => Value::Float(numbers.iter().sum()),
            Err(exception) => exception,
        }
    }

    fn boxed_clone(&self) -> Box<dyn Aggregation> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_window_is_an_exception() {
        let result = SumAggregation.aggregate(&[], Utc::now());
        assert_eq!(result, Value::Exception("no values".to_string()));
        assert_ne!(result, Value::Float(0.0));
    }

    #[test]
    fn test_sum_of_raw_and_aggregated_values() {
        let now = Utc::now();
        let values = vec![
            DatedValue::new(now, 1.5),
            DatedValue::new(now, Value::Aggregated(Box::new(Value::Float(2.5)))),
            DatedValue::new(now, -1.0),
        ];
        assert_eq!(SumAggregation.aggregate(&values, now), Value::Float(3.0));
    }

    #[test]
    fn test_values_summing_to_zero() {
        let now = Utc::now();
        let values = vec![DatedValue::new(now, 2.0), DatedValue::new(now, -2.0)];
        assert_eq!(SumAggregation.aggregate(&values, now), Value::Float(0.0));
    }

    #[test]
    fn test_non_numeric_value_is_an_exception() {
        let now = Utc::now();
        let values = vec![DatedValue::new(now, 2.0), DatedValue::new(now, true)];
        assert!(SumAggregation.aggregate(&values, now).is_exception());
    }

    #[test]
    fn test_rejects_options() {
        let mut sum = SumAggregation;
        assert!(sum.configure(&Properties::new().with("scale", "2")).is_err());
    }
}
