//! Aggregations reduce a window of values into one value

mod stats;
mod sum;

pub use stats::{AvgAggregation, CountAggregation, LastAggregation, MaxAggregation, MinAggregation};
pub use sum::SumAggregation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::components::Component;
use crate::error::{Error, Result};
use crate::models::{DatedValue, Value, ValueType};

/// Capability marker of aggregations in the registry
pub enum Aggregations {}

/// Reduces a window of dated values
pub trait Aggregation: Component {
    /// Type of values this aggregation consumes
    fn input_type(&self) -> ValueType;

    /// Type of the value this aggregation produces
    fn return_type(&self) -> ValueType;

    /// Reduce `values`, evaluated at `time`
    ///
    /// A window that cannot be reduced yields [`Value::Exception`].
    fn aggregate(&self, values: &[DatedValue], time: DateTime<Utc>) -> Value;

    /// Copy of this configured instance
    fn boxed_clone(&self) -> Box<dyn Aggregation>;
}

/// Values kept by a monitor between two aggregations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationWindowState {
    /// Values within the aggregation period, oldest first
    pub values: Vec<DatedValue>,
}

/// Fail unless a consumer accepting `accepted` can take values of type `produced`
pub fn check_compatible(
    producer: &str,
    produced: ValueType,
    consumer: &str,
    accepted: ValueType,
) -> Result<()> {
    if accepted.accepts(produced) {
        Ok(())
    } else {
        Err(Error::IncompatibleTypes {
            producer: producer.to_string(),
            produced,
            consumer: consumer.to_string(),
            accepted,
        })
    }
}

/// Numeric form of each value, aggregated values first
///
/// Fails with the exception value to return when a value is not numeric.
pub(crate) fn numeric_values(values: &[DatedValue]) -> std::result::Result<Vec<f64>, Value> {
    values
        .iter()
        .map(|dv| match &dv.value {
            Value::Exception(msg) => Err(Value::Exception(msg.clone())),
            other => other
                .as_numeric()
                .ok_or_else(|| Value::Exception(format!("non numeric value: {other}"))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ValueType::Float, ValueType::Float, true)]
    #[case(ValueType::Float, ValueType::Any, true)]
    #[case(ValueType::Any, ValueType::Float, false)]
    #[case(ValueType::String, ValueType::Float, false)]
    #[case(ValueType::Boolean, ValueType::Boolean, true)]
    fn test_check_compatible(
        #[case] produced: ValueType,
        #[case] accepted: ValueType,
        #[case] compatible: bool,
    ) {
        let result = check_compatible("sum", produced, "fixed-threshold", accepted);
        assert_eq!(result.is_ok(), compatible);
        if let Err(err) = result {
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn test_numeric_values() {
        let now = Utc::now();
        let values = vec![
            DatedValue::new(now, 1.5),
            DatedValue::new(now, Value::Aggregated(Box::new(Value::Float(2.0)))),
        ];
        assert_eq!(numeric_values(&values).unwrap(), vec![1.5, 2.0]);

        let values = vec![DatedValue::new(now, "up")];
        assert!(numeric_values(&values).unwrap_err().is_exception());
    }
}
