//! Analyses turn an observed value into a status

mod fixed_threshold;
mod recent;

pub use fixed_threshold::FixedThresholdAnalysis;
pub use recent::{RecentAnalysis, RecentAnalysisState};

use chrono::{DateTime, Utc};

use crate::components::Component;
use crate::models::{AnalysisResult, Value, ValueType};

/// Capability marker of analyses in the registry
pub enum Analyses {}

/// Computes the status of an observation
///
/// Problems met while analysing (wrong value type, missing history...) are
/// reported as [`Status::Exception`](crate::models::Status::Exception)
/// results, never as errors.
pub trait Analysis: Component {
    /// Type of values this analysis understands
    fn input_type(&self) -> ValueType {
        ValueType::Float
    }

    /// Analyse the value observed at `timestamp`
    fn process(&mut self, timestamp: DateTime<Utc>, value: &Value) -> AnalysisResult;

    /// Copy of this configured instance, used to serve one entity
    fn boxed_clone(&self) -> Box<dyn Analysis>;
}

/// Numeric form of `value`, or the EXCEPTION result to return instead
pub(crate) fn require_numeric(value: &Value) -> Result<f64, AnalysisResult> {
    if let Value::Exception(msg) = value {
        return Err(AnalysisResult::exception(format!("value is an exception: {msg}")));
    }

    value.as_numeric().ok_or_else(|| {
        AnalysisResult::exception(format!(
            "analysis requires a float value but received {value}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;

    #[test]
    fn test_require_numeric() {
        assert_eq!(require_numeric(&Value::Float(2.5)).unwrap(), 2.5);
        assert_eq!(
            require_numeric(&Value::Aggregated(Box::new(Value::Float(4.0)))).unwrap(),
            4.0
        );

        let result = require_numeric(&Value::from("up")).unwrap_err();
        assert_eq!(result.status, Status::Exception);
        assert!(result.reason.contains("up"));

        let result = require_numeric(&Value::Exception("no values".into())).unwrap_err();
        assert_eq!(result.reason, "value is an exception: no values");
    }
}
