//! Static thresholds

use chrono::{DateTime, Utc};

use crate::components::Component;
use crate::error::{Error, Result};
use crate::models::{AnalysisResult, Value};
use crate::properties::Properties;

use super::{require_numeric, Analysis};

/// `fixed-threshold` analysis
///
/// Every bound is optional. A value at or beyond an error bound is ERROR, at
/// or beyond a warning bound is WARNING, OK otherwise.
#[derive(Debug, Clone, Default)]
pub struct FixedThresholdAnalysis {
    error_upperbound: Option<f64>,
    warn_upperbound: Option<f64>,
    warn_lowerbound: Option<f64>,
    error_lowerbound: Option<f64>,
}

impl FixedThresholdAnalysis {
    fn bounds(&self) -> [(&'static str, Option<f64>); 4] {
        [
            ("error_lowerbound", self.error_lowerbound),
            ("warn_lowerbound", self.warn_lowerbound),
            ("warn_upperbound", self.warn_upperbound),
            ("error_upperbound", self.error_upperbound),
        ]
    }

    /// Configured bounds must not cross each other
    fn validate(&self) -> Result<()> {
        let configured: Vec<(&str, f64)> = self
            .bounds()
            .into_iter()
            .filter_map(|(name, bound)| bound.map(|b| (name, b)))
            .collect();

        for pair in configured.windows(2) {
            let (lower_name, lower) = pair[0];
            let (upper_name, upper) = pair[1];
            if lower > upper {
                return Err(Error::configuration(format!(
                    "{} ({lower}) must not be greater than {} ({upper})",
                    lower_name.replace('_', "."),
                    upper_name.replace('_', "."),
                )));
            }
        }
        Ok(())
    }
}

impl Component for FixedThresholdAnalysis {
    fn configure(&mut self, properties: &Properties) -> Result<()> {
        self.error_upperbound = properties.get_float("error.upperbound")?;
        self.warn_upperbound = properties.get_float("warn.upperbound")?;
        self.warn_lowerbound = properties.get_float("warn.lowerbound")?;
        self.error_lowerbound = properties.get_float("error.lowerbound")?;

        self.validate()?;
        properties.confirm_all_properties_used()
    }
}

impl Analysis for FixedThresholdAnalysis {
    fn process(&mut self, _timestamp: DateTime<Utc>, value: &Value) -> AnalysisResult {
        let value = match require_numeric(value) {
            Ok(v) => v,
            Err(result) => return result,
        };

        let mut result = if let Some(bound) = self.error_upperbound.filter(|b| value >= *b) {
            AnalysisResult::error(format!(
                "Value {value} is higher or equal than error upper bound {bound}"
            ))
        } else if let Some(bound) = self.error_lowerbound.filter(|b| value <= *b) {
            AnalysisResult::error(format!(
                "Value {value} is lower or equal than error lower bound {bound}"
            ))
        } else if let Some(bound) = self.warn_upperbound.filter(|b| value >= *b) {
            AnalysisResult::warning(format!(
                "Value {value} is higher or equal than warning upper bound {bound}"
            ))
        } else if let Some(bound) = self.warn_lowerbound.filter(|b| value <= *b) {
            AnalysisResult::warning(format!(
                "Value {value} is lower or equal than warning lower bound {bound}"
            ))
        } else {
            AnalysisResult::ok(format!("Value {value} is between configured bounds"))
        };

        result = result.with_param("value", value);
        for (name, bound) in self.bounds() {
            if let Some(bound) = bound {
                result = result.with_param(name, bound);
            }
        }
        result
    }

    fn boxed_clone(&self) -> Box<dyn Analysis> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use rstest::rstest;

    fn analysis() -> FixedThresholdAnalysis {
        let mut analysis = FixedThresholdAnalysis::default();
        analysis
            .configure(
                &Properties::new()
                    .with("error.upperbound", "90")
                    .with("warn.upperbound", "70")
                    .with("warn.lowerbound", "20")
                    .with("error.lowerbound", "10"),
            )
            .unwrap();
        analysis
    }

    #[rstest]
    #[case(95.0, Status::Error)]
    #[case(90.0, Status::Error)]
    #[case(80.0, Status::Warning)]
    #[case(70.0, Status::Warning)]
    #[case(50.0, Status::Ok)]
    #[case(20.0, Status::Warning)]
    #[case(15.0, Status::Warning)]
    #[case(10.0, Status::Error)]
    #[case(-3.0, Status::Error)]
    fn test_status_by_value(#[case] value: f64, #[case] expected: Status) {
        let result = analysis().process(Utc::now(), &Value::Float(value));
        assert_eq!(result.status, expected, "{}", result.reason);
        assert_eq!(result.analysis_params["value"], value);
    }

    #[test]
    fn test_params_hold_configured_bounds_only() {
        let mut analysis = FixedThresholdAnalysis::default();
        analysis
            .configure(&Properties::new().with("error.upperbound", "5"))
            .unwrap();

        let result = analysis.process(Utc::now(), &Value::Float(1.0));
        assert_eq!(result.status, Status::Ok);
        assert_eq!(result.analysis_params.len(), 2);
        assert_eq!(result.analysis_params["error_upperbound"], 5.0);
    }

    #[rstest]
    #[case("error.upperbound", "60", "warn.upperbound", "70")]
    #[case("warn.lowerbound", "5", "error.lowerbound", "10")]
    #[case("warn.lowerbound", "80", "warn.upperbound", "70")]
    fn test_misordered_bounds_are_rejected(
        #[case] k1: &str,
        #[case] v1: &str,
        #[case] k2: &str,
        #[case] v2: &str,
    ) {
        let mut analysis = FixedThresholdAnalysis::default();
        let err = analysis
            .configure(&Properties::new().with(k1, v1).with(k2, v2))
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_non_numeric_value_is_an_exception() {
        let result = analysis().process(Utc::now(), &Value::Boolean(true));
        assert_eq!(result.status, Status::Exception);
    }
}
