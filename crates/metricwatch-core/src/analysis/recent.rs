//! Compare a value with the recent history of the same entity

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::components::{Component, ComponentState};
use crate::error::{Error, Result};
use crate::models::{AnalysisResult, DatedValue, Value};
use crate::properties::Properties;

use super::{require_numeric, Analysis};

const DEFAULT_PERIOD_MINUTES: i64 = 5;
const DEFAULT_ERROR_RATIO: f64 = 4.0;
const DEFAULT_WARN_RATIO: f64 = 2.0;

/// Persisted state of [`RecentAnalysis`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentAnalysisState {
    /// Values observed within the period, oldest first
    pub values: Vec<DatedValue>,
}

/// `recent` analysis
///
/// Keeps the values of the last `period` and flags a value whose distance to
/// their average exceeds `ratio` standard deviations.
#[derive(Debug, Clone)]
pub struct RecentAnalysis {
    period: Duration,
    error_ratio: f64,
    warn_ratio: f64,
    history: Vec<(DateTime<Utc>, f64)>,
}

impl Default for RecentAnalysis {
    fn default() -> Self {
        Self {
            period: Duration::minutes(DEFAULT_PERIOD_MINUTES),
            error_ratio: DEFAULT_ERROR_RATIO,
            warn_ratio: DEFAULT_WARN_RATIO,
            history: Vec::new(),
        }
    }
}

impl RecentAnalysis {
    /// Average and population standard deviation of the history
    fn statistics(&self) -> (f64, f64) {
        let n = self.history.len() as f64;
        let mean = self.history.iter().map(|(_, v)| v).sum::<f64>() / n;
        let variance = self
            .history
            .iter()
            .map(|(_, v)| (v - mean).powi(2))
            .sum::<f64>()
            / n;
        (mean, variance.sqrt())
    }
}

impl Component for RecentAnalysis {
    fn configure(&mut self, properties: &Properties) -> Result<()> {
        self.period =
            properties.get_duration("period", Duration::minutes(DEFAULT_PERIOD_MINUTES))?;
        self.error_ratio = properties.get_float_or("error.ratio", DEFAULT_ERROR_RATIO)?;
        self.warn_ratio = properties.get_float_or("warn.ratio", DEFAULT_WARN_RATIO)?;

        if self.error_ratio < self.warn_ratio {
            return Err(Error::configuration(format!(
                "error.ratio ({}) must not be lower than warn.ratio ({})",
                self.error_ratio, self.warn_ratio
            )));
        }

        properties.confirm_all_properties_used()
    }

    fn save(&self) -> Option<ComponentState> {
        let values = self
            .history
            .iter()
            .map(|(ts, v)| DatedValue::new(*ts, *v))
            .collect();
        Some(ComponentState::RecentAnalysis(RecentAnalysisState { values }))
    }

    fn load(&mut self, state: Option<ComponentState>) {
        self.history = match state {
            Some(ComponentState::RecentAnalysis(state)) => state
                .values
                .iter()
                .filter_map(|dv| dv.value.as_numeric().map(|v| (dv.timestamp, v)))
                .collect(),
            _ => Vec::new(),
        };
    }
}

impl Analysis for RecentAnalysis {
    fn process(&mut self, timestamp: DateTime<Utc>, value: &Value) -> AnalysisResult {
        let value = match require_numeric(value) {
            Ok(v) => v,
            Err(result) => return result,
        };

        let oldest_kept = timestamp.checked_sub_signed(self.period);
        self.history
            .retain(|(ts, _)| *ts < timestamp && oldest_kept.map_or(true, |oldest| *ts >= oldest));

        if self.history.len() < 2 {
            self.history.push((timestamp, value));
            return AnalysisResult::exception("not enough history").with_param("value", value);
        }

        let (average, stddev) = self.statistics();
        let distance = (value - average).abs();

        let result = if distance > self.error_ratio * stddev {
            AnalysisResult::error(format!(
                "Value {value} is more than {} standard deviations away from average {average:.3}",
                self.error_ratio
            ))
        } else if distance > self.warn_ratio * stddev {
            AnalysisResult::warning(format!(
                "Value {value} is more than {} standard deviations away from average {average:.3}",
                self.warn_ratio
            ))
        } else {
            AnalysisResult::ok(format!("Value {value} is close to average {average:.3}"))
        };

        self.history.push((timestamp, value));

        result
            .with_param("average", average)
            .with_param("stddev", stddev)
            .with_param("value", value)
    }

    fn boxed_clone(&self) -> Box<dyn Analysis> {
        Box::new(self.clone())
    }
}
