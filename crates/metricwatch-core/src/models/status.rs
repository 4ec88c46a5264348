//! Analysis status data models

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Value;

/// Discrete outcome of an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// Value looks normal
    Ok,
    /// Value crossed a warning level
    Warning,
    /// Value crossed an error level
    Error,
    /// The analysis could not decide
    Exception,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Error => "ERROR",
            Status::Exception => "EXCEPTION",
        };
        f.write_str(s)
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OK" => Ok(Self::Ok),
            "WARNING" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "EXCEPTION" => Ok(Self::Exception),
            _ => Err(format!("unknown status: {s}")),
        }
    }
}

/// Result of analysing one metric observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Monitor that produced the result
    pub monitor_id: Option<String>,

    /// Timestamp of the analysed observation
    pub timestamp: DateTime<Utc>,

    /// The value the analysis looked at
    pub analyzed_value: Option<Value>,

    /// Outcome
    pub status: Status,

    /// Human-readable explanation of the status
    pub reason: String,

    /// Named figures computed by the analysis (score, average...)
    pub analysis_params: BTreeMap<String, f64>,

    /// Tags propagated from the monitor configuration
    pub tags: BTreeMap<String, String>,
}

impl AnalysisResult {
    /// Create a result with the given status and reason
    pub fn new(status: Status, reason: impl Into<String>) -> Self {
        Self {
            monitor_id: None,
            timestamp: DateTime::<Utc>::default(),
            analyzed_value: None,
            status,
            reason: reason.into(),
            analysis_params: BTreeMap::new(),
            tags: BTreeMap::new(),
        }
    }

    /// OK result
    pub fn ok(reason: impl Into<String>) -> Self {
        Self::new(Status::Ok, reason)
    }

    /// WARNING result
    pub fn warning(reason: impl Into<String>) -> Self {
        Self::new(Status::Warning, reason)
    }

    /// ERROR result
    pub fn error(reason: impl Into<String>) -> Self {
        Self::new(Status::Error, reason)
    }

    /// EXCEPTION result
    pub fn exception(reason: impl Into<String>) -> Self {
        Self::new(Status::Exception, reason)
    }

    /// Attach a named figure
    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.analysis_params.insert(name.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!("error".parse::<Status>().unwrap(), Status::Error);
        assert_eq!(" Warning ".parse::<Status>().unwrap(), Status::Warning);
        assert!("broken".parse::<Status>().is_err());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Status::Exception).unwrap(), "\"EXCEPTION\"");
    }

    #[test]
    fn test_result_builder() {
        let result = AnalysisResult::warning("close to the limit").with_param("value", 8.0);
        assert_eq!(result.status, Status::Warning);
        assert_eq!(result.analysis_params.get("value"), Some(&8.0));
    }
}
