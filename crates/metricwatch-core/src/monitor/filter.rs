//! Selection of the metrics a monitor applies to

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::{Error, Result};
use crate::models::Metric;
use crate::properties::Properties;

const ATTRIBUTE_PREFIX: &str = "attribute";

/// Attribute patterns a metric must match
///
/// Each pattern must match the whole attribute value. A metric lacking one
/// of the filtered attributes does not match. An empty filter matches
/// everything.
#[derive(Debug, Clone, Default)]
pub struct MetricFilter {
    attributes: BTreeMap<String, Regex>,
}

impl MetricFilter {
    /// Read `attribute.<name> = <regex>` entries
    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let mut filter = Self::default();

        for name in properties.ids(ATTRIBUTE_PREFIX) {
            let key = format!("{ATTRIBUTE_PREFIX}.{name}");
            let pattern = properties.get_string(&key)?;
            filter = filter.with_attribute(&name, pattern)?;
        }

        properties.confirm_all_properties_used()?;
        Ok(filter)
    }

    /// Require attribute `name` to fully match `pattern`
    pub fn with_attribute(mut self, name: &str, pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            Error::configuration(format!("filter.attribute.{name}: invalid pattern ({e})"))
        })?;
        self.attributes.insert(name.to_string(), regex);
        Ok(self)
    }

    /// Whether `metric` passes every pattern
    pub fn matches(&self, metric: &Metric) -> bool {
        self.attributes.iter().all(|(name, regex)| {
            metric
                .attributes
                .get(name)
                .is_some_and(|value| regex.is_match(value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    fn metric(host: Option<&str>) -> Metric {
        let metric = Metric::new(Utc::now(), 1.0).with_attribute("cluster", "db");
        match host {
            Some(host) => metric.with_attribute("host", host),
            None => metric,
        }
    }

    #[rstest]
    #[case(Some("db-01"), true)]
    #[case(Some("db-01.cern.ch"), false)]
    #[case(Some("web-01"), false)]
    #[case(None, false)]
    fn test_patterns_match_whole_values(#[case] host: Option<&str>, #[case] expected: bool) {
        let props = Properties::new().with("attribute.host", "db-\\d+");
        let filter = MetricFilter::from_properties(&props).unwrap();

        assert_eq!(filter.matches(&metric(host)), expected);
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = MetricFilter::from_properties(&Properties::new()).unwrap();
        assert!(filter.matches(&metric(None)));
    }

    #[test]
    fn test_configuration_errors() {
        let props = Properties::new().with("attribute.host", "db-(");
        assert!(MetricFilter::from_properties(&props).unwrap_err().is_configuration());

        let props = Properties::new().with("atribute.host", "db");
        assert!(MetricFilter::from_properties(&props).is_err());
    }
}
