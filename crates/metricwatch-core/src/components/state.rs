//! Persisted component state
//!
//! Every stateful variant owns one shape of [`ComponentState`]. The shape
//! name is written next to the payload so a blob always comes back as the
//! variant that produced it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregation::AggregationWindowState;
use crate::analysis::RecentAnalysisState;
use crate::error::{Error, Result};
use crate::notificator::{ConstantNotificatorState, PercentageNotificatorState};

/// State saved by one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ComponentState {
    /// State of the `constant` notificator
    ConstantNotificator(ConstantNotificatorState),
    /// State of the `percentage` notificator
    PercentageNotificator(PercentageNotificatorState),
    /// State of the `recent` analysis
    RecentAnalysis(RecentAnalysisState),
    /// Values kept for a monitor aggregation
    AggregationWindow(AggregationWindowState),
    /// State of a registered extension
    Custom {
        /// Name chosen by the extension for its state shape
        alias: String,
        /// Extension-defined content
        payload: serde_json::Value,
    },
}

/// Everything persisted for one monitored entity between two observations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// State of the analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ComponentState>,

    /// Window kept for the aggregation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<ComponentState>,

    /// State of each notificator, by notificator id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub notificators: BTreeMap<String, ComponentState>,
}

impl EntityState {
    /// Whether nothing needs to be persisted
    pub fn is_empty(&self) -> bool {
        self.analysis.is_none() && self.aggregation.is_none() && self.notificators.is_empty()
    }

    /// Encode into the blob handed to the state store
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a blob produced by [`EntityState::to_bytes`]
    pub fn from_bytes(blob: &[u8]) -> Result<Self> {
        serde_json::from_slice(blob).map_err(|e| Error::state(format!("unreadable entity state: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_state_carries_its_discriminator() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let state = ComponentState::ConstantNotificator(ConstantNotificatorState {
            constantly_seen_from: Some(ts),
            last_raised: None,
        });

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["type"], "constant-notificator");

        let back: ComponentState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_custom_state() {
        let state = ComponentState::Custom {
            alias: "my-extension".to_string(),
            payload: serde_json::json!({ "counter": 3 }),
        };

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"type\":\"custom\""));
        assert_eq!(serde_json::from_str::<ComponentState>(&json).unwrap(), state);
    }

    #[test]
    fn test_entity_state_blob() {
        let mut state = EntityState::default();
        assert!(state.is_empty());

        state.notificators.insert(
            "ops".to_string(),
            ComponentState::ConstantNotificator(ConstantNotificatorState::default()),
        );

        let blob = state.to_bytes().unwrap();
        assert_eq!(EntityState::from_bytes(&blob).unwrap(), state);
        assert!(EntityState::from_bytes(b"not json").is_err());
    }
}
