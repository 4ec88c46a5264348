//! Notification data models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A notification raised by a notificator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique identifier
    pub id: Uuid,

    /// Monitor the notificator belongs to
    pub monitor_id: String,

    /// Notificator that raised it
    pub notificator_id: String,

    /// Timestamp of the observation that raised it
    pub timestamp: DateTime<Utc>,

    /// Why it was raised
    pub reason: String,

    /// Rendered message
    pub message: String,

    /// Tags propagated from the monitor configuration
    pub tags: BTreeMap<String, String>,

    /// Attributes of the metric that raised it
    pub metric_attributes: BTreeMap<String, String>,
}

impl Notification {
    /// Create a notification raised by a notificator at `timestamp`
    pub fn raised(
        notificator_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            monitor_id: String::new(),
            notificator_id: notificator_id.into(),
            timestamp,
            reason: reason.into(),
            message: String::new(),
            tags: BTreeMap::new(),
            metric_attributes: BTreeMap::new(),
        }
    }
}
