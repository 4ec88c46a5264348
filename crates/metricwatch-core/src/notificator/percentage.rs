//! Raise when the status was in a set of statuses for a share of a period

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::components::{Component, ComponentState};
use crate::error::{Error, Result};
use crate::models::{Notification, Status};
use crate::properties::{format_duration, Properties};
use crate::template::strip_trailing_zeros;

use super::{format_statuses, is_silenced, parse_statuses, Notificator};

const DEFAULT_PERIOD_MINUTES: i64 = 15;
const DEFAULT_PERCENTAGE: f64 = 90.0;

/// One observed status, reduced to whether it was expected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// When the status was observed
    pub timestamp: DateTime<Utc>,
    /// Whether the status was one of the expected statuses
    pub expected: bool,
}

/// Persisted state of [`PercentageNotificator`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentageNotificatorState {
    /// First observation since the last raise
    pub tracking_since: Option<DateTime<Utc>>,
    /// Observations within the period, oldest first
    #[serde(default)]
    pub history: Vec<StatusRecord>,
    /// Last time a notification was raised
    pub last_raised: Option<DateTime<Utc>>,
}

/// `percentage` notificator
///
/// Raises when observations cover at least `period` and at least
/// `percentage` percent of the observations within `period` are in
/// `statuses`.
#[derive(Debug, Clone)]
pub struct PercentageNotificator {
    id: String,
    expected_statuses: Vec<Status>,
    period: Duration,
    percentage: f64,
    silent_period: Duration,
    state: PercentageNotificatorState,
}

impl Default for PercentageNotificator {
    fn default() -> Self {
        Self {
            id: String::new(),
            expected_statuses: Vec::new(),
            period: Duration::minutes(DEFAULT_PERIOD_MINUTES),
            percentage: DEFAULT_PERCENTAGE,
            silent_period: Duration::zero(),
            state: PercentageNotificatorState::default(),
        }
    }
}

impl PercentageNotificator {
    fn expected_share(&self) -> f64 {
        let history = &self.state.history;
        if history.is_empty() {
            return 0.0;
        }
        let expected = history.iter().filter(|r| r.expected).count();
        expected as f64 * 100.0 / history.len() as f64
    }
}

impl Component for PercentageNotificator {
    fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }

    fn configure(&mut self, properties: &Properties) -> Result<()> {
        self.expected_statuses = parse_statuses(properties, "statuses")?;
        self.period =
            properties.get_duration("period", Duration::minutes(DEFAULT_PERIOD_MINUTES))?;
        self.silent_period = properties.get_duration("silent.period", Duration::zero())?;

        let percentage = properties.get_float_or("percentage", DEFAULT_PERCENTAGE)?;
        if !(0.0..=100.0).contains(&percentage) {
            return Err(Error::configuration(format!(
                "percentage must be between 0 and 100 (found {percentage})"
            )));
        }
        self.percentage = percentage;

        properties.confirm_all_properties_used()
    }

    fn save(&self) -> Option<ComponentState> {
        Some(ComponentState::PercentageNotificator(self.state.clone()))
    }

    fn load(&mut self, state: Option<ComponentState>) {
        self.state = match state {
            Some(ComponentState::PercentageNotificator(state)) => state,
            _ => PercentageNotificatorState::default(),
        };
    }
}

impl Notificator for PercentageNotificator {
    fn process(&mut self, status: Status, timestamp: DateTime<Utc>) -> Option<Notification> {
        if is_silenced(&mut self.state.last_raised, self.silent_period, timestamp) {
            debug!(notificator = %self.id, "Notificator silenced");
            return None;
        }

        let state = &mut self.state;
        if let Some(oldest_kept) = timestamp.checked_sub_signed(self.period) {
            state.history.retain(|r| r.timestamp >= oldest_kept);
        }
        state.history.push(StatusRecord {
            timestamp,
            expected: self.expected_statuses.contains(&status),
        });
        let tracking_since = *state.tracking_since.get_or_insert(timestamp);

        if timestamp - tracking_since < self.period {
            return None;
        }

        let share = self.expected_share();
        if share < self.percentage {
            return None;
        }

        let reason = format!(
            "Metric has been in state {} {}% of the last {}.",
            format_statuses(&self.expected_statuses),
            strip_trailing_zeros(&format!("{share:.2}")),
            format_duration(self.period)
        );
        info!(notificator = %self.id, %reason, "Notification raised");

        self.state = PercentageNotificatorState {
            tracking_since: None,
            history: Vec::new(),
            last_raised: Some(timestamp),
        };

        Some(Notification::raised(&self.id, timestamp, reason))
    }

    fn boxed_clone(&self) -> Box<dyn Notificator> {
        Box::new(self.clone())
    }
}
