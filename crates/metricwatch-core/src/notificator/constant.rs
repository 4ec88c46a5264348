//! Raise when the status stays in a set of statuses for a period

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::components::{Component, ComponentState};
use crate::error::Result;
use crate::models::{Notification, Status};
use crate::properties::{format_duration, Properties};

use super::{format_statuses, is_silenced, parse_statuses, Notificator};

const DEFAULT_PERIOD_MINUTES: i64 = 15;

/// Persisted state of [`ConstantNotificator`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantNotificatorState {
    /// First observation of the current run of expected statuses
    pub constantly_seen_from: Option<DateTime<Utc>>,
    /// Last time a notification was raised
    pub last_raised: Option<DateTime<Utc>>,
}

/// `constant` notificator
///
/// Raises once the status has been in `statuses` without interruption for
/// `period`, then starts counting again. After a raise, nothing is evaluated
/// during `silent.period`.
#[derive(Debug, Clone)]
pub struct ConstantNotificator {
    id: String,
    expected_statuses: Vec<Status>,
    period: Duration,
    silent_period: Duration,
    constantly_seen_from: Option<DateTime<Utc>>,
    last_raised: Option<DateTime<Utc>>,
}

impl Default for ConstantNotificator {
    fn default() -> Self {
        Self {
            id: String::new(),
            expected_statuses: Vec::new(),
            period: Duration::minutes(DEFAULT_PERIOD_MINUTES),
            silent_period: Duration::zero(),
            constantly_seen_from: None,
            last_raised: None,
        }
    }
}

impl ConstantNotificator {
    /// Time spent in the expected statuses at `timestamp`
    fn elapsed(&self, timestamp: DateTime<Utc>) -> Duration {
        match self.constantly_seen_from {
            Some(from) => {
                let diff = timestamp - from;
                if diff < Duration::zero() {
                    -diff
                } else {
                    diff
                }
            }
            None => Duration::zero(),
        }
    }
}

impl Component for ConstantNotificator {
    fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }

    fn configure(&mut self, properties: &Properties) -> Result<()> {
        self.expected_statuses = parse_statuses(properties, "statuses")?;
        self.period =
            properties.get_duration("period", Duration::minutes(DEFAULT_PERIOD_MINUTES))?;
        self.silent_period = properties.get_duration("silent.period", Duration::zero())?;

        properties.confirm_all_properties_used()
    }

    fn save(&self) -> Option<ComponentState> {
        Some(ComponentState::ConstantNotificator(ConstantNotificatorState {
            constantly_seen_from: self.constantly_seen_from,
            last_raised: self.last_raised,
        }))
    }

    fn load(&mut self, state: Option<ComponentState>) {
        let state = match state {
            Some(ComponentState::ConstantNotificator(state)) => state,
            _ => ConstantNotificatorState::default(),
        };
        self.constantly_seen_from = state.constantly_seen_from;
        self.last_raised = state.last_raised;
    }
}

impl Notificator for ConstantNotificator {
    fn process(&mut self, status: Status, timestamp: DateTime<Utc>) -> Option<Notification> {
        if is_silenced(&mut self.last_raised, self.silent_period, timestamp) {
            debug!(notificator = %self.id, "Notificator silenced");
            return None;
        }

        let expected = self.expected_statuses.contains(&status);
        if !expected {
            self.constantly_seen_from = None;
        } else if self.constantly_seen_from.is_none() {
            self.constantly_seen_from = Some(timestamp);
        }

        let elapsed = self.elapsed(timestamp);
        if elapsed < self.period {
            return None;
        }

        let reason = format!(
            "Metric has been in state {} for {}.",
            format_statuses(&self.expected_statuses),
            format_duration(elapsed)
        );
        info!(notificator = %self.id, %reason, "Notification raised");

        self.constantly_seen_from = None;
        self.last_raised = Some(timestamp);

        Some(Notification::raised(&self.id, timestamp, reason))
    }

    fn boxed_clone(&self) -> Box<dyn Notificator> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notificator::process_with_state;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn notificator(props: Properties) -> ConstantNotificator {
        let mut notificator = ConstantNotificator::default();
        notificator.set_id("ops");
        notificator.configure(&props).unwrap();
        notificator
    }

    fn error_15m() -> ConstantNotificator {
        notificator(
            Properties::new()
                .with("statuses", "ERROR")
                .with("period", "15m"),
        )
    }

    #[test]
    fn test_raises_once_after_period_then_resets() {
        let mut n = error_15m();

        for minute in [0, 5, 10, 14] {
            assert!(n.process(Status::Error, t(minute)).is_none(), "minute {minute}");
        }

        let raised = n.process(Status::Error, t(15)).unwrap();
        assert_eq!(raised.notificator_id, "ops");
        assert_eq!(raised.timestamp, t(15));
        assert_eq!(raised.reason, "Metric has been in state [ERROR] for 15m.");
        assert_eq!(n.constantly_seen_from, None);
        assert_eq!(n.last_raised, Some(t(15)));

        // accumulation starts again from the next observation
        for minute in [16, 20, 30] {
            assert!(n.process(Status::Error, t(minute)).is_none(), "minute {minute}");
        }
        assert!(n.process(Status::Error, t(31)).is_some());
    }

    #[test]
    fn test_gap_resets_accumulation() {
        let mut n = error_15m();

        assert!(n.process(Status::Error, t(0)).is_none());
        assert!(n.process(Status::Error, t(10)).is_none());
        assert!(n.process(Status::Ok, t(12)).is_none());
        assert_eq!(n.constantly_seen_from, None);

        assert!(n.process(Status::Error, t(13)).is_none());
        assert!(n.process(Status::Error, t(20)).is_none());
        assert!(n.process(Status::Error, t(27)).is_none());
        assert!(n.process(Status::Error, t(28)).is_some());
    }

    #[test]
    fn test_silent_period() {
        let mut n = notificator(
            Properties::new()
                .with("statuses", "error warning")
                .with("period", "10m")
                .with("silent.period", "5m"),
        );

        assert!(n.process(Status::Error, t(0)).is_none());
        let raised = n.process(Status::Warning, t(10)).unwrap();
        assert_eq!(raised.reason, "Metric has been in state [ERROR, WARNING] for 10m.");

        // silenced observations are not even accumulated
        assert!(n.process(Status::Error, t(11)).is_none());
        assert!(n.process(Status::Error, t(14)).is_none());
        assert_eq!(n.constantly_seen_from, None);

        assert!(n.process(Status::Error, t(15)).is_none());
        assert_eq!(n.last_raised, None);
        assert_eq!(n.constantly_seen_from, Some(t(15)));
        assert!(n.process(Status::Error, t(25)).is_some());
    }

    #[test]
    fn test_silent_period_beyond_calendar_range() {
        let mut n = notificator(
            Properties::new()
                .with("statuses", "ERROR")
                .with("period", "0")
                .with("silent.period", "1000000years"),
        );

        assert!(n.process(Status::Error, t(0)).is_some());
        assert!(n.process(Status::Error, t(1)).is_none());
        assert_eq!(n.last_raised, Some(t(0)));
    }

    #[test]
    fn test_zero_period_raises_on_first_expected_status() {
        let mut n = notificator(
            Properties::new()
                .with("statuses", "EXCEPTION")
                .with("period", "0"),
        );

        assert!(n.process(Status::Ok, t(0)).is_none());
        let raised = n.process(Status::Exception, t(1)).unwrap();
        assert_eq!(raised.reason, "Metric has been in state [EXCEPTION] for 0s.");
    }

    #[test]
    fn test_state_survives_between_instances() {
        let prototype = error_15m();

        let mut first = prototype.clone();
        let (notification, state) = process_with_state(&mut first, Status::Error, t(0), None);
        assert!(notification.is_none());

        let mut second = prototype.clone();
        let (notification, state) =
            process_with_state(&mut second, Status::Error, t(15), state);
        assert!(notification.is_some());

        assert_eq!(
            state,
            Some(ComponentState::ConstantNotificator(ConstantNotificatorState {
                constantly_seen_from: None,
                last_raised: Some(t(15)),
            }))
        );
    }

    #[test]
    fn test_foreign_state_is_ignored() {
        let mut n = error_15m();
        n.load(Some(ComponentState::Custom {
            alias: "other".to_string(),
            payload: serde_json::Value::Null,
        }));

        assert_eq!(n.constantly_seen_from, None);
        assert_eq!(n.last_raised, None);
    }

    #[test]
    fn test_configuration_errors() {
        let mut n = ConstantNotificator::default();
        assert!(n.configure(&Properties::new()).is_err());

        let mut n = ConstantNotificator::default();
        let err = n
            .configure(
                &Properties::new()
                    .with("statuses", "ERROR")
                    .with("periode", "5m"),
            )
            .unwrap_err();
        assert!(err.to_string().contains("periode"));

        let mut n = ConstantNotificator::default();
        assert!(n
            .configure(
                &Properties::new()
                    .with("statuses", "ERROR")
                    .with("period", "soon"),
            )
            .is_err());
    }
}
