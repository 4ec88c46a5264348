//! Notificators decide when a status history deserves a notification
//!
//! A notificator sees every status computed for its entity and keeps,
//! between observations, whatever it needs to decide (see
//! [`ComponentState`]). Each call either raises one [`Notification`] or
//! stays quiet.

mod constant;
mod percentage;

pub use constant::{ConstantNotificator, ConstantNotificatorState};
pub use percentage::{PercentageNotificator, PercentageNotificatorState, StatusRecord};

use chrono::{DateTime, Duration, Utc};

use crate::components::{Component, ComponentState};
use crate::error::{Error, Result};
use crate::models::{Notification, Status};
use crate::properties::Properties;

/// Capability marker of notificators in the registry
pub enum Notificators {}

/// Decision logic turning a status history into notifications
pub trait Notificator: Component {
    /// Feed the status computed at `timestamp`
    fn process(&mut self, status: Status, timestamp: DateTime<Utc>) -> Option<Notification>;

    /// Copy of this configured instance, used to serve one entity
    fn boxed_clone(&self) -> Box<dyn Notificator>;
}

/// Run `notificator` against its persisted state
///
/// Returns the notification, if any, and the state to persist.
pub fn process_with_state(
    notificator: &mut dyn Notificator,
    status: Status,
    timestamp: DateTime<Utc>,
    prior: Option<ComponentState>,
) -> (Option<Notification>, Option<ComponentState>) {
    notificator.load(prior);
    let notification = notificator.process(status, timestamp);
    (notification, notificator.save())
}

/// Read the whitespace separated `statuses` key
///
/// Order of first appearance is kept, duplicates are dropped.
pub(crate) fn parse_statuses(properties: &Properties, key: &str) -> Result<Vec<Status>> {
    let raw = properties.get_string(key)?;

    let mut statuses = Vec::new();
    for token in raw.split_whitespace() {
        let status: Status = token
            .parse()
            .map_err(|e| Error::configuration(format!("{key}: {e}")))?;
        if !statuses.contains(&status) {
            statuses.push(status);
        }
    }

    if statuses.is_empty() {
        return Err(Error::configuration(format!("{key} must list at least one status")));
    }
    Ok(statuses)
}

/// `[ERROR, WARNING]`
pub(crate) fn format_statuses(statuses: &[Status]) -> String {
    let names: Vec<String> = statuses.iter().map(Status::to_string).collect();
    format!("[{}]", names.join(", "))
}

/// Whether `timestamp` falls in the silent window opened by the last raise
///
/// Clears `last_raised` once the window is over. A window ending past the
/// representable range never closes.
pub(crate) fn is_silenced(
    last_raised: &mut Option<DateTime<Utc>>,
    silent_period: Duration,
    timestamp: DateTime<Utc>,
) -> bool {
    let window_end = last_raised.map(|raised| raised.checked_add_signed(silent_period));
    match window_end {
        Some(None) => true,
        Some(Some(end)) if end > timestamp => true,
        _ => {
            *last_raised = None;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_statuses() {
        let props = Properties::new().with("statuses", "error  Warning ERROR");
        assert_eq!(
            parse_statuses(&props, "statuses").unwrap(),
            vec![Status::Error, Status::Warning]
        );

        let props = Properties::new().with("statuses", "ERROR BROKEN");
        assert!(parse_statuses(&props, "statuses").unwrap_err().is_configuration());

        let props = Properties::new().with("statuses", "   ");
        assert!(parse_statuses(&props, "statuses").is_err());

        assert!(parse_statuses(&Properties::new(), "statuses").is_err());
    }

    #[test]
    fn test_format_statuses() {
        assert_eq!(format_statuses(&[Status::Error, Status::Warning]), "[ERROR, WARNING]");
    }

    #[test]
    fn test_silence_window() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let mut last_raised = Some(t0);

        assert!(is_silenced(&mut last_raised, Duration::minutes(5), t0 + Duration::minutes(4)));
        assert_eq!(last_raised, Some(t0));

        assert!(!is_silenced(&mut last_raised, Duration::minutes(5), t0 + Duration::minutes(5)));
        assert_eq!(last_raised, None);

        let mut never = None;
        assert!(!is_silenced(&mut never, Duration::zero(), t0));
    }

    #[test]
    fn test_silence_window_ending_out_of_range() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let mut last_raised = Some(t0);

        assert!(is_silenced(&mut last_raised, Duration::weeks(1_000_000_000), t0));
        assert_eq!(last_raised, Some(t0));
    }
}
