//! Rendering of notification messages

use std::collections::BTreeMap;

use crate::models::{AnalysisResult, Notification};
use crate::template::{Template, NULL_TEXT};

/// Message used when a notificator does not configure one
pub const DEFAULT_MESSAGE_TEMPLATE: &str = "Monitor <monitor_id> (<notificator_id>): <reason>";

/// Render `template` for `notification`, raised on `result`
///
/// `<tags>...</tags>` and `<attributes>...</attributes>` repeat their content
/// once per entry, with `<key>` and `<value>` replaced. The template is
/// scanned once: inserted values are never expanded again.
pub fn render_message(template: &str, notification: &Notification, result: &AnalysisResult) -> String {
    let null = || NULL_TEXT.to_string();

    let placeholder = |name: &str, sub: Option<&str>| match (name, sub) {
        ("monitor_id", None) => Some(notification.monitor_id.clone()),
        ("notificator_id", None) => Some(notification.notificator_id.clone()),
        ("datetime", None) => Some(notification.timestamp.to_rfc3339()),
        ("status", None) => Some(result.status.to_string()),
        ("reason", None) => Some(notification.reason.clone()),
        ("value", None) => Some(
            result
                .analyzed_value
                .as_ref()
                .map_or_else(null, ToString::to_string),
        ),
        ("tags", Some(key)) => Some(notification.tags.get(key).cloned().unwrap_or_else(null)),
        ("attribute", Some(key)) => Some(
            notification
                .metric_attributes
                .get(key)
                .cloned()
                .unwrap_or_else(null),
        ),
        ("analysis_param", Some(key)) => Some(
            result
                .analysis_params
                .get(key)
                .map_or_else(null, ToString::to_string),
        ),
        _ => None,
    };

    Template::new(template)
        .replace_all(&["tags", "attributes"], placeholder, |container, fragment| {
            if container == "tags" {
                repeat_for_entries(fragment, &notification.tags)
            } else {
                repeat_for_entries(fragment, &notification.metric_attributes)
            }
        })
        .into_string()
}

/// `fragment` once per entry, joined without separator
pub fn repeat_for_entries(fragment: &str, entries: &BTreeMap<String, String>) -> String {
    entries
        .iter()
        .map(|(key, value)| {
            Template::new(fragment)
                .replace_placeholders(|name, sub| match (name, sub) {
                    ("key", None) => Some(key.clone()),
                    ("value", None) => Some(value.clone()),
                    _ => None,
                })
                .into_string()
        })
        .collect()
}
