//! Monitors wire a filter, an optional aggregation, an analysis and
//! notificators into the per-entity processing pipeline

mod engine;
mod filter;
mod render;
mod source;
mod store;

pub use engine::{Engine, EntityFailure, Monitors, ProcessReport};
pub use filter::MetricFilter;
pub use render::{render_message, repeat_for_entries, DEFAULT_MESSAGE_TEMPLATE};
pub use source::{FileSource, PropertiesSource, StaticSource};
pub use store::{EntityKey, InMemoryStateStore, StateStore};

use std::collections::BTreeMap;

use chrono::Duration;
use tracing::{debug, warn};

use crate::aggregation::{check_compatible, Aggregation, AggregationWindowState, Aggregations};
use crate::analysis::{Analyses, Analysis};
use crate::components::{ComponentRegistry, ComponentState, EntityState};
use crate::error::Result;
use crate::models::{AnalysisResult, DatedValue, Metric, Notification, Value};
use crate::notificator::{process_with_state, Notificator, Notificators};
use crate::properties::{Properties, TYPE_KEY};

const DEFAULT_AGGREGATION_PERIOD_MINUTES: i64 = 5;

/// Aggregation applied to the recent values of an entity
#[derive(Debug)]
struct WindowedAggregation {
    aggregation: Box<dyn Aggregation>,
    period: Duration,
}

/// Notificator with its message template
#[derive(Debug)]
struct MonitorNotificator {
    notificator: Box<dyn Notificator>,
    message: Option<String>,
}

/// Result of processing one metric for one entity
#[derive(Debug, Clone)]
pub struct MonitorOutcome {
    /// Result of the analysis
    pub result: AnalysisResult,
    /// Notifications raised
    pub notifications: Vec<Notification>,
    /// State to persist for the entity
    pub state: EntityState,
}

/// A configured monitor
///
/// Holds configured prototypes only. Each call to [`Monitor::process`] works
/// on copies loaded with the state of the processed entity, so one monitor
/// serves any number of entities.
#[derive(Debug)]
pub struct Monitor {
    id: String,
    filter: MetricFilter,
    aggregation: Option<WindowedAggregation>,
    analysis: Box<dyn Analysis>,
    notificators: BTreeMap<String, MonitorNotificator>,
    tags: BTreeMap<String, String>,
    warnings: Vec<String>,
}

impl Monitor {
    /// Build monitor `id` from its properties (keys without the `monitor.<id>.` prefix)
    pub fn build(id: &str, properties: &Properties, registry: &ComponentRegistry) -> Result<Self> {
        let filter = MetricFilter::from_properties(&properties.sub_properties("filter"))?;

        let analysis_props = properties.sub_properties("analysis");
        let analysis = registry.build_with_id::<Analyses>(id, &analysis_props)?;

        let aggregation_props = properties.sub_properties("aggregation");
        let aggregation = if aggregation_props.is_type_defined() {
            let period = aggregation_props.get_duration(
                "period",
                Duration::minutes(DEFAULT_AGGREGATION_PERIOD_MINUTES),
            )?;
            registry
                .build_optional::<Aggregations>(Some(&aggregation_props))?
                .map(|aggregation| WindowedAggregation {
                    aggregation,
                    period,
                })
        } else {
            None
        };

        if let Some(windowed) = &aggregation {
            check_compatible(
                aggregation_props.get_property(TYPE_KEY).unwrap_or_default(),
                windowed.aggregation.return_type(),
                analysis_props.get_property(TYPE_KEY).unwrap_or_default(),
                analysis.input_type(),
            )?;
        }

        let tag_props = properties.sub_properties("tags");
        let tags = tag_props
            .keys()
            .filter_map(|key| {
                tag_props
                    .get_property(key)
                    .map(|value| (key.to_string(), value.to_string()))
            })
            .collect();

        let mut notificators = BTreeMap::new();
        for notificator_id in properties.ids("notificator") {
            let props = properties.sub_properties(&format!("notificator.{notificator_id}"));
            let message = props.get_property("message").map(str::to_string);
            let notificator = registry.build_with_id::<Notificators>(&notificator_id, &props)?;

            notificators.insert(
                notificator_id,
                MonitorNotificator {
                    notificator,
                    message,
                },
            );
        }

        for prefix in ["filter", "analysis", "tags", "notificator"] {
            properties.consume_prefix(prefix);
        }
        if aggregation.is_some() {
            properties.consume_prefix("aggregation");
        }
        let warnings = properties.warnings_if_not_all_properties_used();
        for warning in &warnings {
            warn!(monitor = id, "{warning}");
        }

        debug!(
            monitor = id,
            notificators = notificators.len(),
            aggregated = aggregation.is_some(),
            "Monitor built"
        );

        Ok(Self {
            id: id.to_string(),
            filter,
            aggregation,
            analysis,
            notificators,
            tags,
            warnings,
        })
    }

    /// Monitor id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Tags attached to results and notifications
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Ids of the configured notificators
    pub fn notificator_ids(&self) -> impl Iterator<Item = &str> {
        self.notificators.keys().map(String::as_str)
    }

    /// Properties that were set but not used
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Whether this monitor applies to `metric`
    pub fn matches(&self, metric: &Metric) -> bool {
        self.filter.matches(metric)
    }

    /// Process `metric` for the entity whose persisted state is `state`
    pub fn process(&self, metric: &Metric, mut state: EntityState) -> MonitorOutcome {
        let timestamp = metric.timestamp;

        let value = match &self.aggregation {
            Some(windowed) => self.aggregate(windowed, metric, &mut state),
            None => metric.value.clone(),
        };

        let mut analysis = self.analysis.boxed_clone();
        analysis.load(state.analysis.take());
        let mut result = self.analyze(analysis.as_mut(), metric, &value);
        state.analysis = analysis.save();

        result.monitor_id = Some(self.id.clone());
        result.timestamp = timestamp;
        result.analyzed_value = Some(value);
        result.tags = self.tags.clone();

        debug!(
            monitor = %self.id,
            status = %result.status,
            reason = %result.reason,
            "Metric analysed"
        );

        let mut previous_states = std::mem::take(&mut state.notificators);
        let mut notifications = Vec::new();

        for (notificator_id, configured) in &self.notificators {
            let mut notificator = configured.notificator.boxed_clone();
            let prior = previous_states.remove(notificator_id);

            let (raised, saved) =
                process_with_state(notificator.as_mut(), result.status, timestamp, prior);

            if let Some(saved) = saved {
                state.notificators.insert(notificator_id.clone(), saved);
            }

            if let Some(notification) = raised {
                notifications.push(self.complete(notification, configured, metric, &result));
            }
        }

        MonitorOutcome {
            result,
            notifications,
            state,
        }
    }

    fn aggregate(&self, windowed: &WindowedAggregation, metric: &Metric, state: &mut EntityState) -> Value {
        let mut values = match state.aggregation.take() {
            Some(ComponentState::AggregationWindow(window)) => window.values,
            _ => Vec::new(),
        };

        let oldest_kept = metric.timestamp.checked_sub_signed(windowed.period);
        values.retain(|dv| {
            dv.timestamp <= metric.timestamp
                && oldest_kept.map_or(true, |oldest| dv.timestamp >= oldest)
        });

        let accepted = windowed.aggregation.input_type();
        if accepted.accepts(metric.value.value_type()) && !metric.value.is_exception() {
            values.push(DatedValue {
                timestamp: metric.timestamp,
                value: metric.value.clone(),
            });
        } else {
            debug!(
                monitor = %self.id,
                value = %metric.value,
                "Value not accepted by aggregation"
            );
        }

        let aggregated = windowed.aggregation.aggregate(&values, metric.timestamp);
        state.aggregation = Some(ComponentState::AggregationWindow(AggregationWindowState {
            values,
        }));

        match aggregated {
            Value::Exception(_) => aggregated,
            other => Value::Aggregated(Box::new(other)),
        }
    }

    fn analyze(&self, analysis: &mut dyn Analysis, metric: &Metric, value: &Value) -> AnalysisResult {
        if let Value::Exception(msg) = value {
            return AnalysisResult::exception(msg.clone());
        }

        let accepted = analysis.input_type();
        if !accepted.accepts(value.value_type()) {
            return AnalysisResult::exception(format!(
                "analysis of monitor {} expects {accepted:?} values, received {value}",
                self.id
            ));
        }

        analysis.process(metric.timestamp, value)
    }

    fn complete(
        &self,
        mut notification: Notification,
        configured: &MonitorNotificator,
        metric: &Metric,
        result: &AnalysisResult,
    ) -> Notification {
        notification.monitor_id = self.id.clone();
        notification.tags = self.tags.clone();
        notification.metric_attributes = metric.attributes.clone();

        let template = configured
            .message
            .as_deref()
            .unwrap_or(DEFAULT_MESSAGE_TEMPLATE);
        notification.message = render_message(template, &notification, result);

        notification
    }
}
