//! Driver feeding metrics through every matching monitor

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::cache::Cache;
use crate::components::{ComponentRegistry, EntityState};
use crate::config::MonitorsConfig;
use crate::error::Result;
use crate::models::{AnalysisResult, Metric, Notification};
use crate::properties::Properties;

use super::{EntityKey, Monitor, PropertiesSource, StateStore};

/// Monitors built from one load of the properties source
#[derive(Debug, Default)]
pub struct Monitors {
    monitors: BTreeMap<String, Monitor>,
    failures: BTreeMap<String, String>,
}

impl Monitors {
    /// Build every `monitor.<id>` defined in `properties`
    ///
    /// A monitor that fails to build is logged and skipped, the error is kept
    /// in [`Monitors::failures`].
    pub fn build(properties: &Properties, registry: &ComponentRegistry) -> Self {
        let mut built = Self::default();

        for id in properties.ids("monitor") {
            let props = properties.sub_properties(&format!("monitor.{id}"));
            match Monitor::build(&id, &props, registry) {
                Ok(monitor) => {
                    built.monitors.insert(id, monitor);
                }
                Err(e) => {
                    error!(monitor = %id, error = %e, "Monitor skipped");
                    built.failures.insert(id, e.to_string());
                }
            }
        }

        info!(
            monitors = built.monitors.len(),
            failures = built.failures.len(),
            "Monitors loaded"
        );
        built
    }

    /// Monitor `id`
    pub fn get(&self, id: &str) -> Option<&Monitor> {
        self.monitors.get(id)
    }

    /// Every monitor, by id
    pub fn iter(&self) -> impl Iterator<Item = &Monitor> {
        self.monitors.values()
    }

    /// Number of monitors built
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    /// Whether no monitor was built
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Build errors of skipped monitors, by monitor id
    pub fn failures(&self) -> &BTreeMap<String, String> {
        &self.failures
    }
}

/// State store failure for one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFailure {
    /// Entity whose state could not be loaded or saved
    pub entity: EntityKey,
    /// Store error
    pub error: String,
}

/// Results and notifications produced by some metrics
#[derive(Debug, Clone, Default)]
pub struct ProcessReport {
    /// One result per metric and matching monitor
    pub results: Vec<AnalysisResult>,
    /// Raised notifications
    pub notifications: Vec<Notification>,
    /// Entities skipped because their state could not be loaded, or
    /// processed but whose new state could not be saved
    pub failures: Vec<EntityFailure>,
}

impl ProcessReport {
    fn extend(&mut self, other: ProcessReport) {
        self.results.extend(other.results);
        self.notifications.extend(other.notifications);
        self.failures.extend(other.failures);
    }
}

/// Processes metrics against the current monitors, persisting entity state
pub struct Engine {
    monitors: Cache<Monitors>,
    store: Arc<dyn StateStore>,
}

impl Engine {
    /// Create an engine reloading monitors from `source` every `config.cache_ttl`
    pub fn new(
        registry: Arc<ComponentRegistry>,
        source: Arc<dyn PropertiesSource>,
        store: Arc<dyn StateStore>,
        config: &MonitorsConfig,
    ) -> Self {
        let monitors = Cache::with_expiration(config.cache_ttl, move || {
            let properties = source.load()?;
            Ok(Monitors::build(&properties, &registry))
        });

        Self { monitors, store }
    }

    /// Current monitors, rebuilt when expired
    pub fn monitors(&self) -> Result<Arc<Monitors>> {
        self.monitors.get()
    }

    /// Rebuild monitors on next use
    pub fn reload(&self) {
        self.monitors.reset();
    }

    /// Process one metric with every monitor it matches
    ///
    /// Store errors do not stop processing: an entity whose state cannot be
    /// loaded is skipped, one whose state cannot be saved still reports its
    /// result and notifications. Both land in [`ProcessReport::failures`].
    pub fn process(&self, metric: &Metric) -> Result<ProcessReport> {
        let monitors = self.monitors()?;
        let mut report = ProcessReport::default();

        for monitor in monitors.iter().filter(|m| m.matches(metric)) {
            let key = EntityKey::new(monitor.id(), metric.attributes.clone());
            let state = match self.load_state(&key) {
                Ok(state) => state,
                Err(e) => {
                    error!(entity = %key, error = %e, "Entity skipped, state cannot be loaded");
                    report.failures.push(EntityFailure {
                        entity: key,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let outcome = monitor.process(metric, state);

            if let Err(e) = self.save_state(&key, &outcome.state) {
                error!(entity = %key, error = %e, "State cannot be saved");
                report.failures.push(EntityFailure {
                    entity: key.clone(),
                    error: e.to_string(),
                });
            }

            for notification in &outcome.notifications {
                info!(
                    entity = %key,
                    notificator = %notification.notificator_id,
                    reason = %notification.reason,
                    "Notification raised"
                );
            }

            report.results.push(outcome.result);
            report.notifications.extend(outcome.notifications);
        }

        debug!(
            timestamp = %metric.timestamp,
            results = report.results.len(),
            "Metric processed"
        );
        Ok(report)
    }

    /// Process metrics in order
    pub fn process_all<'a, I>(&self, metrics: I) -> Result<ProcessReport>
    where
        I: IntoIterator<Item = &'a Metric>,
    {
        let mut report = ProcessReport::default();
        for metric in metrics {
            report.extend(self.process(metric)?);
        }
        Ok(report)
    }

    fn save_state(&self, key: &EntityKey, state: &EntityState) -> Result<()> {
        if state.is_empty() {
            self.store.remove(key)
        } else {
            self.store.save(key, state.to_bytes()?)
        }
    }

    fn load_state(&self, key: &EntityKey) -> Result<EntityState> {
        let Some(blob) = self.store.load(key)? else {
            return Ok(EntityState::default());
        };

        match EntityState::from_bytes(&blob) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(entity = %key, error = %e, "Discarding unreadable state");
                Ok(EntityState::default())
            }
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("monitors", &self.monitors)
            .finish_non_exhaustive()
    }
}
