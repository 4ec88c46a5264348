//! # metricwatch
//!
//! Metric monitoring engine with pluggable analyses and stateful notificators.
//!
//! Monitors are declared as dotted properties. Each one names, by type, the
//! analysis computing a status for every observed value, an optional
//! aggregation applied first, and the notificators deciding when a status
//! history deserves a notification.
//!
//! ## Architecture
//!
//! - **Components**: registry building analyses, aggregations and
//!   notificators from their configured type name
//! - **Monitor**: per-entity pipeline with persisted state
//! - **Cache**: expiring single value cache for monitor definitions
//! - **Template**: rendering of notification messages
//!
//! ## Quick Start
//!
//! ```bash
//! # Check monitor definitions
//! metricwatch --monitors monitors.toml validate
//!
//! # Replay recorded metrics
//! metricwatch --monitors monitors.toml replay --metrics metrics.jsonl
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod aggregation;
pub mod analysis;
pub mod cache;
pub mod components;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod notificator;
pub mod properties;
pub mod template;

pub use config::EngineConfig;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::cache::Cache;
    pub use crate::components::{Component, ComponentRegistry, ComponentState, RegistrationMode};
    pub use crate::config::EngineConfig;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::monitor::{Engine, Monitor, PropertiesSource, StateStore};
    pub use crate::properties::Properties;
    pub use crate::template::Template;
}
