//! Pluggable components
//!
//! A capability (analysis, aggregation, notificator) is a trait extending
//! [`Component`]; its variants are registered by name in the
//! [`ComponentRegistry`] and built from [`Properties`] at runtime.

mod registry;
mod state;

pub use registry::{ComponentRegistry, Factory, RegistrationMode, TypeTable};
pub use state::{ComponentState, EntityState};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::properties::Properties;

/// Axis of extensibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Turns an observation into a status
    Analysis,
    /// Reduces a window of values into one value
    Aggregation,
    /// Decides when a status history deserves a notification
    Notificator,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComponentKind::Analysis => "analysis",
            ComponentKind::Aggregation => "aggregation",
            ComponentKind::Notificator => "notificator",
        };
        f.write_str(s)
    }
}

/// Contract shared by every variant of every capability
pub trait Component: Send + Sync + fmt::Debug {
    /// Assign the identifier of the entity this instance serves
    fn set_id(&mut self, _id: &str) {}

    /// Read and validate configuration
    ///
    /// Called by the registry before the instance is handed out.
    fn configure(&mut self, properties: &Properties) -> Result<()>;

    /// Snapshot of the internal state to persist, `None` when stateless
    fn save(&self) -> Option<ComponentState> {
        None
    }

    /// Restore a snapshot produced by [`Component::save`]
    ///
    /// States of another shape are ignored and the component starts fresh.
    fn load(&mut self, _state: Option<ComponentState>) {}
}

/// Type-level handle on a capability, used to pick the registry table
pub trait Capability: 'static {
    /// Trait object built for this capability
    type Component: ?Sized + Component;

    /// Which capability this is
    const KIND: ComponentKind;

    /// Table of this capability in `registry`
    fn table(registry: &ComponentRegistry) -> &TypeTable<Self::Component>;

    /// Mutable table of this capability in `registry`
    fn table_mut(registry: &mut ComponentRegistry) -> &mut TypeTable<Self::Component>;
}
