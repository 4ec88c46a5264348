//! Persistence of per-entity state

use std::collections::BTreeMap;
use std::fmt;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Identity of a monitored entity: one monitor applied to one attribute set
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    /// Monitor id
    pub monitor_id: String,
    /// Attributes of the metrics of this entity
    pub attributes: BTreeMap<String, String>,
}

impl EntityKey {
    /// Create a new key
    pub fn new(monitor_id: impl Into<String>, attributes: BTreeMap<String, String>) -> Self {
        Self {
            monitor_id: monitor_id.into(),
            attributes,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.monitor_id)?;
        for (i, (key, value)) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("}")
    }
}

/// Storage of opaque per-entity state blobs
///
/// Implementations are called synchronously from the processing path.
pub trait StateStore: Send + Sync {
    /// Blob saved for `key`, if any
    fn load(&self, key: &EntityKey) -> Result<Option<Vec<u8>>>;

    /// Replace the blob of `key`
    fn save(&self, key: &EntityKey, blob: Vec<u8>) -> Result<()>;

    /// Forget `key`
    fn remove(&self, key: &EntityKey) -> Result<()>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    states: DashMap<EntityKey, Vec<u8>>,
}

impl InMemoryStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Stored keys, sorted
    pub fn keys(&self) -> Vec<EntityKey> {
        let mut keys: Vec<EntityKey> = self.states.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

impl StateStore for InMemoryStateStore {
    fn load(&self, key: &EntityKey) -> Result<Option<Vec<u8>>> {
        Ok(self.states.get(key).map(|blob| blob.value().clone()))
    }

    fn save(&self, key: &EntityKey, blob: Vec<u8>) -> Result<()> {
        self.states.insert(key.clone(), blob);
        Ok(())
    }

    fn remove(&self, key: &EntityKey) -> Result<()> {
        self.states.remove(key);
        Ok(())
    }
}
