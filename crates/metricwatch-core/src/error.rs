//! Error types for metricwatch

use thiserror::Error;

use crate::components::ComponentKind;
use crate::models::ValueType;

/// Result type alias using metricwatch's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for metricwatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Type name not found among variants or extensions
    #[error(
        "{kind}: component type ({type_name}) does not exist, it must be a registered extension or one of: {available:?}"
    )]
    UnknownType {
        kind: ComponentKind,
        type_name: String,
        available: Vec<String>,
    },

    /// Type resolved but the instance could not be constructed
    #[error("{kind}: component of type {type_name} could not be instantiated: {cause}")]
    Construction {
        kind: ComponentKind,
        type_name: String,
        cause: String,
    },

    /// Registration of a name that is already taken (strict registries only)
    #[error("{kind}: a component named {name} is already registered")]
    DuplicateRegistration { kind: ComponentKind, name: String },

    /// Two wired components disagree on the value type
    #[error("Incompatible types: {producer} produces {produced:?} but {consumer} accepts {accepted:?}")]
    IncompatibleTypes {
        producer: String,
        produced: ValueType,
        consumer: String,
        accepted: ValueType,
    },

    /// Persisted state could not be loaded or stored
    #[error("State error: {0}")]
    State(String),

    /// Properties source error
    #[error("Source error: {0}")]
    Source(#[from] config::ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a construction error
    pub fn construction(
        kind: ComponentKind,
        type_name: impl Into<String>,
        cause: impl std::fmt::Display,
    ) -> Self {
        Self::Construction {
            kind,
            type_name: type_name.into(),
            cause: cause.to_string(),
        }
    }

    /// Whether the error was raised while building or configuring a component
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::UnknownType { .. }
                | Self::Construction { .. }
                | Self::DuplicateRegistration { .. }
                | Self::IncompatibleTypes { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_lists_available_names() {
        let err = Error::UnknownType {
            kind: ComponentKind::Analysis,
            type_name: "missing".to_string(),
            available: vec!["fixed-threshold".to_string(), "recent".to_string()],
        };

        let msg = err.to_string();
        assert!(msg.contains("missing"));
        assert!(msg.contains("fixed-threshold"));
        assert!(msg.contains("recent"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_state_error_is_not_configuration() {
        assert!(!Error::state("corrupt blob").is_configuration());
    }
}
