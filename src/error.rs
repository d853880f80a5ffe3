//! Error types for the onboarding service.

use uuid::Uuid;

/// Top-level error type. Domain errors map 1:1 onto the caller-visible
/// failure modes of the lifecycle engine; infrastructure errors wrap the
/// config and store layers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Onboarding record already exists for employee {employee}")]
    Duplicate { employee: String },

    #[error("Step {step_id} cannot start: dependencies not satisfied ({unmet:?})")]
    DependencyNotSatisfied {
        step_id: String,
        unmet: Vec<String>,
    },

    #[error("Step {step_id} cannot transition from {from} to {to}")]
    IllegalTransition {
        step_id: String,
        from: String,
        to: String,
    },

    #[error("Actor {actor} is not authorized for this operation")]
    Unauthorized { actor: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Record {id} was modified concurrently; retries exhausted")]
    Conflict { id: Uuid },
}

impl Error {
    /// Not-found helper for onboarding records.
    pub fn record_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "Onboarding record",
            id: id.to_string(),
        }
    }

    /// Not-found helper for steps within a record.
    pub fn step_not_found(step_id: &str) -> Self {
        Self::NotFound {
            entity: "Step",
            id: step_id.to_string(),
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Persistence-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Unique constraint violated for employee {0}")]
    DuplicateEmployee(String),

    #[error("Version conflict writing record {0}")]
    VersionConflict(Uuid),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
