use thiserror::Error;

use crate::{PutCondition, ResourceId, Version};

/// Errors that can occur when interacting with the event log.
#[derive(Debug, Error)]
pub enum EventLogError {
    /// A conditional put was rejected because the guarded row already exists.
    #[error("Conditional check failed for resource {id} event {number}: {condition}")]
    ConditionalCheckFailed {
        id: ResourceId,
        number: Version,
        condition: PutCondition,
    },

    /// The configured table name is not a plain SQL identifier.
    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for event log operations.
pub type Result<T> = std::result::Result<T, EventLogError>;
