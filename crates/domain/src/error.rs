//! Domain error types.

use common::ResourceId;
use event_store::{EventLogError, Version};
use thiserror::Error;

/// Errors that can occur during aggregate operations.
///
/// An aggregate instance whose `commit` failed keeps the state it had after
/// the commit's own re-hydration. It is safe to hydrate it again and retry,
/// but it must not be used as if the failed event had been applied.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The caller claimed an event number that is not the next one in the
    /// stream. Recover by re-hydrating and committing with the right number.
    #[error(
        "The event is not being applied to resource {id} with an appropriate version: expected event number {expected}, got {actual}"
    )]
    IllegalEventNumberArgument {
        id: ResourceId,
        expected: Version,
        actual: Version,
    },

    /// The aggregate has no handler for this event type. A programming error,
    /// not worth retrying.
    #[error("Unsupported event detected for event type {event_type}. Please implement {handler}")]
    IllegalEventArgument { event_type: String, handler: String },

    /// The aggregate's handler refused the event given its current state.
    #[error("Failed to apply event {number} ({event_type}): {source}")]
    InvalidTransition {
        event_type: String,
        number: Version,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Another writer committed this event number first.
    #[error("Concurrency conflict for resource {id}: event {number} was already committed")]
    ConcurrencyConflict { id: ResourceId, number: Version },

    /// No events exist for this id.
    #[error("The resource with id {0} does not exist")]
    ResourceNotFound(ResourceId),

    /// An error occurred in the event log.
    #[error("Event log error: {0}")]
    EventLog(#[from] EventLogError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true if a retry after re-hydrating may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::ConcurrencyConflict { .. } | DomainError::IllegalEventNumberArgument { .. }
        )
    }
}
