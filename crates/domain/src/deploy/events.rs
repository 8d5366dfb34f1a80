//! Deploy domain events.

use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on a deploy aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeployEvent {
    /// Deploy was requested with a specification.
    DeployCreated { specification: String },

    /// Deploy finished successfully.
    DeploySucceeded,

    /// Deploy finished with an error.
    DeployFailed { reason: String },

    /// Deploy was logically deleted.
    DeployDeleted,
}

impl DomainEvent for DeployEvent {
    const EVENT_TYPES: &'static [&'static str] = &[
        "DeployCreated",
        "DeploySucceeded",
        "DeployFailed",
        "DeployDeleted",
    ];

    fn event_type(&self) -> &'static str {
        match self {
            DeployEvent::DeployCreated { .. } => "DeployCreated",
            DeployEvent::DeploySucceeded => "DeploySucceeded",
            DeployEvent::DeployFailed { .. } => "DeployFailed",
            DeployEvent::DeployDeleted => "DeployDeleted",
        }
    }
}

// Convenience constructors for events
impl DeployEvent {
    pub fn created(specification: impl Into<String>) -> Self {
        DeployEvent::DeployCreated {
            specification: specification.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        DeployEvent::DeployFailed {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::{Event, Version};

    #[test]
    fn every_variant_is_registered() {
        let samples = [
            DeployEvent::created("spec"),
            DeployEvent::DeploySucceeded,
            DeployEvent::failed("boom"),
            DeployEvent::DeployDeleted,
        ];
        for sample in samples {
            assert!(DeployEvent::EVENT_TYPES.contains(&sample.event_type()));
        }
    }

    #[test]
    fn decodes_stored_created_event() {
        let event = Event::new(Version::first(), "DeployCreated").with_field("specification", "v1");
        assert_eq!(
            DeployEvent::decode(&event).unwrap(),
            DeployEvent::created("v1")
        );
    }

    #[test]
    fn deleted_event_has_no_payload() {
        let event = DeployEvent::DeployDeleted.encode(Version::new(2)).unwrap();
        assert_eq!(event.event_type, "DeployDeleted");
        assert!(event.payload.is_empty());
    }
}
