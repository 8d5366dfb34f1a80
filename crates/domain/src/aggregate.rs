//! Core aggregate and domain event traits.

use chrono::{DateTime, Utc};
use event_store::{Event, Version};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::DomainError;

/// Trait for the event types an aggregate accepts.
///
/// Implemented by a serde enum tagged internally on `"type"`, one variant
/// per event type. [`EVENT_TYPES`](DomainEvent::EVENT_TYPES) is the table of
/// tags the aggregate has handlers for; a stored or committed event whose
/// tag is not listed is rejected with `IllegalEventArgument`.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Every tag this event type can decode, one per variant.
    const EVENT_TYPES: &'static [&'static str];

    /// Returns the event type tag.
    fn event_type(&self) -> &'static str;

    /// Name of the handler expected for an event type, e.g. `onDeployCreated`.
    fn handler_name(event_type: &str) -> String {
        format!("on{event_type}")
    }

    /// Decodes a stored or candidate event into this type.
    fn decode(event: &Event) -> Result<Self, DomainError> {
        if !Self::EVENT_TYPES.contains(&event.event_type.as_str()) {
            return Err(DomainError::IllegalEventArgument {
                event_type: event.event_type.clone(),
                handler: Self::handler_name(&event.event_type),
            });
        }
        Ok(serde_json::from_value(event.to_tagged())?)
    }

    /// Encodes this event as the event with the given number.
    fn encode(&self, number: Version) -> Result<Event, DomainError> {
        Ok(Event::from_tagged(number, serde_json::to_value(self)?)?)
    }
}

/// Envelope details handed to a handler alongside the decoded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMeta {
    /// The event's number.
    pub number: Version,

    /// When the event was created.
    pub created: DateTime<Utc>,

    /// The aggregate's version before this event is applied.
    pub version: Version,
}

/// Trait for the derived state of an event-sourced aggregate.
///
/// The implementing type holds only the fields derived from events; identity,
/// version and persistence belong to [`AggregateRoot`](crate::AggregateRoot).
/// Its serialized form is what callers see, flattened next to `id` and
/// `version`, so it must serialize as a map without those two keys.
pub trait Aggregate: Default + Clone + Serialize + Send + Sync + Sized {
    /// The type of events this aggregate consumes.
    type Event: DomainEvent;

    /// The error a handler returns for an illegal transition.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Applies one event, updating the derived fields.
    ///
    /// Must be deterministic. Must refuse, without changing any field, an
    /// event that is not a legal transition from the current state.
    fn apply(&mut self, event: &Self::Event, meta: &EventMeta) -> Result<(), Self::Error>;
}
