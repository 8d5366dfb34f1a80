//! The aggregate root: identity, version and persistence around an
//! [`Aggregate`]'s derived state.

use common::{Resource, ResourceId};
use event_store::{Event, EventLog, EventLogError, EventRecord, PutCondition, Version};
use serde::{Serialize, Serializer};

use crate::aggregate::{Aggregate, DomainEvent, EventMeta};
use crate::error::DomainError;

/// One resource's event stream projected into current state.
///
/// Created in memory at version 0, brought up to date with
/// [`hydrate`](Self::hydrate), and extended one event at a time with
/// [`commit`](Self::commit). `version` always equals the number of the last
/// applied event.
pub struct AggregateRoot<A: Aggregate, L> {
    id: ResourceId,
    version: Version,
    state: A,
    log: L,
}

/// Caller-facing view of an aggregate: `id`, `version` and the derived
/// fields. The log handle and its table never appear here.
#[derive(Debug, Serialize)]
pub struct AggregateView<'a, A> {
    pub id: &'a ResourceId,
    pub version: Version,
    #[serde(flatten)]
    pub state: &'a A,
}

impl<A: Aggregate, L> AggregateRoot<A, L> {
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Number of events applied so far.
    pub fn version(&self) -> Version {
        self.version
    }

    /// The derived state.
    pub fn state(&self) -> &A {
        &self.state
    }

    /// The number the next committed event must carry.
    pub fn next_number(&self) -> Version {
        self.version.next()
    }

    /// Returns true if no event has been applied.
    pub fn is_new(&self) -> bool {
        self.version == Version::initial()
    }

    /// Returns the caller-facing view of this aggregate.
    pub fn view(&self) -> AggregateView<'_, A> {
        AggregateView {
            id: &self.id,
            version: self.version,
            state: &self.state,
        }
    }

    /// Serializes the caller-facing view to JSON.
    pub fn to_json(&self) -> Result<serde_json::Value, DomainError> {
        Ok(serde_json::to_value(self.view())?)
    }
}

impl<A: Aggregate, L: EventLog> AggregateRoot<A, L> {
    /// Creates an aggregate for a new resource with a random id.
    pub fn new(log: L) -> Self {
        Self::with_id(ResourceId::new(), log)
    }

    /// Creates an aggregate referencing a known resource id.
    ///
    /// Nothing is loaded until [`hydrate`](Self::hydrate) is called.
    pub fn with_id(id: impl Into<ResourceId>, log: L) -> Self {
        Self {
            id: id.into(),
            version: Version::initial(),
            state: A::default(),
            log,
        }
    }

    /// Fetches this resource's persisted events, ascending by number.
    pub async fn events(&self) -> Result<Vec<Event>, DomainError> {
        let records = self.log.query(&self.id).await?;
        Ok(records.into_iter().map(EventRecord::into_event).collect())
    }

    /// Replays persisted events newer than the current version.
    #[tracing::instrument(skip(self), fields(aggregate = A::aggregate_type(), id = %self.id))]
    pub async fn hydrate(&mut self) -> Result<(), DomainError> {
        let events = self.events().await?;
        self.hydrate_from(events)
    }

    /// Replays the given events, skipping any already applied
    /// (`number <= version`).
    ///
    /// Lets a caller resume a partially hydrated instance, or hydrate from
    /// rows it already holds without another round trip.
    pub fn hydrate_from(
        &mut self,
        events: impl IntoIterator<Item = Event>,
    ) -> Result<(), DomainError> {
        let mut fresh: Vec<Event> = events
            .into_iter()
            .filter(|event| event.number > self.version)
            .collect();
        fresh.sort_by_key(|event| event.number);
        self.apply(&fresh)
    }

    /// Applies events in order, advancing the version by one per event.
    ///
    /// Each event must carry the number right after the current version, so
    /// `events` must be sorted ascending with no gap or duplicate. Stops at
    /// the first event that fails; events before it stay applied.
    pub fn apply(&mut self, events: &[Event]) -> Result<(), DomainError> {
        for event in events {
            apply_event(&self.id, &mut self.state, &mut self.version, event)?;
        }
        Ok(())
    }

    /// Appends one event to the resource's stream.
    ///
    /// `event.number` is the caller's claim for the next sequence number.
    /// The aggregate first re-hydrates, then applies the event to a staged
    /// copy of its state, and only then writes it with a conditional put:
    /// - the first event of a resource requires that no row exists for the id;
    /// - any later event requires that no row exists for `(id, number)`;
    /// - a number that does not match the next version is refused without
    ///   writing.
    ///
    /// A rejected put is reported as [`DomainError::ConcurrencyConflict`]. It
    /// is not retried; the instance keeps its pre-commit state and can be
    /// hydrated again before a retry.
    #[tracing::instrument(
        skip(self, event),
        fields(aggregate = A::aggregate_type(), id = %self.id, event_type = %event.event_type, number = %event.number)
    )]
    pub async fn commit(&mut self, event: Event) -> Result<(), DomainError> {
        self.hydrate().await?;

        let mut staged = self.state.clone();
        let mut version = self.version;
        apply_event(&self.id, &mut staged, &mut version, &event)?;

        let number = event.number;
        let condition = if number == Version::first() {
            PutCondition::ResourceAbsent
        } else {
            PutCondition::EventAbsent
        };

        let record = EventRecord::new(self.id.clone(), event);
        match self.log.put(record, condition).await {
            Ok(()) => {}
            Err(EventLogError::ConditionalCheckFailed { .. }) => {
                tracing::warn!(%condition, "event number already taken");
                metrics::counter!("commit_conflicts_total", "aggregate" => A::aggregate_type())
                    .increment(1);
                return Err(DomainError::ConcurrencyConflict {
                    id: self.id.clone(),
                    number,
                });
            }
            Err(err) => return Err(err.into()),
        }

        self.state = staged;
        self.version = version;
        tracing::info!(%condition, "event committed");
        metrics::counter!("events_committed_total", "aggregate" => A::aggregate_type())
            .increment(1);
        Ok(())
    }
}

impl<A: Aggregate, L> Resource for AggregateRoot<A, L> {
    fn id(&self) -> &ResourceId {
        &self.id
    }
}

impl<A: Aggregate, L> Serialize for AggregateRoot<A, L> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.view().serialize(serializer)
    }
}

impl<A: Aggregate + std::fmt::Debug, L> std::fmt::Debug for AggregateRoot<A, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateRoot")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn apply_event<A: Aggregate>(
    id: &ResourceId,
    state: &mut A,
    version: &mut Version,
    event: &Event,
) -> Result<(), DomainError> {
    let domain_event = A::Event::decode(event)?;
    if event.number != version.next() {
        return Err(DomainError::IllegalEventNumberArgument {
            id: id.clone(),
            expected: version.next(),
            actual: event.number,
        });
    }
    let meta = EventMeta {
        number: event.number,
        created: event.created,
        version: *version,
    };

    state
        .apply(&domain_event, &meta)
        .map_err(|source| DomainError::InvalidTransition {
            event_type: event.event_type.clone(),
            number: event.number,
            source: Box::new(source),
        })?;
    *version = version.next();

    tracing::debug!(
        number = %event.number,
        handler = %A::Event::handler_name(&event.event_type),
        "event applied"
    );
    metrics::counter!("events_applied_total", "aggregate" => A::aggregate_type()).increment(1);
    Ok(())
}
