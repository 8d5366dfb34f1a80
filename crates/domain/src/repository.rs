//! Lookup of aggregates by id, and listing of every aggregate in a log.

use std::collections::HashMap;
use std::marker::PhantomData;

use common::ResourceId;
use event_store::{Event, EventLog, EventRecord};
use futures_util::TryStreamExt;

use crate::aggregate::Aggregate;
use crate::error::DomainError;
use crate::root::AggregateRoot;

/// Builds hydrated [`AggregateRoot`]s of one aggregate kind from a log.
///
/// The aggregate kind is a type parameter; an empty instance is built with
/// `A::default()`.
pub struct Repository<A, L> {
    log: L,
    _phantom: PhantomData<fn() -> A>,
}

impl<A, L> Repository<A, L>
where
    A: Aggregate,
    L: EventLog + Clone,
{
    /// Creates a repository over the given log.
    pub fn new(log: L) -> Self {
        Self {
            log,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying log.
    pub fn log(&self) -> &L {
        &self.log
    }

    /// Returns an empty aggregate for a new resource with a random id.
    pub fn create(&self) -> AggregateRoot<A, L> {
        AggregateRoot::new(self.log.clone())
    }

    /// Returns an empty, not yet hydrated aggregate for a known id.
    pub fn reference(&self, id: impl Into<ResourceId>) -> AggregateRoot<A, L> {
        AggregateRoot::with_id(id, self.log.clone())
    }

    /// Loads an aggregate, returning `None` if no events exist for `id`.
    #[tracing::instrument(skip(self), fields(aggregate = A::aggregate_type()))]
    pub async fn find_one(
        &self,
        id: &ResourceId,
    ) -> Result<Option<AggregateRoot<A, L>>, DomainError> {
        let mut aggregate = self.reference(id.clone());
        aggregate.hydrate().await?;

        if aggregate.is_new() {
            tracing::debug!("resource not found");
            Ok(None)
        } else {
            Ok(Some(aggregate))
        }
    }

    /// Loads an aggregate, failing with `ResourceNotFound` if no events exist.
    pub async fn get(&self, id: &ResourceId) -> Result<AggregateRoot<A, L>, DomainError> {
        self.find_one(id)
            .await?
            .ok_or_else(|| DomainError::ResourceNotFound(id.clone()))
    }

    /// Loads every aggregate in the log with a single scan.
    ///
    /// Rows are grouped by id and each group hydrates its own aggregate, in
    /// number order. The order of the returned aggregates is unspecified.
    #[tracing::instrument(skip(self), fields(aggregate = A::aggregate_type()))]
    pub async fn find_all(&self) -> Result<Vec<AggregateRoot<A, L>>, DomainError> {
        let mut rows = self.log.scan().await?;
        let mut streams: HashMap<ResourceId, Vec<Event>> = HashMap::new();

        while let Some(EventRecord { id, event }) = rows.try_next().await? {
            streams.entry(id).or_default().push(event);
        }

        tracing::debug!(resources = streams.len(), "scan grouped");

        streams
            .into_iter()
            .map(|(id, events)| {
                let mut aggregate = self.reference(id);
                aggregate.hydrate_from(events)?;
                Ok(aggregate)
            })
            .collect()
    }
}

impl<A, L: Clone> Clone for Repository<A, L> {
    fn clone(&self) -> Self {
        Self {
            log: self.log.clone(),
            _phantom: PhantomData,
        }
    }
}
