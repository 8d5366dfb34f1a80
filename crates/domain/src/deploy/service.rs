//! Deploy service providing a simplified API for deploy operations.

use common::ResourceId;
use event_store::{Event, EventLog};

use super::{Deploy, DeployEvent};
use crate::aggregate::DomainEvent;
use crate::error::DomainError;
use crate::repository::Repository;
use crate::root::AggregateRoot;

/// Service for managing deploys.
///
/// Every write loads the deploy, claims the next event number and commits
/// a single event. A concurrent writer surfaces as
/// [`DomainError::ConcurrencyConflict`]; it is never retried here.
pub struct DeployService<L> {
    repository: Repository<Deploy, L>,
}

impl<L: EventLog + Clone> DeployService<L> {
    /// Creates a new deploy service over the given log.
    pub fn new(log: L) -> Self {
        Self {
            repository: Repository::new(log),
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &Repository<Deploy, L> {
        &self.repository
    }

    /// Creates a new deploy with a generated id.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, specification: String) -> Result<AggregateRoot<Deploy, L>, DomainError> {
        let mut deploy = self.repository.create();
        let event = DeployEvent::created(specification).encode(deploy.next_number())?;
        deploy.commit(event).await?;

        tracing::info!(id = %deploy.id(), "deploy created");
        Ok(deploy)
    }

    /// Loads a deploy, including a deleted one.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: &ResourceId) -> Result<Option<AggregateRoot<Deploy, L>>, DomainError> {
        self.repository.find_one(id).await
    }

    /// Lists every deploy that has not been deleted.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<AggregateRoot<Deploy, L>>, DomainError> {
        let mut deploys = self.repository.find_all().await?;
        deploys.retain(|deploy| !deploy.state().is_deleted());
        Ok(deploys)
    }

    /// Returns the raw event stream of a deploy, or `None` if it does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn events(&self, id: &ResourceId) -> Result<Option<Vec<Event>>, DomainError> {
        let events = self.repository.reference(id.clone()).events().await?;
        Ok((!events.is_empty()).then_some(events))
    }

    /// Marks a running deploy as successful.
    #[tracing::instrument(skip(self))]
    pub async fn succeed(&self, id: &ResourceId) -> Result<AggregateRoot<Deploy, L>, DomainError> {
        self.record(id, DeployEvent::DeploySucceeded).await
    }

    /// Marks a running deploy as failed.
    #[tracing::instrument(skip(self))]
    pub async fn fail(
        &self,
        id: &ResourceId,
        reason: String,
    ) -> Result<AggregateRoot<Deploy, L>, DomainError> {
        self.record(id, DeployEvent::failed(reason)).await
    }

    /// Logically deletes a deploy. Its events are kept.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &ResourceId) -> Result<AggregateRoot<Deploy, L>, DomainError> {
        self.record(id, DeployEvent::DeployDeleted).await
    }

    async fn record(
        &self,
        id: &ResourceId,
        event: DeployEvent,
    ) -> Result<AggregateRoot<Deploy, L>, DomainError> {
        let mut deploy = self.repository.get(id).await?;
        let event = event.encode(deploy.next_number())?;
        deploy.commit(event).await?;
        Ok(deploy)
    }
}

impl<L: Clone> Clone for DeployService<L> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
        }
    }
}
