//! Product service: restock and reserve units of a product.

use common::ResourceId;
use event_store::EventLog;

use super::{Product, ProductEvent};
use crate::aggregate::DomainEvent;
use crate::error::DomainError;
use crate::repository::Repository;
use crate::root::AggregateRoot;

/// Service for managing product stock.
///
/// Product ids are chosen by the caller, so the first restock of an unknown
/// id creates the product.
pub struct ProductService<L> {
    repository: Repository<Product, L>,
}

impl<L: EventLog + Clone> ProductService<L> {
    pub fn new(log: L) -> Self {
        Self {
            repository: Repository::new(log),
        }
    }

    pub fn repository(&self) -> &Repository<Product, L> {
        &self.repository
    }

    /// Loads a product, returning `None` if it was never restocked.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: &ResourceId) -> Result<Option<AggregateRoot<Product, L>>, DomainError> {
        self.repository.find_one(id).await
    }

    /// Adds `amount` units to the product's stock.
    #[tracing::instrument(skip(self))]
    pub async fn restock(
        &self,
        id: &ResourceId,
        amount: u32,
    ) -> Result<AggregateRoot<Product, L>, DomainError> {
        self.record(id, ProductEvent::ProductRestocked { amount }).await
    }

    /// Takes one unit from the product's stock.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(&self, id: &ResourceId) -> Result<AggregateRoot<Product, L>, DomainError> {
        self.record(id, ProductEvent::ProductReserved).await
    }

    async fn record(
        &self,
        id: &ResourceId,
        event: ProductEvent,
    ) -> Result<AggregateRoot<Product, L>, DomainError> {
        let mut product = self.repository.reference(id.clone());
        product.hydrate().await?;

        let event = event.encode(product.next_number())?;
        product.commit(event).await?;
        Ok(product)
    }
}

impl<L: Clone> Clone for ProductService<L> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
        }
    }
}
