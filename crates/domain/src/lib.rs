//! Domain layer for the event-sourcing system.
//!
//! This crate provides the aggregate core:
//! - [`Aggregate`] and [`DomainEvent`] traits for event-sourced state
//! - [`AggregateRoot`] to hydrate an aggregate and commit new events with
//!   optimistic concurrency
//! - [`Repository`] to find one or all aggregates of a kind
//! - Deploy and Product aggregates built on top of it

pub mod aggregate;
pub mod deploy;
pub mod error;
pub mod product;
pub mod repository;
pub mod root;

pub use aggregate::{Aggregate, DomainEvent, EventMeta};
pub use deploy::{Deploy, DeployError, DeployEvent, DeployService, DeployStatus};
pub use error::DomainError;
pub use product::{Product, ProductError, ProductEvent, ProductService, ProductStatus};
pub use repository::Repository;
pub use root::{AggregateRoot, AggregateView};
