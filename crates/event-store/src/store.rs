use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::TryStreamExt;

use crate::{EventRecord, ResourceId, Result, Version};

/// Precondition for a conditional put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PutCondition {
    /// No row may exist yet for the record's resource id.
    ///
    /// Guards the first event of a resource against id collisions.
    ResourceAbsent,

    /// No row may exist yet for the record's `(id, number)` key.
    ///
    /// Guards a sequence number against concurrent writers.
    EventAbsent,
}

impl std::fmt::Display for PutCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PutCondition::ResourceAbsent => f.write_str("resource must not exist"),
            PutCondition::EventAbsent => f.write_str("event number must not exist"),
        }
    }
}

/// A stream of stored rows.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventRecord>> + Send>>;

/// The key-value capability the aggregate core depends on.
///
/// A single table keyed by `(id, number)`. Each operation is atomic and
/// fails independently; rows are never updated or deleted through this API.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Inserts a row if `condition` holds.
    ///
    /// Fails with `ConditionalCheckFailed` if the guarded row already exists,
    /// leaving the log unchanged.
    async fn put(&self, record: EventRecord, condition: PutCondition) -> Result<()>;

    /// Returns every row of one resource, ascending by number.
    async fn query(&self, id: &ResourceId) -> Result<Vec<EventRecord>>;

    /// Streams every row in the log, in no particular order.
    async fn scan(&self) -> Result<EventStream>;
}

/// Extension trait providing convenience methods for event logs.
#[async_trait]
pub trait EventLogExt: EventLog {
    /// Collects a full scan into memory.
    async fn scan_all(&self) -> Result<Vec<EventRecord>> {
        self.scan().await?.try_collect().await
    }
}

// Blanket implementation for all EventLog implementations
impl<T: EventLog + ?Sized> EventLogExt for T {}
