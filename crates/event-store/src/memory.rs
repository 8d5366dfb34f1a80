use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use crate::{
    ChangeRecord, EventLogError, EventRecord, ResourceId, Result, Version,
    store::{EventLog, EventStream, PutCondition},
};

pub(crate) const CHANGE_FEED_CAPACITY: usize = 1024;

type Partitions = HashMap<ResourceId, BTreeMap<Version, EventRecord>>;

/// In-memory event log.
///
/// Rows are partitioned by resource id and sorted by number, with the same
/// conditional-put semantics as the PostgreSQL implementation. Successful
/// puts are published on a change feed (see [`InMemoryEventLog::subscribe`]).
/// Rows can only enter through `put`, so this feed only ever carries inserts.
#[derive(Clone)]
pub struct InMemoryEventLog {
    partitions: Arc<RwLock<Partitions>>,
    changes: broadcast::Sender<ChangeRecord>,
}

impl InMemoryEventLog {
    /// Creates a new empty in-memory event log.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            partitions: Arc::default(),
            changes,
        }
    }

    /// Subscribes to inserts made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeRecord> {
        self.changes.subscribe()
    }

    /// Returns the total number of rows stored.
    pub async fn record_count(&self) -> usize {
        self.partitions.read().await.values().map(BTreeMap::len).sum()
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn put(&self, record: EventRecord, condition: PutCondition) -> Result<()> {
        let number = record.number();
        let mut partitions = self.partitions.write().await;
        let partition = partitions.entry(record.id.clone()).or_default();

        let rejected = match condition {
            PutCondition::ResourceAbsent => !partition.is_empty(),
            PutCondition::EventAbsent => partition.contains_key(&number),
        };
        if rejected {
            return Err(EventLogError::ConditionalCheckFailed {
                id: record.id,
                number,
                condition,
            });
        }

        partition.insert(number, record.clone());
        drop(partitions);

        tracing::debug!(id = %record.id, %number, %condition, "row inserted");
        // No subscribers is fine.
        let _ = self.changes.send(ChangeRecord::insert(record));
        Ok(())
    }

    async fn query(&self, id: &ResourceId) -> Result<Vec<EventRecord>> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .get(id)
            .map(|partition| partition.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn scan(&self) -> Result<EventStream> {
        use futures_util::stream;

        let partitions = self.partitions.read().await;
        let rows: Vec<EventRecord> = partitions
            .values()
            .flat_map(|partition| partition.values().cloned())
            .collect();

        Ok(Box::pin(stream::iter(rows.into_iter().map(Ok))))
    }
}
