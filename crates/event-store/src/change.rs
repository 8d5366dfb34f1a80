use serde::{Deserialize, Serialize};

use crate::{EventRecord, ResourceId, Version};

/// Kind of change observed on the log's change feed.
///
/// Only inserts are produced by normal operation. Modifications and removals
/// come from writes that bypass the log API, such as a manual `UPDATE` on the
/// Postgres table, and are reported as anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Modify,
    Remove,
}

/// One entry of the log's change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    pub id: ResourceId,
    pub number: Version,
    /// The row after the change. Absent for removals.
    pub new_image: Option<EventRecord>,
}

impl ChangeRecord {
    /// Creates an insert change for a newly written row.
    pub fn insert(record: EventRecord) -> Self {
        Self {
            kind: ChangeKind::Insert,
            id: record.id.clone(),
            number: record.number(),
            new_image: Some(record),
        }
    }

    /// Returns true for changes the log itself never produces.
    pub fn is_anomaly(&self) -> bool {
        !matches!(self.kind, ChangeKind::Insert)
    }
}
