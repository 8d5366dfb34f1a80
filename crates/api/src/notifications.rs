//! Background consumer of the event log's change feed.
//!
//! Inserts are the only change the log produces. Modifications and removals
//! mean someone edited the table behind the log's back, so they are logged
//! as anomalies rather than handled.

use event_store::{ChangeKind, ChangeRecord, ResourceId, Version};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// What one change on the feed means to an operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A deploy was created.
    DeployCreated {
        id: ResourceId,
        specification: String,
    },
    /// Any other event was appended.
    EventAppended {
        id: ResourceId,
        number: Version,
        event_type: String,
    },
    /// A stored event was modified or removed.
    Anomaly {
        kind: ChangeKind,
        id: ResourceId,
        number: Version,
    },
}

impl Notification {
    /// Classifies one change record.
    pub fn from_change(change: &ChangeRecord) -> Self {
        if change.is_anomaly() {
            return Notification::Anomaly {
                kind: change.kind,
                id: change.id.clone(),
                number: change.number,
            };
        }

        let event_type = change
            .new_image
            .as_ref()
            .map(|record| record.event.event_type.clone())
            .unwrap_or_default();

        let specification = change
            .new_image
            .as_ref()
            .filter(|record| record.event.event_type == "DeployCreated")
            .and_then(|record| record.event.payload.get("specification"))
            .and_then(|value| value.as_str());

        match specification {
            Some(specification) => Notification::DeployCreated {
                id: change.id.clone(),
                specification: specification.to_string(),
            },
            None => Notification::EventAppended {
                id: change.id.clone(),
                number: change.number,
                event_type,
            },
        }
    }

    fn log(&self) {
        match self {
            Notification::DeployCreated { id, specification } => {
                tracing::info!(%id, "A new deploy was created with specification: {specification}");
            }
            Notification::EventAppended {
                id,
                number,
                event_type,
            } => {
                tracing::debug!(%id, %number, %event_type, "event appended");
            }
            Notification::Anomaly {
                kind: ChangeKind::Remove,
                id,
                number,
            } => {
                tracing::warn!(%id, %number, "Event data is being deleted!");
            }
            Notification::Anomaly { kind, id, number } => {
                tracing::warn!(%id, %number, ?kind, "Event data is being updated!");
            }
        }
    }
}

/// Spawns a task that logs every change until the feed closes.
pub fn spawn(mut changes: broadcast::Receiver<ChangeRecord>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) => Notification::from_change(&change).log(),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notification consumer lagged behind the change feed");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::info!("change feed closed, notifications stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::{Event, EventRecord};

    fn insert(event: Event) -> ChangeRecord {
        ChangeRecord::insert(EventRecord::new(ResourceId::from("d-1"), event))
    }

    #[test]
    fn deploy_created_announces_specification() {
        let change = insert(Event::new(Version::first(), "DeployCreated").with_field("specification", "web:2"));

        assert_eq!(
            Notification::from_change(&change),
            Notification::DeployCreated {
                id: ResourceId::from("d-1"),
                specification: "web:2".to_string(),
            }
        );
    }

    #[test]
    fn other_inserts_are_plain_appends() {
        let change = insert(Event::new(Version::new(2), "DeployDeleted"));

        assert_eq!(
            Notification::from_change(&change),
            Notification::EventAppended {
                id: ResourceId::from("d-1"),
                number: Version::new(2),
                event_type: "DeployDeleted".to_string(),
            }
        );
    }

    #[test]
    fn modify_and_remove_are_anomalies() {
        let change = ChangeRecord {
            kind: ChangeKind::Remove,
            id: ResourceId::from("d-1"),
            number: Version::first(),
            new_image: None,
        };

        assert!(matches!(
            Notification::from_change(&change),
            Notification::Anomaly {
                kind: ChangeKind::Remove,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn consumer_stops_when_feed_closes() {
        let (sender, receiver) = broadcast::channel(8);
        let handle = spawn(receiver);

        sender
            .send(insert(Event::new(Version::first(), "DeployCreated").with_field("specification", "x")))
            .unwrap();
        drop(sender);

        handle.await.unwrap();
    }
}
