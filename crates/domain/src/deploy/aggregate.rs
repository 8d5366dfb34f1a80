//! Deploy aggregate implementation.

use event_store::Version;
use serde::{Deserialize, Serialize};

use super::{DeployError, DeployEvent, DeployStatus};
use crate::aggregate::{Aggregate, EventMeta};

/// Derived state of a deploy.
///
/// Every field is absent until the deploy is created, so an empty deploy
/// serializes to `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deploy {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<DeployStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    specification: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    failure_reason: Option<String>,
}

impl Deploy {
    pub fn status(&self) -> Option<DeployStatus> {
        self.status
    }

    pub fn specification(&self) -> Option<&str> {
        self.specification.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Returns true once a `DeployDeleted` event has been applied.
    pub fn is_deleted(&self) -> bool {
        self.status == Some(DeployStatus::Deleted)
    }

    fn current_status(&self) -> Result<DeployStatus, DeployError> {
        self.status.ok_or(DeployError::NotCreated)
    }

    fn on_created(&mut self, specification: &str, meta: &EventMeta) -> Result<(), DeployError> {
        if self.status.is_some()
            || meta.version != Version::initial()
            || meta.number != Version::first()
        {
            return Err(DeployError::AlreadyCreated);
        }
        if specification.trim().is_empty() {
            return Err(DeployError::SpecificationRequired);
        }

        self.status = Some(DeployStatus::Processing);
        self.specification = Some(specification.to_string());
        Ok(())
    }

    fn on_finished(&mut self, outcome: DeployStatus, action: &'static str) -> Result<(), DeployError> {
        let current_state = self.current_status()?;
        if !current_state.can_finish() {
            return Err(DeployError::InvalidStateTransition {
                current_state,
                action,
            });
        }

        self.status = Some(outcome);
        Ok(())
    }

    fn on_deleted(&mut self) -> Result<(), DeployError> {
        let current_state = self.current_status()?;
        if !current_state.can_delete() {
            return Err(DeployError::InvalidStateTransition {
                current_state,
                action: "delete",
            });
        }

        self.status = Some(DeployStatus::Deleted);
        Ok(())
    }
}

impl Aggregate for Deploy {
    type Event = DeployEvent;
    type Error = DeployError;

    fn aggregate_type() -> &'static str {
        "Deploy"
    }

    fn apply(&mut self, event: &Self::Event, meta: &EventMeta) -> Result<(), Self::Error> {
        match event {
            DeployEvent::DeployCreated { specification } => self.on_created(specification, meta),
            DeployEvent::DeploySucceeded => self.on_finished(DeployStatus::Success, "succeed"),
            DeployEvent::DeployFailed { reason } => {
                self.on_finished(DeployStatus::Failed, "fail")?;
                self.failure_reason = Some(reason.clone());
                Ok(())
            }
            DeployEvent::DeployDeleted => self.on_deleted(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn meta(number: i64) -> EventMeta {
        EventMeta {
            number: Version::new(number),
            created: Utc::now(),
            version: Version::new(number - 1),
        }
    }

    fn created_deploy() -> Deploy {
        let mut deploy = Deploy::default();
        deploy
            .apply(&DeployEvent::created("api:v2"), &meta(1))
            .unwrap();
        deploy
    }

    #[test]
    fn created_sets_processing_and_specification() {
        let deploy = created_deploy();
        assert_eq!(deploy.status(), Some(DeployStatus::Processing));
        assert_eq!(deploy.specification(), Some("api:v2"));
    }

    #[test]
    fn created_is_only_legal_as_first_event() {
        let mut deploy = created_deploy();
        let result = deploy.apply(&DeployEvent::created("again"), &meta(2));
        assert!(matches!(result, Err(DeployError::AlreadyCreated)));
        assert_eq!(deploy.specification(), Some("api:v2"));

        let mut fresh = Deploy::default();
        let result = fresh.apply(&DeployEvent::created("late"), &meta(3));
        assert!(matches!(result, Err(DeployError::AlreadyCreated)));
        assert_eq!(fresh, Deploy::default());
    }

    #[test]
    fn created_requires_specification() {
        let mut deploy = Deploy::default();
        let result = deploy.apply(&DeployEvent::created("  "), &meta(1));
        assert!(matches!(result, Err(DeployError::SpecificationRequired)));
        assert_eq!(deploy.status(), None);
    }

    #[test]
    fn delete_before_create_fails() {
        let mut deploy = Deploy::default();
        let result = deploy.apply(&DeployEvent::DeployDeleted, &meta(1));
        assert!(matches!(result, Err(DeployError::NotCreated)));
    }

    #[test]
    fn delete_from_every_live_state() {
        let mut processing = created_deploy();
        processing.apply(&DeployEvent::DeployDeleted, &meta(2)).unwrap();
        assert!(processing.is_deleted());

        let mut succeeded = created_deploy();
        succeeded.apply(&DeployEvent::DeploySucceeded, &meta(2)).unwrap();
        succeeded.apply(&DeployEvent::DeployDeleted, &meta(3)).unwrap();
        assert!(succeeded.is_deleted());

        let mut failed = created_deploy();
        failed.apply(&DeployEvent::failed("timeout"), &meta(2)).unwrap();
        assert_eq!(failed.failure_reason(), Some("timeout"));
        failed.apply(&DeployEvent::DeployDeleted, &meta(3)).unwrap();
        assert!(failed.is_deleted());
    }

    #[test]
    fn deleted_deploy_is_terminal() {
        let mut deploy = created_deploy();
        deploy.apply(&DeployEvent::DeployDeleted, &meta(2)).unwrap();

        let result = deploy.apply(&DeployEvent::DeployDeleted, &meta(3));
        assert!(matches!(
            result,
            Err(DeployError::InvalidStateTransition {
                current_state: DeployStatus::Deleted,
                action: "delete",
            })
        ));

        let result = deploy.apply(&DeployEvent::DeploySucceeded, &meta(3));
        assert!(matches!(
            result,
            Err(DeployError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn finished_deploy_cannot_finish_again() {
        let mut deploy = created_deploy();
        deploy.apply(&DeployEvent::DeploySucceeded, &meta(2)).unwrap();

        let result = deploy.apply(&DeployEvent::failed("late"), &meta(3));
        assert!(result.is_err());
        assert_eq!(deploy.status(), Some(DeployStatus::Success));
        assert_eq!(deploy.failure_reason(), None);
    }

    #[test]
    fn empty_deploy_serializes_to_empty_object() {
        assert_eq!(serde_json::to_value(Deploy::default()).unwrap(), json!({}));
        assert_eq!(
            serde_json::to_value(created_deploy()).unwrap(),
            json!({ "status": "processing", "specification": "api:v2" })
        );
    }
}
