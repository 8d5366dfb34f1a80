//! Deploy state machine.

use serde::{Deserialize, Serialize};

/// The status of a deploy in its lifecycle.
///
/// State transitions:
/// ```text
/// Processing ──┬──► Success ──┐
///              ├──► Failed ───┼──► Deleted
///              └──────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStatus {
    /// Deploy was requested and is running.
    Processing,

    /// Deploy finished successfully.
    Success,

    /// Deploy finished with an error.
    Failed,

    /// Deploy was logically deleted (terminal state).
    Deleted,
}

impl DeployStatus {
    /// Returns true if the deploy can finish (succeed or fail) in this state.
    pub fn can_finish(&self) -> bool {
        matches!(self, DeployStatus::Processing)
    }

    /// Returns true if the deploy can be deleted in this state.
    pub fn can_delete(&self) -> bool {
        matches!(
            self,
            DeployStatus::Processing | DeployStatus::Success | DeployStatus::Failed
        )
    }

    /// Returns the status name as it appears in serialized state.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStatus::Processing => "processing",
            DeployStatus::Success => "success",
            DeployStatus::Failed => "failed",
            DeployStatus::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
