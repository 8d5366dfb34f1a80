//! Deploy aggregate and related types.

mod aggregate;
mod events;
mod service;
mod status;

pub use aggregate::Deploy;
pub use events::DeployEvent;
pub use service::DeployService;
pub use status::DeployStatus;

use thiserror::Error;

/// Errors raised when a deploy event is not a legal transition.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Only the first event of a fresh resource may create a deploy.
    #[error("Deploy already created")]
    AlreadyCreated,

    /// The deploy has not been created yet.
    #[error("Deploy does not exist")]
    NotCreated,

    /// A deploy needs a non-empty specification.
    #[error("Deploy specification is required")]
    SpecificationRequired,

    /// Deploy is not in the expected state.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: DeployStatus,
        action: &'static str,
    },
}
