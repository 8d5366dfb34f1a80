//! Shared types for the event-sourced aggregate store.

mod types;

pub use types::{Resource, ResourceId};
