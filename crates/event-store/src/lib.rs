//! Append-only event log with conditional writes.
//!
//! Two backends implement [`EventLog`]: [`InMemoryEventLog`] for tests and
//! single-process use, and [`PostgresEventLog`] for durable storage.
//!
//! The PostgreSQL tests start a container through testcontainers and are
//! ignored by default. With Docker available, run them with:
//!
//! ```bash
//! cargo test -p event-store --test postgres_integration -- --ignored
//! ```

pub mod change;
pub mod config;
pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use change::{ChangeKind, ChangeRecord};
pub use common::ResourceId;
pub use config::{LogConfig, TableName};
pub use error::{EventLogError, Result};
pub use event::{Event, EventRecord, Version};
pub use memory::InMemoryEventLog;
pub use postgres::PostgresEventLog;
pub use store::{EventLog, EventLogExt, EventStream, PutCondition};
