//! Append-only event store boundary.
//!
//! One stream per group. The in-memory store backs tests; [`SqliteStore`]
//! persists streams for the desktop app.
//!
//! [`SqliteStore`]: crate::SqliteStore

pub mod in_memory;
mod sqlite;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
