//! Infrastructure layer: event store, account store and command dispatch.
//!
//! Two backends implement both storage traits:
//! - [`InMemoryStore`] for tests and throwaway sessions
//! - [`SqliteStore`] for the desktop database file

pub mod accounts;
pub mod command_dispatcher;
pub mod event_store;
pub mod memory;
pub mod sqlite;

pub use accounts::{AccountStore, AccountStoreError, InMemoryAccountStore};
pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
