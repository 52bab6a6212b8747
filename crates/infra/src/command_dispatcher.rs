//! Command execution pipeline for event-sourced groups.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the target group's stream
//!   ↓
//! 2. Rehydrate the aggregate (apply history in sequence order)
//!   ↓
//! 3. Handle the command (pure decision logic, produces events)
//!   ↓
//! 4. Append with ExpectedVersion::Exact(loaded version)
//!   ↓
//! 5. Apply the committed events to the in-memory aggregate
//! ```
//!
//! A writer that appends between steps 1 and 4 makes step 4 fail with
//! `DispatchError::Concurrency`; nothing is retried here.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use expenseshare_core::{Aggregate, DomainError, ExpectedVersion, GroupId};
use expenseshare_events::{Command, Event};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The aggregate rejected the command.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The stream moved on between load and append.
    #[error("concurrent modification: {0}")]
    Concurrency(String),

    /// The loaded stream is not a well-formed history for the target group.
    #[error("corrupt stream: {0}")]
    CorruptStream(String),

    /// A historical payload does not deserialize into the aggregate's event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Store(EventStoreError),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            other => DispatchError::Store(other),
        }
    }
}

/// Runs commands against group streams in an [`EventStore`].
#[derive(Debug, Clone)]
pub struct CommandDispatcher<S> {
    store: S,
}

impl<S> CommandDispatcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> CommandDispatcher<S>
where
    S: EventStore,
{
    /// Dispatch `command` to the group it targets.
    ///
    /// Returns the aggregate with the new events applied, plus the committed
    /// events. A command that decides no events appends nothing.
    #[instrument(skip_all, fields(group_id = %command.target_group_id()), err)]
    pub async fn dispatch<A>(
        &self,
        command: A::Command,
        make_aggregate: impl FnOnce(GroupId) -> A,
    ) -> Result<(A, Vec<StoredEvent>), DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Command: Command,
        A::Event: Event + Serialize + DeserializeOwned,
    {
        let group_id = command.target_group_id();

        let history = self.store.load_stream(group_id).await?;
        validate_loaded_stream(group_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        let mut aggregate = make_aggregate(group_id);
        apply_history(&mut aggregate, &history)?;

        let decided = aggregate.handle(&command)?;
        if decided.is_empty() {
            return Ok((aggregate, vec![]));
        }

        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(group_id, Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected).await?;
        for ev in &decided {
            aggregate.apply(ev);
        }
        debug!(
            appended = committed.len(),
            version = stream_version(&committed),
            "command applied"
        );

        Ok((aggregate, committed))
    }

    /// Load and rehydrate a group without running a command.
    ///
    /// An unknown group yields the fresh aggregate from `make_aggregate`.
    #[instrument(skip(self, make_aggregate), fields(group_id = %group_id), err)]
    pub async fn load<A>(&self, group_id: GroupId, make_aggregate: impl FnOnce(GroupId) -> A) -> Result<A, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(group_id).await?;
        validate_loaded_stream(group_id, &history)?;

        let mut aggregate = make_aggregate(group_id);
        apply_history(&mut aggregate, &history)?;
        Ok(aggregate)
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(group_id: GroupId, stream: &[StoredEvent]) -> Result<(), DispatchError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.group_id != group_id {
            return Err(DispatchError::CorruptStream(format!(
                "loaded stream contains wrong group_id at index {idx}"
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::CorruptStream(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            )));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(format!("{} #{}: {e}", stored.event_type, stored.sequence_number)))?;
        aggregate.apply(&ev);
    }
    Ok(())
}
