use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use expenseshare_core::{ExpectedVersion, GroupId};

/// An event ready to be appended to a group stream (no sequence number yet).
///
/// Build one from a typed domain event with [`UncommittedEvent::from_typed`]:
/// the payload is the event serialized to JSON, and the event's type name,
/// schema version and business time are captured alongside so the stream
/// can be read back without knowing the Rust type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub group_id: GroupId,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A persisted event with its position in the group stream.
///
/// Sequence numbers start at 1, increase by one per event and never change.
/// The sequence number of the last event is the stream version used for
/// optimistic concurrency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub group_id: GroupId,

    /// Monotonically increasing position in the group stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    pub fn stream_version(&self) -> u64 {
        self.sequence_number
    }

    pub(crate) fn commit(event: UncommittedEvent, sequence_number: u64) -> Self {
        Self {
            event_id: event.event_id,
            group_id: event.group_id,
            sequence_number,
            event_type: event.event_type,
            event_version: event.event_version,
            occurred_at: event.occurred_at,
            payload: event.payload,
        }
    }
}

/// Event store operation error.
///
/// Infrastructure failures only; business rule failures are `DomainError`s.
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("event serialization failed: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Append-only store of group event streams.
///
/// One stream per group, keyed by `GroupId`. Implementations must:
/// - reject batches that mix streams
/// - check `expected_version` against the current stream version
/// - assign sequence numbers starting at `current_version + 1`
/// - persist a batch atomically
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append events to a single group stream.
    async fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Load a full stream in sequence order; empty if the group does not exist.
    async fn load_stream(&self, group_id: GroupId) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Every stream id, oldest stream first.
    async fn list_streams(&self) -> Result<Vec<GroupId>, EventStoreError>;
}

#[async_trait]
impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    async fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version).await
    }

    async fn load_stream(&self, group_id: GroupId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(group_id).await
    }

    async fn list_streams(&self) -> Result<Vec<GroupId>, EventStoreError> {
        (**self).list_streams().await
    }
}

impl UncommittedEvent {
    /// Wrap a typed domain event for appending to `group_id`'s stream.
    pub fn from_typed<E>(group_id: GroupId, event_id: Uuid, event: &E) -> Result<Self, EventStoreError>
    where
        E: expenseshare_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event)
            .map_err(|e| EventStoreError::Serialization(format!("payload serialization failed: {e}")))?;

        Ok(Self {
            event_id,
            group_id,
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}

/// Check that a batch targets exactly one stream; returns that stream.
pub(crate) fn single_stream(events: &[UncommittedEvent]) -> Result<Option<GroupId>, EventStoreError> {
    let Some(first) = events.first() else {
        return Ok(None);
    };
    for (idx, e) in events.iter().enumerate() {
        if e.group_id != first.group_id {
            return Err(EventStoreError::InvalidAppend(format!(
                "batch contains multiple group_ids (index {idx})"
            )));
        }
    }
    Ok(Some(first.group_id))
}
