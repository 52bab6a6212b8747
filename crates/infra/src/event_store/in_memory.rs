use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use expenseshare_core::{ExpectedVersion, GroupId};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent, single_stream};

#[derive(Debug, Default)]
struct Streams {
    by_group: HashMap<GroupId, Vec<StoredEvent>>,
    /// Stream ids in creation order.
    order: Vec<GroupId>,
}

/// In-memory append-only event store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<Streams>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(group_id) = single_stream(&events)? else {
            return Ok(vec![]);
        };

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::Storage("lock poisoned".to_string()))?;

        let current = streams
            .by_group
            .get(&group_id)
            .map(|s| Self::current_version(s))
            .unwrap_or(0);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        if current == 0 && !streams.by_group.contains_key(&group_id) {
            streams.order.push(group_id);
        }
        let stream = streams.by_group.entry(group_id).or_default();

        let mut next = current + 1;
        let mut committed = Vec::with_capacity(events.len());
        for e in events {
            let stored = StoredEvent::commit(e, next);
            next += 1;
            stream.push(stored.clone());
            committed.push(stored);
        }

        Ok(committed)
    }

    async fn load_stream(&self, group_id: GroupId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Storage("lock poisoned".to_string()))?;

        Ok(streams.by_group.get(&group_id).cloned().unwrap_or_default())
    }

    async fn list_streams(&self) -> Result<Vec<GroupId>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Storage("lock poisoned".to_string()))?;

        Ok(streams.order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn event(group_id: GroupId) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            group_id,
            event_type: "ledger.group.created".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn append_assigns_sequence_numbers_from_one() {
        let store = InMemoryEventStore::new();
        let group_id = GroupId::new();

        let committed = store
            .append(vec![event(group_id), event(group_id)], ExpectedVersion::NoStream)
            .await
            .unwrap();
        assert_eq!(
            committed.iter().map(|e| e.sequence_number).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let more = store
            .append(vec![event(group_id)], ExpectedVersion::Exact(2))
            .await
            .unwrap();
        assert_eq!(more[0].stream_version(), 3);
        assert_eq!(store.load_stream(group_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn stale_expected_version_is_rejected() {
        let store = InMemoryEventStore::new();
        let group_id = GroupId::new();
        store
            .append(vec![event(group_id)], ExpectedVersion::NoStream)
            .await
            .unwrap();

        let err = store
            .append(vec![event(group_id)], ExpectedVersion::NoStream)
            .await
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
    }

    #[tokio::test]
    async fn mixed_batches_are_rejected() {
        let store = InMemoryEventStore::new();
        let err = store
            .append(vec![event(GroupId::new()), event(GroupId::new())], ExpectedVersion::Any)
            .await
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidAppend(_)));
    }

    #[tokio::test]
    async fn streams_are_listed_in_creation_order() {
        let store = InMemoryEventStore::new();
        let first = GroupId::new();
        let second = GroupId::new();
        store.append(vec![event(second)], ExpectedVersion::Any).await.unwrap();
        store.append(vec![event(first)], ExpectedVersion::Any).await.unwrap();
        store.append(vec![event(second)], ExpectedVersion::Any).await.unwrap();

        assert_eq!(store.list_streams().await.unwrap(), vec![second, first]);
        assert!(store.load_stream(GroupId::new()).await.unwrap().is_empty());
    }
}
