//! Process-local store combining both in-memory backends.

use async_trait::async_trait;

use expenseshare_auth::UserAccount;
use expenseshare_core::{ExpectedVersion, GroupId, UserId};

use crate::accounts::{AccountStore, AccountStoreError, InMemoryAccountStore};
use crate::event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};

/// Event streams and accounts held in memory, lost on drop.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    events: InMemoryEventStore,
    accounts: InMemoryAccountStore,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        self.events.append(events, expected_version).await
    }

    async fn load_stream(&self, group_id: GroupId) -> Result<Vec<StoredEvent>, EventStoreError> {
        self.events.load_stream(group_id).await
    }

    async fn list_streams(&self) -> Result<Vec<GroupId>, EventStoreError> {
        self.events.list_streams().await
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn insert_user(&self, account: &UserAccount) -> Result<(), AccountStoreError> {
        self.accounts.insert_user(account).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, AccountStoreError> {
        self.accounts.find_by_username(username).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, AccountStoreError> {
        self.accounts.find_by_id(id).await
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>, AccountStoreError> {
        self.accounts.list_users().await
    }

    async fn add_friend(&self, user: UserId, friend: UserId) -> Result<(), AccountStoreError> {
        self.accounts.add_friend(user, friend).await
    }

    async fn friends(&self, user: UserId) -> Result<Vec<UserAccount>, AccountStoreError> {
        self.accounts.friends(user).await
    }
}
