use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use expenseshare_auth::UserAccount;
use expenseshare_core::UserId;

use super::{AccountStore, AccountStoreError};

#[derive(Debug, Default)]
struct Accounts {
    by_id: HashMap<UserId, UserAccount>,
    /// username -> id
    usernames: HashMap<String, UserId>,
    friendships: BTreeSet<(UserId, UserId)>,
}

impl Accounts {
    fn sorted(&self, ids: impl Iterator<Item = UserId>) -> Vec<UserAccount> {
        let mut accounts: Vec<UserAccount> = ids.filter_map(|id| self.by_id.get(&id).cloned()).collect();
        accounts.sort_by(|a, b| a.username().cmp(b.username()));
        accounts
    }
}

/// In-memory account store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    inner: RwLock<Accounts>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> AccountStoreError {
    AccountStoreError::Storage("lock poisoned".to_string())
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn insert_user(&self, account: &UserAccount) -> Result<(), AccountStoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        if inner.usernames.contains_key(account.username()) {
            return Err(AccountStoreError::DuplicateUsername(account.username().to_string()));
        }
        inner.usernames.insert(account.username().to_string(), account.id());
        inner.by_id.insert(account.id(), account.clone());
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, AccountStoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .usernames
            .get(username)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, AccountStoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.by_id.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>, AccountStoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.sorted(inner.by_id.keys().copied()))
    }

    async fn add_friend(&self, user: UserId, friend: UserId) -> Result<(), AccountStoreError> {
        if user == friend {
            return Err(AccountStoreError::SelfFriendship);
        }
        let mut inner = self.inner.write().map_err(poisoned)?;
        for id in [user, friend] {
            if !inner.by_id.contains_key(&id) {
                return Err(AccountStoreError::UnknownUser(id));
            }
        }
        inner.friendships.insert((user, friend));
        inner.friendships.insert((friend, user));
        Ok(())
    }

    async fn friends(&self, user: UserId) -> Result<Vec<UserAccount>, AccountStoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        let ids = inner
            .friendships
            .iter()
            .filter(|(from, _)| *from == user)
            .map(|(_, to)| *to);
        Ok(inner.sorted(ids))
    }
}
