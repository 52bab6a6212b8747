//! User accounts and friendships.
//!
//! Accounts are plain rows, not event streams: they are looked up by
//! username at login and never replayed.

pub mod in_memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use expenseshare_auth::UserAccount;
use expenseshare_core::UserId;

pub use in_memory::InMemoryAccountStore;

#[derive(Debug, Error)]
pub enum AccountStoreError {
    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("unknown user {0}")]
    UnknownUser(UserId),

    #[error("a user cannot befriend themselves")]
    SelfFriendship,

    #[error("storage error: {0}")]
    Storage(String),
}

/// Persistence for [`UserAccount`]s and the friendship relation.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account; `DuplicateUsername` if the username is taken.
    async fn insert_user(&self, account: &UserAccount) -> Result<(), AccountStoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, AccountStoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, AccountStoreError>;

    /// All accounts, ordered by username.
    async fn list_users(&self) -> Result<Vec<UserAccount>, AccountStoreError>;

    /// Record a symmetric friendship. Adding an existing friendship is a no-op.
    async fn add_friend(&self, user: UserId, friend: UserId) -> Result<(), AccountStoreError>;

    /// Friends of `user`, ordered by username.
    async fn friends(&self, user: UserId) -> Result<Vec<UserAccount>, AccountStoreError>;
}

#[async_trait]
impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    async fn insert_user(&self, account: &UserAccount) -> Result<(), AccountStoreError> {
        (**self).insert_user(account).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, AccountStoreError> {
        (**self).find_by_username(username).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, AccountStoreError> {
        (**self).find_by_id(id).await
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>, AccountStoreError> {
        (**self).list_users().await
    }

    async fn add_friend(&self, user: UserId, friend: UserId) -> Result<(), AccountStoreError> {
        (**self).add_friend(user, friend).await
    }

    async fn friends(&self, user: UserId) -> Result<Vec<UserAccount>, AccountStoreError> {
        (**self).friends(user).await
    }
}
