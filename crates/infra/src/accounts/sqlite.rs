use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::instrument;

use expenseshare_auth::UserAccount;
use expenseshare_core::{Currency, UserId};

use super::{AccountStore, AccountStoreError};
use crate::sqlite::SqliteStore;

const USER_COLUMNS: &str = "user_id, username, email, currency, password_hash, created_at";

#[async_trait]
impl AccountStore for SqliteStore {
    #[instrument(skip(self, account), fields(username = %account.username()), err)]
    async fn insert_user(&self, account: &UserAccount) -> Result<(), AccountStoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, email, currency, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(account.id().to_string())
        .bind(account.username())
        .bind(account.email())
        .bind(account.currency().code())
        .bind(account.password_hash())
        .bind(account.created_at())
        .execute(self.pool())
        .await
        .map_err(|e| {
            let duplicate = matches!(&e, sqlx::Error::Database(db_err) if db_err.is_unique_violation());
            if duplicate {
                AccountStoreError::DuplicateUsername(account.username().to_string())
            } else {
                storage("insert_user", e)
            }
        })?;
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, AccountStoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"))
            .bind(username)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| storage("find_by_username", e))?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, AccountStoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"))
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| storage("find_by_id", e))?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>, AccountStoreError> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY username ASC"))
            .fetch_all(self.pool())
            .await
            .map_err(|e| storage("list_users", e))?;
        rows.iter().map(account_from_row).collect()
    }

    #[instrument(skip(self), fields(user = %user, friend = %friend), err)]
    async fn add_friend(&self, user: UserId, friend: UserId) -> Result<(), AccountStoreError> {
        if user == friend {
            return Err(AccountStoreError::SelfFriendship);
        }
        for id in [user, friend] {
            if self.find_by_id(id).await?.is_none() {
                return Err(AccountStoreError::UnknownUser(id));
            }
        }

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| storage("begin_transaction", e))?;
        for (a, b) in [(user, friend), (friend, user)] {
            sqlx::query("INSERT OR IGNORE INTO friends (user_id, friend_id) VALUES (?1, ?2)")
                .bind(a.to_string())
                .bind(b.to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| storage("add_friend", e))?;
        }
        tx.commit().await.map_err(|e| storage("commit_transaction", e))?;
        Ok(())
    }

    async fn friends(&self, user: UserId) -> Result<Vec<UserAccount>, AccountStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT u.user_id, u.username, u.email, u.currency, u.password_hash, u.created_at
            FROM friends f
            JOIN users u ON u.user_id = f.friend_id
            WHERE f.user_id = ?1
            ORDER BY u.username ASC
            "#,
        )
        .bind(user.to_string())
        .fetch_all(self.pool())
        .await
        .map_err(|e| storage("friends", e))?;
        rows.iter().map(account_from_row).collect()
    }
}

fn account_from_row(row: &SqliteRow) -> Result<UserAccount, AccountStoreError> {
    let read = |e: sqlx::Error| AccountStoreError::Storage(format!("failed to read user row: {e}"));

    let user_id: String = row.try_get("user_id").map_err(read)?;
    let username: String = row.try_get("username").map_err(read)?;
    let email: Option<String> = row.try_get("email").map_err(read)?;
    let currency: String = row.try_get("currency").map_err(read)?;
    let password_hash: String = row.try_get("password_hash").map_err(read)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(read)?;

    Ok(UserAccount::from_parts(
        UserId::from_str(&user_id).map_err(|e| AccountStoreError::Storage(e.to_string()))?,
        username,
        email,
        Currency::from_str(&currency).map_err(|e| AccountStoreError::Storage(e.to_string()))?,
        password_hash,
        created_at,
    ))
}

fn storage(operation: &str, err: sqlx::Error) -> AccountStoreError {
    AccountStoreError::Storage(format!("sqlx error in {operation}: {err}"))
}
