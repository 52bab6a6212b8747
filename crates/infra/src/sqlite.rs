//! SQLite database handle shared by the event store and the account store.

use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::instrument;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS events (
        event_id        TEXT PRIMARY KEY,
        group_id        TEXT NOT NULL,
        sequence_number INTEGER NOT NULL CHECK (sequence_number > 0),
        event_type      TEXT NOT NULL,
        event_version   INTEGER NOT NULL,
        occurred_at     TEXT NOT NULL,
        payload         TEXT NOT NULL,
        recorded_at     TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (group_id, sequence_number)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        user_id       TEXT PRIMARY KEY,
        username      TEXT NOT NULL UNIQUE,
        email         TEXT NULL,
        currency      TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        created_at    TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS friends (
        user_id   TEXT NOT NULL REFERENCES users (user_id),
        friend_id TEXT NOT NULL REFERENCES users (user_id),
        PRIMARY KEY (user_id, friend_id)
    )
    "#,
];

/// SQLite-backed storage for group event streams, accounts and friendships.
///
/// Implements both [`crate::EventStore`] and [`crate::AccountStore`]. Cloning
/// is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `path`.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create database directory at {parent:?}"))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open SQLite database at {path:?}"))?;

        Self::with_pool(pool).await
    }

    /// Private in-memory database (tests, throwaway sessions).
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("invalid in-memory SQLite URL")?
            .foreign_keys(true);
        // Every connection to :memory: is its own database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("failed to open in-memory SQLite database")?;

        Self::with_pool(pool).await
    }

    /// Use an existing pool, creating the schema if it is missing.
    pub async fn with_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&pool)
                .await
                .context("failed to create schema")?;
        }
        tracing::debug!("sqlite schema ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
