//! SQLite-backed event store.
//!
//! ## Error mapping
//!
//! | sqlx error | EventStoreError |
//! |---|---|
//! | unique violation on `(group_id, sequence_number)` | `Concurrency` |
//! | `SQLITE_BUSY` (any extended code) during `append` | `Concurrency` |
//! | any other database or pool error | `Storage` |
//! | unreadable row (bad uuid, bad JSON) | `Storage` |

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use expenseshare_core::{ExpectedVersion, GroupId};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent, single_stream};
use crate::sqlite::SqliteStore;

#[async_trait]
impl EventStore for SqliteStore {
    /// Check the stream version and insert the batch in one transaction.
    ///
    /// A concurrent writer that commits between the version check and the
    /// insert either trips the `(group_id, sequence_number)` unique constraint
    /// or makes SQLite refuse to upgrade this transaction to a writer
    /// (`SQLITE_BUSY`, `SQLITE_BUSY_SNAPSHOT`). Both surface as `Concurrency`.
    #[instrument(
        skip(self, events),
        fields(
            event_count = events.len(),
            expected_version = ?expected_version,
            group_id = tracing::field::Empty
        ),
        err
    )]
    async fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(group_id) = single_stream(&events)? else {
            return Ok(vec![]);
        };
        Span::current().record("group_id", tracing::field::display(group_id));

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| map_append_error("begin_transaction", e))?;

        let current = current_version(&mut tx, group_id).await?;
        if !expected_version.matches(current) {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        let mut next = current + 1;
        let mut committed = Vec::with_capacity(events.len());
        for event in events {
            let payload = serde_json::to_string(&event.payload)
                .map_err(|e| EventStoreError::Serialization(e.to_string()))?;

            sqlx::query(
                r#"
                INSERT INTO events (
                    event_id,
                    group_id,
                    sequence_number,
                    event_type,
                    event_version,
                    occurred_at,
                    payload
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(event.event_id.to_string())
            .bind(group_id.to_string())
            .bind(next as i64)
            .bind(&event.event_type)
            .bind(i64::from(event.event_version))
            .bind(event.occurred_at)
            .bind(payload)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    EventStoreError::Concurrency(format!(
                        "concurrent append detected: sequence_number {next} already exists"
                    ))
                } else {
                    map_append_error("insert_event", e)
                }
            })?;

            committed.push(StoredEvent::commit(event, next));
            next += 1;
        }

        tx.commit()
            .await
            .map_err(|e| map_append_error("commit_transaction", e))?;

        Ok(committed)
    }

    #[instrument(skip(self), fields(group_id = %group_id), err)]
    async fn load_stream(&self, group_id: GroupId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                event_id,
                group_id,
                sequence_number,
                event_type,
                event_version,
                occurred_at,
                payload
            FROM events
            WHERE group_id = ?1
            ORDER BY sequence_number ASC
            "#,
        )
        .bind(group_id.to_string())
        .fetch_all(self.pool())
        .await
        .map_err(|e| map_sqlx_error("load_stream", e))?;

        rows.iter().map(stored_event_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_streams(&self) -> Result<Vec<GroupId>, EventStoreError> {
        let rows = sqlx::query("SELECT group_id FROM events WHERE sequence_number = 1 ORDER BY rowid ASC")
            .fetch_all(self.pool())
            .await
            .map_err(|e| map_sqlx_error("list_streams", e))?;

        rows.iter()
            .map(|row| {
                let raw: String = row
                    .try_get("group_id")
                    .map_err(|e| map_sqlx_error("list_streams", e))?;
                GroupId::from_str(&raw).map_err(|e| EventStoreError::Storage(e.to_string()))
            })
            .collect()
    }
}

async fn current_version(
    tx: &mut Transaction<'_, Sqlite>,
    group_id: GroupId,
) -> Result<u64, EventStoreError> {
    let version: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(sequence_number), 0) FROM events WHERE group_id = ?1",
    )
    .bind(group_id.to_string())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_append_error("current_version", e))?;

    Ok(version.max(0) as u64)
}

fn stored_event_from_row(row: &SqliteRow) -> Result<StoredEvent, EventStoreError> {
    let read = |e: sqlx::Error| EventStoreError::Storage(format!("failed to read event row: {e}"));

    let event_id: String = row.try_get("event_id").map_err(read)?;
    let group_id: String = row.try_get("group_id").map_err(read)?;
    let sequence_number: i64 = row.try_get("sequence_number").map_err(read)?;
    let event_type: String = row.try_get("event_type").map_err(read)?;
    let event_version: i64 = row.try_get("event_version").map_err(read)?;
    let occurred_at: DateTime<Utc> = row.try_get("occurred_at").map_err(read)?;
    let payload: String = row.try_get("payload").map_err(read)?;

    Ok(StoredEvent {
        event_id: Uuid::parse_str(&event_id)
            .map_err(|e| EventStoreError::Storage(format!("bad event_id: {e}")))?,
        group_id: GroupId::from_str(&group_id).map_err(|e| EventStoreError::Storage(e.to_string()))?,
        sequence_number: sequence_number as u64,
        event_type,
        event_version: event_version as u32,
        occurred_at,
        payload: serde_json::from_str(&payload)
            .map_err(|e| EventStoreError::Storage(format!("bad payload: {e}")))?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> EventStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            EventStoreError::Storage(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            EventStoreError::Storage(format!("connection pool closed in {operation}"))
        }
        other => EventStoreError::Storage(format!("sqlx error in {operation}: {other}")),
    }
}

/// Inside `append`, a busy database means another writer got there first.
fn map_append_error(operation: &str, err: sqlx::Error) -> EventStoreError {
    if is_busy(&err) {
        EventStoreError::Concurrency(format!("concurrent append detected in {operation}: {err}"))
    } else {
        map_sqlx_error(operation, err)
    }
}

/// Primary result code shared by `SQLITE_BUSY` and its extended variants.
const SQLITE_BUSY: i32 = 5;

fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| code & 0xff == SQLITE_BUSY),
        _ => false,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
