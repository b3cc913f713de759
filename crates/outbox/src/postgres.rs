use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, AggregateRecord, MessageId, OutboxError, OutboxMessage, Result, Version,
    message::lease_deadline,
    store::{AggregateStore, ChangeSet, OutboxStats, OutboxStore, validate_change_set},
};

const MESSAGE_COLUMNS: &str = "id, type, content, occurred_on, processed_on, error, \
     retry_count, max_retry_count, locked_by, locked_until";

/// PostgreSQL-backed catalog store.
///
/// Aggregate rows and outbox rows live in the same database, so one
/// transaction covers both halves of a change set.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_message(row: PgRow) -> Result<OutboxMessage> {
        Ok(OutboxMessage {
            id: MessageId::from_uuid(row.try_get::<Uuid, _>("id")?),
            message_type: row.try_get("type")?,
            content: row.try_get("content")?,
            occurred_on: row.try_get("occurred_on")?,
            processed_on: row.try_get("processed_on")?,
            error: row.try_get("error")?,
            retry_count: row.try_get("retry_count")?,
            max_retry_count: row.try_get("max_retry_count")?,
            locked_by: row.try_get("locked_by")?,
            locked_until: row.try_get("locked_until")?,
        })
    }

    async fn write_aggregates(
        tx: &mut Transaction<'_, Postgres>,
        changes: &ChangeSet,
    ) -> Result<()> {
        for write in &changes.aggregates {
            let record = &write.record;

            let current: Option<i64> = sqlx::query_scalar(
                "SELECT version FROM aggregates WHERE aggregate_type = $1 AND aggregate_id = $2 FOR UPDATE",
            )
            .bind(&record.aggregate_type)
            .bind(record.aggregate_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?;

            let actual = Version::new(current.unwrap_or(0));
            if actual != write.expected_version {
                return Err(OutboxError::ConcurrencyConflict {
                    aggregate_type: record.aggregate_type.clone(),
                    aggregate_id: record.aggregate_id,
                    expected: write.expected_version,
                    actual,
                });
            }

            sqlx::query(
                r#"
                INSERT INTO aggregates (aggregate_type, aggregate_id, version, state, updated_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (aggregate_type, aggregate_id) DO UPDATE SET
                    version = EXCLUDED.version,
                    state = EXCLUDED.state,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(&record.aggregate_type)
            .bind(record.aggregate_id.as_uuid())
            .bind(record.version.as_i64())
            .bind(&record.state)
            .bind(record.updated_at)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn write_messages(tx: &mut Transaction<'_, Postgres>, changes: &ChangeSet) -> Result<()> {
        for message in &changes.messages {
            sqlx::query(
                r#"
                INSERT INTO outbox_messages (id, type, content, occurred_on, processed_on, error, retry_count, max_retry_count)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(message.id.as_uuid())
            .bind(&message.message_type)
            .bind(&message.content)
            .bind(message.occurred_on)
            .bind(message.processed_on)
            .bind(&message.error)
            .bind(message.retry_count)
            .bind(message.max_retry_count)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("outbox_messages_pkey")
                {
                    return OutboxError::DuplicateMessage(message.id);
                }
                OutboxError::Database(e)
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl AggregateStore for PostgresStore {
    async fn load_aggregate(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> Result<Option<AggregateRecord>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT aggregate_type, aggregate_id, version, state, updated_at
            FROM aggregates
            WHERE aggregate_type = $1 AND aggregate_id = $2
            "#,
        )
        .bind(aggregate_type)
        .bind(aggregate_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(AggregateRecord {
                aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
                aggregate_type: row.try_get("aggregate_type")?,
                version: Version::new(row.try_get("version")?),
                updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
                state: row.try_get("state")?,
            })),
            None => Ok(None),
        }
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        validate_change_set(&changes)?;
        if changes.is_empty() {
            return Ok(());
        }

        // Dropping the transaction on any error rolls back both writes
        let mut tx = self.pool.begin().await?;
        Self::write_aggregates(&mut tx, &changes).await?;
        Self::write_messages(&mut tx, &changes).await?;
        tx.commit().await?;

        Ok(())
    }
}

#[async_trait]
impl OutboxStore for PostgresStore {
    async fn claim_pending(
        &self,
        worker_id: &str,
        limit: usize,
        lease: Duration,
    ) -> Result<Vec<OutboxMessage>> {
        let now = Utc::now();
        let until = lease_deadline(now, lease);

        let sql = format!(
            r#"
            UPDATE outbox_messages SET locked_by = $1, locked_until = $2
            WHERE id IN (
                SELECT id FROM outbox_messages
                WHERE processed_on IS NULL
                  AND retry_count < max_retry_count
                  AND (locked_until IS NULL OR locked_until <= $3)
                ORDER BY occurred_on ASC
                LIMIT $4
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {MESSAGE_COLUMNS}
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(worker_id)
            .bind(until)
            .bind(now)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut messages = rows
            .into_iter()
            .map(Self::row_to_message)
            .collect::<Result<Vec<_>>>()?;
        // RETURNING does not preserve the subquery order
        messages.sort_by_key(|m| m.occurred_on);
        Ok(messages)
    }

    async fn save_statuses(
        &self,
        worker_id: &str,
        messages: &[OutboxMessage],
    ) -> Result<Vec<MessageId>> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }

        let mut written = Vec::with_capacity(messages.len());
        let mut tx = self.pool.begin().await?;
        for message in messages {
            let row = sqlx::query(
                r#"
                UPDATE outbox_messages
                SET processed_on = $2, error = $3,
                    retry_count = GREATEST(retry_count, $4),
                    locked_by = NULL, locked_until = NULL
                WHERE id = $1 AND processed_on IS NULL AND locked_by = $5
                RETURNING id
                "#,
            )
            .bind(message.id.as_uuid())
            .bind(message.processed_on)
            .bind(&message.error)
            .bind(message.retry_count)
            .bind(worker_id)
            .fetch_optional(&mut *tx)
            .await?;

            if row.is_some() {
                written.push(message.id);
            }
        }
        tx.commit().await?;

        Ok(written)
    }

    async fn get_message(&self, id: MessageId) -> Result<Option<OutboxMessage>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM outbox_messages WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_message).transpose()
    }

    async fn list_permanently_failed(&self, limit: usize) -> Result<Vec<OutboxMessage>> {
        let sql = format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM outbox_messages
            WHERE processed_on IS NULL AND retry_count >= max_retry_count
            ORDER BY occurred_on ASC
            LIMIT $1
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_message).collect()
    }

    async fn stats(&self) -> Result<OutboxStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE processed_on IS NULL AND retry_count < max_retry_count) AS pending,
                COUNT(*) FILTER (WHERE processed_on IS NOT NULL) AS processed,
                COUNT(*) FILTER (WHERE processed_on IS NULL AND retry_count >= max_retry_count) AS permanently_failed
            FROM outbox_messages
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(OutboxStats {
            pending: row.try_get::<i64, _>("pending")? as u64,
            processed: row.try_get::<i64, _>("processed")? as u64,
            permanently_failed: row.try_get::<i64, _>("permanently_failed")? as u64,
        })
    }
}
