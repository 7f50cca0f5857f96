use crate::clock::SharedClock;
use crate::error::DomainResult;
use crate::persist::ledger::{LedgerTransaction, PublicationLedger, cutoff, failed_stream};
use crate::persist::paging::{PageCursor, keyset_stream};
use crate::persist::publication_record::{PublicationId, PublicationRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_core::stream::BoxStream;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};
use std::time::Duration;
use uuid::Uuid;

#[derive(FromRow)]
struct PublicationRow {
    id: Uuid,
    listener_id: String,
    event_type: String,
    payload: Json<Value>,
    published_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<PublicationRow> for PublicationRecord {
    fn from(row: PublicationRow) -> Self {
        PublicationRecord::builder()
            .id(row.id.into())
            .event_type(row.event_type)
            .listener_id(row.listener_id)
            .payload(row.payload.0)
            .published_at(row.published_at)
            .maybe_completed_at(row.completed_at)
            .build()
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, listener_id, event_type, payload, published_at, completed_at FROM event_publications";

/// 基于 `event_publications` 表的发布账本
#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
    clock: SharedClock,
    page_size: usize,
}

impl PgLedger {
    pub fn new(pool: PgPool, clock: SharedClock) -> Self {
        Self {
            pool,
            clock,
            page_size: 100,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn scan_incomplete(
        &self,
        published_before: Option<DateTime<Utc>>,
    ) -> BoxStream<'static, DomainResult<PublicationRecord>> {
        let pool = self.pool.clone();
        keyset_stream(self.page_size, move |cursor: Option<PageCursor>, limit| {
            let pool = pool.clone();
            async move {
                let rows: Vec<PublicationRow> = sqlx::query_as(&format!(
                    "{SELECT_COLUMNS}
                     WHERE completed_at IS NULL
                       AND ($1::timestamptz IS NULL OR published_at < $1)
                       AND ($2::timestamptz IS NULL OR (published_at, id) > ($2, $3))
                     ORDER BY published_at, id
                     LIMIT $4"
                ))
                .bind(published_before)
                .bind(cursor.map(|c| c.published_at))
                .bind(cursor.map(|c| c.id.as_uuid()))
                .bind(limit as i64)
                .fetch_all(&pool)
                .await?;
                Ok(rows.into_iter().map(PublicationRecord::from).collect())
            }
        })
    }
}

/// 与业务写入共享的 Postgres 事务
pub struct PgLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgLedgerTransaction {
    /// 业务写入使用的连接，与发布记录同属一个事务
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut *self.tx
    }
}

#[async_trait]
impl LedgerTransaction for PgLedgerTransaction {
    async fn record(&mut self, record: &PublicationRecord) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO event_publications
                (id, listener_id, event_type, payload, published_at, completed_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.id().as_uuid())
        .bind(record.listener_id())
        .bind(record.event_type())
        .bind(Json(record.payload()))
        .bind(record.published_at())
        .bind(record.completed_at())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self) -> DomainResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> DomainResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl PublicationLedger for PgLedger {
    type Transaction = PgLedgerTransaction;

    async fn begin(&self) -> DomainResult<Self::Transaction> {
        Ok(PgLedgerTransaction {
            tx: self.pool.begin().await?,
        })
    }

    async fn mark_complete(&self, id: PublicationId) -> DomainResult<bool> {
        let result = sqlx::query(
            "UPDATE event_publications SET completed_at = $2
             WHERE id = $1 AND completed_at IS NULL",
        )
        .bind(id.as_uuid())
        .bind(self.clock.now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find(&self, id: PublicationId) -> DomainResult<Option<PublicationRecord>> {
        let row: Option<PublicationRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(PublicationRecord::from))
    }

    fn find_incomplete_older_than(
        &self,
        age: Duration,
    ) -> BoxStream<'static, DomainResult<PublicationRecord>> {
        match cutoff(self.clock.now(), age) {
            Ok(before) => self.scan_incomplete(Some(before)),
            Err(err) => failed_stream(err),
        }
    }

    fn find_incomplete(&self) -> BoxStream<'static, DomainResult<PublicationRecord>> {
        self.scan_incomplete(None)
    }

    async fn find_completed_older_than(
        &self,
        age: Duration,
    ) -> DomainResult<Vec<PublicationRecord>> {
        let before = cutoff(self.clock.now(), age)?;
        let rows: Vec<PublicationRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE completed_at IS NOT NULL AND completed_at < $1
             ORDER BY published_at, id"
        ))
        .bind(before)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PublicationRecord::from).collect())
    }

    async fn delete_completed_older_than(&self, age: Duration) -> DomainResult<u64> {
        let before = cutoff(self.clock.now(), age)?;
        let result = sqlx::query(
            "DELETE FROM event_publications
             WHERE completed_at IS NOT NULL AND completed_at < $1",
        )
        .bind(before)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_incomplete(&self) -> DomainResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM event_publications WHERE completed_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count.max(0) as u64)
    }
}
