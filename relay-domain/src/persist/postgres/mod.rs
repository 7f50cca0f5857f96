//! Postgres 实现（feature = "infra-sqlx"）
//!
//! 账本与锁表共用同一个连接池；业务写入通过 `PgLedgerTransaction::connection`
//! 与发布记录落在同一事务内。
//!
mod ledger;
mod lock_store;

pub use ledger::{PgLedger, PgLedgerTransaction};
pub use lock_store::{PgLockHold, PgLockStore};

use crate::error::DomainResult;
use sqlx::PgPool;

/// 锁表、发布账本及两行锁的种子数据
///
/// 种子行的 `last_run` 取纪元时间，使首轮调度即可执行。
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS locks (
    name       VARCHAR(64) PRIMARY KEY,
    last_run   TIMESTAMPTZ NULL
);

CREATE TABLE IF NOT EXISTS event_publications (
    id           UUID PRIMARY KEY,
    listener_id  VARCHAR(512) NOT NULL,
    event_type   VARCHAR(512) NOT NULL,
    payload      JSONB NOT NULL,
    published_at TIMESTAMPTZ NOT NULL,
    completed_at TIMESTAMPTZ NULL
);

CREATE INDEX IF NOT EXISTS idx_event_publications_incomplete
    ON event_publications (published_at, id)
    WHERE completed_at IS NULL;

CREATE INDEX IF NOT EXISTS idx_event_publications_completed
    ON event_publications (completed_at)
    WHERE completed_at IS NOT NULL;

INSERT INTO locks (name, last_run) VALUES
    ('cleanup', TIMESTAMPTZ '1970-01-01 00:00:00+00'),
    ('resubmit', TIMESTAMPTZ '1970-01-01 00:00:00+00')
ON CONFLICT (name) DO NOTHING;
"#;

/// 执行建表语句（幂等）
pub async fn migrate(pool: &PgPool) -> DomainResult<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
